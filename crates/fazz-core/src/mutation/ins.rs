use crate::seed::Seed;

use super::Mutator;

/// Reserved; currently a no-op (spec §4.4). Carries a zero default weight so
/// it never fires until a future heuristic gives it real behaviour.
pub struct InsMutator;

impl Mutator for InsMutator {
    fn name(&self) -> &'static str {
        "ins"
    }

    fn mutate(&self, seed: &mut Seed, _rng: &mut dyn rand::RngCore) {
        seed.mutations.push(self.name().to_owned());
    }
}
