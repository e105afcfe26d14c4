use crate::seed::Seed;

use super::{Mutator, pick_non_terminal_index};

/// Picks `i` and removes it. No-op when `|calls| <= 2` — deletion never
/// reduces length below 2 (spec §3, §4.4, §8).
pub struct DelMutator;

impl Mutator for DelMutator {
    fn name(&self) -> &'static str {
        "del"
    }

    fn mutate(&self, seed: &mut Seed, rng: &mut dyn rand::RngCore) {
        seed.mutations.push(self.name().to_owned());
        if seed.len() <= 2 {
            return;
        }
        if let Some(index) = pick_non_terminal_index(seed, rng) {
            seed.calls.remove(index);
        }
    }
}
