use rand::Rng;

use crate::seed::Seed;

use super::Mutator;

/// Picks one call and mutates every **mutable** argument of it. No-op when
/// the call has no mutable args (spec §4.4, §8).
pub struct ArgMutator;

impl Mutator for ArgMutator {
    fn name(&self) -> &'static str {
        "arg"
    }

    fn mutate(&self, seed: &mut Seed, rng: &mut dyn rand::RngCore) {
        seed.mutations.push(self.name().to_owned());
        let index = rng.gen_range(0..seed.len());
        if let Some(call) = seed.get_mut(index) {
            call.mutate_args(rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{Argument, ArgumentKind};
    use crate::call::Call;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn arg_mutation_touches_only_mutable_args() {
        let pinned = Argument::string("pinned").pinned();
        let mutable = Argument::boolean(true);
        let seed_call = Call::new("op", vec![pinned.clone(), mutable]);
        let mut seed = Seed::new(vec![seed_call]);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            ArgMutator.mutate(&mut seed, &mut rng);
        }
        let call = seed.get(0).unwrap();
        assert_eq!(call.args[0].kind, pinned.kind);
        assert!(matches!(call.args[1].kind, ArgumentKind::Boolean(_)));
    }

    #[test]
    fn arg_mutation_is_noop_without_mutable_args() {
        let only_pinned = Call::new("op", vec![Argument::integer(7).pinned()]);
        let mut seed = Seed::new(vec![only_pinned.clone()]);
        let mut rng = StdRng::seed_from_u64(6);
        ArgMutator.mutate(&mut seed, &mut rng);
        assert_eq!(seed.get(0).unwrap().args, only_pinned.args);
    }
}
