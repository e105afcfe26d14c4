use rand::Rng;

use crate::seed::Seed;

use super::Mutator;

/// Picks distinct `i != j` and swaps them. No-op when `|calls| < 2`
/// (spec §4.4, §8). Excludes the terminal position so `is_last` stays last.
pub struct SwapMutator;

impl Mutator for SwapMutator {
    fn name(&self) -> &'static str {
        "swap"
    }

    fn mutate(&self, seed: &mut Seed, rng: &mut dyn rand::RngCore) {
        seed.mutations.push(self.name().to_owned());
        let terminal = seed.terminal_index();
        let candidates: Vec<usize> = (0..seed.len()).filter(|&i| Some(i) != terminal).collect();
        if candidates.len() < 2 {
            return;
        }
        let i = candidates[rng.gen_range(0..candidates.len())];
        let j = loop {
            let candidate = candidates[rng.gen_range(0..candidates.len())];
            if candidate != i {
                break candidate;
            }
        };
        seed.calls.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Call;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn swap_is_noop_below_two_calls() {
        let mut seed = Seed::new(vec![Call::new("only", vec![])]);
        let mut rng = StdRng::seed_from_u64(5);
        SwapMutator.mutate(&mut seed, &mut rng);
        assert_eq!(seed.len(), 1);
        assert_eq!(seed.get(0).unwrap().name, "only");
    }

    #[test]
    fn swap_never_moves_terminal_off_last_position() {
        let mut calls: Vec<Call> = ["a", "b", "c"].iter().map(|n| Call::new(*n, vec![])).collect();
        calls.push(Call::terminal("quit", vec![]));
        let mut seed = Seed::new(calls);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..1000 {
            SwapMutator.mutate(&mut seed, &mut rng);
            assert_eq!(seed.terminal_index(), Some(3));
        }
    }
}
