use rand::Rng;

use crate::seed::Seed;

use super::{Mutator, pick_non_terminal_index};

/// Picks `i` uniformly and inserts a deep copy of `calls[i]` at `i+1`.
/// Always applicable; length-increasing by exactly one (spec §4.4, §8).
pub struct DupMutator;

impl Mutator for DupMutator {
    fn name(&self) -> &'static str {
        "dup"
    }

    fn mutate(&self, seed: &mut Seed, rng: &mut dyn rand::RngCore) {
        seed.mutations.push(self.name().to_owned());
        let index = pick_non_terminal_index(seed, rng).unwrap_or(0);
        let duplicate = seed.get(index).expect("index in range").clone();
        seed.insert_after(index, duplicate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Call;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn dup_increases_length_by_one_with_adjacent_duplicate() {
        let calls = (0..5).map(|i| Call::new(format!("op{i}"), vec![])).collect();
        let mut seed = Seed::new(calls);
        let before_len = seed.len();
        let mut rng = StdRng::seed_from_u64(3);
        DupMutator.mutate(&mut seed, &mut rng);
        assert_eq!(seed.len(), before_len + 1);

        let duplicated_adjacent = (0..seed.len() - 1).any(|i| seed.get(i).unwrap().name == seed.get(i + 1).unwrap().name);
        assert!(duplicated_adjacent);
    }

    #[test]
    fn dup_preserves_terminal_position() {
        let mut calls: Vec<Call> = (0..3).map(|i| Call::new(format!("op{i}"), vec![])).collect();
        calls.push(Call::terminal("quit", vec![]));
        let mut seed = Seed::new(calls);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            DupMutator.mutate(&mut seed, &mut rng);
            assert_eq!(seed.terminal_index(), Some(seed.len() - 1));
        }
    }
}
