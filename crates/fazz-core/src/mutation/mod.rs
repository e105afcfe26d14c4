//! Weighted mutators over [`Seed`]s plus the scheduler that turns a queue
//! into a mutated batch (spec §4.4).

mod arg;
mod del;
mod dup;
mod ins;
mod swap;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::seed::Seed;

pub use arg::ArgMutator;
pub use del::DelMutator;
pub use dup::DupMutator;
pub use ins::InsMutator;
pub use swap::SwapMutator;

/// A transform from seed to seed. Implementations take the seed *by copy*
/// (the caller is expected to pass [`Seed::deep_copy`]'s result) and append
/// their tag to `mutations`.
pub trait Mutator {
    fn name(&self) -> &'static str;

    /// Applies the mutation in place to an already-copied seed.
    fn mutate(&self, seed: &mut Seed, rng: &mut dyn rand::RngCore);
}

/// The default weighted mutator set (spec §4.4): `arg 0.4, dup 0.2, swap
/// 0.2, del 0.2, ins 0.0`.
pub struct WeightedMutatorSet {
    mutators: Vec<(Box<dyn Mutator>, f64)>,
}

impl Default for WeightedMutatorSet {
    fn default() -> Self {
        Self {
            mutators: vec![
                (Box::new(ArgMutator), 0.4),
                (Box::new(DupMutator), 0.2),
                (Box::new(SwapMutator), 0.2),
                (Box::new(DelMutator), 0.2),
                (Box::new(InsMutator), 0.0),
            ],
        }
    }
}

impl WeightedMutatorSet {
    /// Draws one mutator according to the configured weights. Returns
    /// `None` only if every weight is zero.
    pub fn draw<'a>(&'a self, rng: &mut impl Rng) -> Option<&'a dyn Mutator> {
        self.mutators
            .choose_weighted(rng, |(_, weight)| *weight)
            .ok()
            .map(|(mutator, _)| mutator.as_ref())
    }
}

/// Helper shared by `dup`/`swap`/`del`: picks a non-terminal index so the
/// invariant "`is_last` stays last" holds without special-casing each
/// mutator's body. Returns `None` if no non-terminal index exists (a
/// single-call seed whose only call is terminal).
pub(crate) fn pick_non_terminal_index(seed: &Seed, rng: &mut dyn rand::RngCore) -> Option<usize> {
    let terminal = seed.terminal_index();
    let candidates: Vec<usize> = (0..seed.len()).filter(|&i| Some(i) != terminal).collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.gen_range(0..candidates.len())])
    }
}

/// Given the current queue, produces a flat batch of mutated seeds (spec
/// §4.4). If `|queue| > top_n`, uniformly samples `top_n` seeds without
/// replacement; for each selected seed `s`, draws `s.power` mutators (capped
/// by `mut_limit`) with replacement and applies one mutator per draw.
pub struct Scheduler {
    pub top_n: usize,
    pub mut_limit: u32,
    mutators: WeightedMutatorSet,
}

impl Scheduler {
    pub fn new(top_n: usize, mut_limit: u32) -> Self {
        Self {
            top_n,
            mut_limit,
            mutators: WeightedMutatorSet::default(),
        }
    }

    pub fn schedule(&self, queue: &[Seed], rng: &mut impl Rng) -> Vec<Seed> {
        let selected: Vec<&Seed> = if queue.len() > self.top_n {
            let mut indices: Vec<usize> = (0..queue.len()).collect();
            indices.shuffle(rng);
            indices
                .into_iter()
                .take(self.top_n)
                .map(|i| &queue[i])
                .collect()
        } else {
            queue.iter().collect()
        };

        let mut batch = Vec::new();
        for seed in selected {
            let draws = seed.power.get().min(self.mut_limit.max(1));
            for _ in 0..draws {
                let Some(mutator) = self.mutators.draw(rng) else {
                    continue;
                };
                let mut copy = seed.deep_copy();
                mutator.mutate(&mut copy, rng);
                batch.push(copy);
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Call;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seed_of_len(n: usize) -> Seed {
        let calls = (0..n).map(|i| Call::new(format!("op{i}"), vec![])).collect();
        Seed::new(calls)
    }

    #[test]
    fn power_one_yields_exactly_one_copy() {
        let scheduler = Scheduler::new(10, 5);
        let seed = seed_of_len(3);
        let mut rng = StdRng::seed_from_u64(1);
        let batch = scheduler.schedule(&[seed], &mut rng);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn top_n_covers_whole_queue_when_queue_is_smaller() {
        let scheduler = Scheduler::new(10, 1);
        let queue: Vec<Seed> = (0..3).map(|_| seed_of_len(2)).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let batch = scheduler.schedule(&queue, &mut rng);
        assert_eq!(batch.len(), 3);
    }
}
