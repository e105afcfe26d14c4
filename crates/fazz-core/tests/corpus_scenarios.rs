//! End-to-end scenarios against the public API, in the spirit of spec §8's
//! scripted scenarios: a stub client recording invocations, and the
//! mutation engine's independence guarantees.

use std::sync::{Arc, Mutex};

use fazz_core::argument::{Argument, UnpackedValue};
use fazz_core::call::Call;
use fazz_core::client::{Client, ClientCallError};
use fazz_core::mutation::{DupMutator, Mutator, Scheduler};
use fazz_core::seed::Seed;
use rand::SeedableRng;
use rand::rngs::StdRng;

struct RecordingClient {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Client for RecordingClient {
    fn invoke(&mut self, name: &str, _args: Vec<UnpackedValue>) -> Option<Result<(), ClientCallError>> {
        self.calls.lock().unwrap().push(name.to_owned());
        Some(Ok(()))
    }
}

fn sample_seed(len: usize) -> Seed {
    Seed::new(
        (0..len)
            .map(|i| Call::new(format!("op{i}"), vec![Argument::integer(i as i64)]))
            .collect(),
    )
}

#[test]
fn dry_run_executes_calls_in_order_against_a_stub_client() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut client = RecordingClient { calls: calls.clone() };
    let mut seed = sample_seed(6);

    seed.execute(&mut client).expect("the stub client never fails a call");

    let recorded = calls.lock().unwrap().clone();
    let expected: Vec<String> = (0..6).map(|i| format!("op{i}")).collect();
    assert_eq!(recorded, expected, "calls must be recorded in seed order");
    assert_eq!(seed.exec_count, 6);
    assert_eq!(seed.succ_count, 6);
    assert_eq!(seed.fail_count, 0);
}

#[test]
fn unresolved_call_name_is_fatal_to_the_seed() {
    struct EmptyClient;
    impl Client for EmptyClient {
        fn invoke(&mut self, _name: &str, _args: Vec<UnpackedValue>) -> Option<Result<(), ClientCallError>> {
            None
        }
    }
    let mut seed = sample_seed(3);
    let err = seed.execute(&mut EmptyClient).expect_err("no method resolves against an empty client");
    assert!(matches!(err, fazz_core::error::FazzError::FnNotFound(_)));
}

#[test]
fn mutating_a_scheduled_copy_never_changes_the_queued_seed() {
    let queue = vec![sample_seed(6)];
    let scheduler = Scheduler::new(10, 1);
    let mut rng = StdRng::seed_from_u64(123);

    let batch = scheduler.schedule(&queue, &mut rng);
    assert_eq!(batch.len(), 1, "power=1 yields exactly one mutated copy per selected seed");

    let mut mutated = batch.into_iter().next().unwrap();
    DupMutator.mutate(&mut mutated, &mut rng);

    assert_eq!(queue[0].len(), 6, "the original queued seed must be untouched by mutating its scheduled copy");
}

#[test]
fn top_n_sampling_never_exceeds_the_queue_size() {
    let queue: Vec<Seed> = (0..3).map(|_| sample_seed(2)).collect();
    let scheduler = Scheduler::new(10, 1);
    let mut rng = StdRng::seed_from_u64(7);
    let batch = scheduler.schedule(&queue, &mut rng);
    assert_eq!(batch.len(), queue.len(), "top_n >= |queue| uses the whole queue");
}
