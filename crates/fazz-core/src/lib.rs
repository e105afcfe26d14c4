//! Coverage-guided, stateful API fuzzer core.
//!
//! This crate is the subject of the specification this workspace
//! implements: the typed argument algebra, the call-sequence ("seed")
//! corpus model, the mutation engine, the target lifecycle, and the
//! fuzzer loop that composes them. Concrete protocol clients, coverage
//! backends, and CLI plumbing are external collaborators (see
//! `fazz-protocols` and the `fazz-cli` binary).

pub mod argument;
pub mod call;
pub mod client;
pub mod coverage;
pub mod error;
pub mod fuzzer;
pub mod mutation;
pub mod seed;
pub mod target;
pub mod telemetry;
pub mod worker;

pub use argument::{Argument, ArgumentKind, UnpackedValue};
pub use call::Call;
pub use client::{Client, ClientCallError};
pub use coverage::CoverageSample;
pub use error::{FazzError, Result};
pub use fuzzer::{Fuzzer, FuzzerConfig};
pub use mutation::Scheduler;
pub use seed::{Seed, SeedStatus};
pub use target::{ServerConfig, TargetController};
