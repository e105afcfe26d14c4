//! The outer fuzzing loop (spec §4.6): owns the queue, composes the
//! mutation engine and the target controller, isolates each testcase in a
//! subordinate worker process, classifies outcomes, persists interesting
//! seeds, and emits epoch telemetry.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::coverage::CoverageSample;
use crate::error::FazzError;
use crate::mutation::Scheduler;
use crate::seed::{Seed, SeedStatus};
use crate::target::TargetController;
use crate::telemetry::{EpochReport, RunSummary};
use crate::worker::{self, WorkerRequest};

/// Accumulates only the time spent actually driving testcases, never the
/// server-restart overhead between them — spec §9's fix for the original
/// implementation's wall-clock bug ("the only metric that is invariant to
/// server-restart latency").
#[derive(Debug, Default, Clone, Copy)]
pub struct ActiveTimer {
    total: Duration,
}

impl ActiveTimer {
    pub fn total(&self) -> Duration {
        self.total
    }

    fn time<T>(&mut self, f: impl FnOnce() -> T) -> (T, Duration) {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        self.total += elapsed;
        (result, elapsed)
    }
}

pub struct FuzzerConfig {
    pub protocol: String,
    pub worker_argv: Vec<String>,
    pub timeout_testcase: Duration,
    pub timeout_minutes: f64,
    pub seed_dir: PathBuf,
    pub top_n: usize,
    pub mut_limit: u32,
}

pub struct Fuzzer {
    config: FuzzerConfig,
    target: TargetController,
    scheduler: Scheduler,
    rng: rand::rngs::StdRng,
    pub queue: Vec<Seed>,
    best_coverage: CoverageSample,
    active_timer: ActiveTimer,
    epoch_count: u64,
}

impl Fuzzer {
    pub fn new(config: FuzzerConfig, target: TargetController, initial_seed: Seed, rng_seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            scheduler: Scheduler::new(config.top_n, config.mut_limit),
            config,
            target,
            rng: rand::rngs::StdRng::seed_from_u64(rng_seed),
            queue: vec![initial_seed],
            best_coverage: CoverageSample {
                line_pct: 0.0,
                line_abs: 0,
                branch_pct: 0.0,
                branch_abs: 0,
            },
            active_timer: ActiveTimer::default(),
            epoch_count: 0,
        }
    }

    /// Runs exactly one testcase end to end (spec §4.6 `fuzz_one`):
    /// acquire target, spawn worker with deadline, force-terminate/kill on
    /// timeout, release target, classify abnormal exit as `Crash`, then
    /// sample coverage and classify `Interesting`/`Boring`.
    fn fuzz_one(&mut self, seed: &mut Seed) -> Result<SeedStatus, FazzError> {
        let mut guard = self.target.acquire()?;
        let addr = guard.addr().map_err(|err| FazzError::ServerNotStarted(err.to_string()))?;

        let request = WorkerRequest {
            protocol: self.config.protocol.clone(),
            host: addr.ip().to_string(),
            port: addr.port(),
            seed: seed.deep_copy(),
        };

        let (report_result, _elapsed) = self.active_timer.time(|| {
            worker::run_with_deadline(&self.config.worker_argv, &request, self.config.timeout_testcase)
        });
        let report = report_result.map_err(|err| FazzError::ServerNotStarted(err.to_string()))?;
        let timed_out = report.is_none();

        let termination = guard.terminate();
        let is_crash = guard.is_crash(termination);
        drop(guard);

        if let Some(report) = &report {
            seed.exec_count += report.exec_count;
            seed.succ_count += report.succ_count;
            seed.fail_count += report.fail_count;
            if let Some(name) = &report.fn_not_found {
                return Err(FazzError::FnNotFound(name.clone()));
            }
        }

        if is_crash {
            warn!(?termination, "target exited outside accepted codes");
            return Ok(SeedStatus::Crash);
        }
        if timed_out {
            return Ok(SeedStatus::Timeout);
        }

        let sample = self.target.collect_coverage()?;
        Ok(self.classify_coverage(sample))
    }

    /// Strictly-increasing absolute line or branch count marks a testcase
    /// `Interesting` and raises the running best (spec §3, §4.6, §8).
    fn classify_coverage(&mut self, sample: CoverageSample) -> SeedStatus {
        if sample.line_abs > self.best_coverage.line_abs || sample.branch_abs > self.best_coverage.branch_abs {
            self.best_coverage = CoverageSample {
                line_abs: sample.line_abs.max(self.best_coverage.line_abs),
                line_pct: if sample.line_abs > self.best_coverage.line_abs {
                    sample.line_pct
                } else {
                    self.best_coverage.line_pct
                },
                branch_abs: sample.branch_abs.max(self.best_coverage.branch_abs),
                branch_pct: if sample.branch_abs > self.best_coverage.branch_abs {
                    sample.branch_pct
                } else {
                    self.best_coverage.branch_pct
                },
            };
            SeedStatus::Interesting
        } else {
            SeedStatus::Boring
        }
    }

    fn epoch_report(&self, epoch_interval: Duration) -> EpochReport {
        EpochReport {
            epoch: self.epoch_count,
            epoch_interval,
            cumulative_active_time: self.active_timer.total(),
            best_coverage: self.best_coverage,
            queue_len: self.queue.len(),
        }
    }

    fn budget_exhausted(&self) -> bool {
        self.active_timer.total().as_secs_f64() >= self.config.timeout_minutes * 60.0
    }

    /// Epoch 0 (spec §4.6): executes the initial queue unmutated. A
    /// `Timeout` here is fatal — the authored seed must complete within the
    /// testcase budget.
    fn dry_run(&mut self) -> Result<EpochReport, FazzError> {
        let start = Instant::now();
        let mut seeds = std::mem::take(&mut self.queue);
        for seed in &mut seeds {
            let status = self.fuzz_one(seed)?;
            if status == SeedStatus::Timeout {
                self.queue = seeds;
                return Err(FazzError::SeedDryRunTimeout);
            }
        }
        self.queue = seeds;
        let report = self.epoch_report(start.elapsed());
        self.epoch_count += 1;
        Ok(report)
    }

    /// Epoch >= 1 (spec §4.6): asks the mutation engine for a batch,
    /// appends `Interesting` seeds to the queue (persisting them), discards
    /// `Boring`/`Timeout`, and persists `Crash` artefacts. Seeds appended
    /// this epoch are visible only to subsequent epochs (spec §5).
    fn mutate_epoch(&mut self) -> Result<EpochReport, FazzError> {
        let start = Instant::now();
        let batch = self.scheduler.schedule(&self.queue, &mut self.rng);
        let mut newly_interesting = Vec::new();
        for mut seed in batch {
            let status = match self.fuzz_one(&mut seed) {
                Ok(status) => status,
                Err(FazzError::FnNotFound(name)) => {
                    warn!(name, "mutated seed calls an unresolvable method, discarding");
                    continue;
                }
                Err(err) => return Err(err),
            };
            if let Err(err) = seed.save(&self.config.seed_dir, status) {
                warn!(%err, "failed to persist seed");
            }
            if status == SeedStatus::Interesting {
                newly_interesting.push(seed);
            }
        }
        self.queue.extend(newly_interesting);
        let report = self.epoch_report(start.elapsed());
        self.epoch_count += 1;
        Ok(report)
    }

    /// The outer loop (spec §4.6 `fuzz`): epoch 0 dry run, then mutate
    /// epochs until cumulative active execution time reaches the budget.
    /// `should_stop` is polled between epochs so the CLI can wire SIGINT to
    /// a graceful stop without the core depending on a signal crate.
    pub fn fuzz(&mut self, mut should_stop: impl FnMut() -> bool) -> Result<RunSummary, FazzError> {
        let report = self.dry_run()?;
        info!("{}", report.as_line());

        while !self.budget_exhausted() && !should_stop() {
            let report = self.mutate_epoch()?;
            info!("{}", report.as_line());
        }

        let summary = RunSummary {
            total_epochs: self.epoch_count,
            total_active_time: self.active_timer.total(),
            final_coverage: self.best_coverage,
            final_queue_len: self.queue.len(),
        };
        info!("{}", summary.as_line());
        Ok(summary)
    }

    /// Catch mode (spec §4.6): executes the initial seed once and returns
    /// one epoch's report, without entering the mutate loop.
    pub fn catch(&mut self) -> Result<EpochReport, FazzError> {
        self.dry_run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Call;
    use crate::target::ServerConfig;

    fn fuzzer_with_queue() -> Fuzzer {
        let config = FuzzerConfig {
            protocol: "test".into(),
            worker_argv: vec!["/bin/true".into()],
            timeout_testcase: Duration::from_millis(500),
            timeout_minutes: 1.0,
            seed_dir: PathBuf::from("/tmp/fazz-test-does-not-exist"),
            top_n: 10,
            mut_limit: 5,
        };
        let target = TargetController::new(
            ServerConfig {
                cmd: vec!["/bin/true".into()],
                path: PathBuf::from("."),
                root: PathBuf::from("."),
                host: "127.0.0.1".into(),
                port: 0,
                clean: None,
            },
            "echo 'lines: 0% (0 out of 1)' && echo 'branches: 0% (0 out of 1)'".into(),
        );
        let seed = Seed::new(vec![Call::new("op", vec![])]);
        Fuzzer::new(config, target, seed, 1)
    }

    #[test]
    fn coverage_monotonicity_scripted_samples() {
        let mut fuzzer = fuzzer_with_queue();
        let samples = [(100u64, 10u64), (100, 10), (110, 12), (110, 12)];
        let mut flags = Vec::new();
        for (line_abs, branch_abs) in samples {
            let sample = CoverageSample {
                line_pct: 0.0,
                line_abs,
                branch_pct: 0.0,
                branch_abs,
            };
            flags.push(fuzzer.classify_coverage(sample) == SeedStatus::Interesting);
        }
        assert_eq!(flags, vec![true, false, true, false]);
        assert_eq!(fuzzer.best_coverage.line_abs, 110);
        assert_eq!(fuzzer.best_coverage.branch_abs, 12);
    }

    #[test]
    fn budget_exhausted_respects_timeout_minutes() {
        let mut fuzzer = fuzzer_with_queue();
        assert!(!fuzzer.budget_exhausted());
        fuzzer.active_timer.total = Duration::from_secs(61);
        assert!(fuzzer.budget_exhausted());
    }

    /// Spec §4.6/§7/§8: a `Timeout` on epoch 0 is fatal — the authored seed
    /// must complete within the testcase budget. The server is a real
    /// process (`sleep`, so it survives the start grace period) and the
    /// worker is a shell script that hangs well past the testcase deadline.
    #[test]
    fn epoch_zero_timeout_is_fatal() {
        let config = FuzzerConfig {
            protocol: "test".into(),
            worker_argv: vec!["sh".into(), "-c".into(), "sleep 5".into()],
            timeout_testcase: Duration::from_millis(150),
            timeout_minutes: 1.0,
            seed_dir: std::env::temp_dir().join("fazz-core-test-seeds-unused"),
            top_n: 10,
            mut_limit: 5,
        };
        let target = TargetController::new(
            ServerConfig {
                cmd: vec!["sleep".into(), "5".into()],
                path: PathBuf::from("."),
                root: PathBuf::from("."),
                host: "127.0.0.1".into(),
                port: 0,
                clean: None,
            },
            "true".into(),
        );
        let seed = Seed::new(vec![Call::new("op", vec![])]);
        let mut fuzzer = Fuzzer::new(config, target, seed, 1);

        let err = fuzzer.catch().expect_err("a dry-run timeout must abort the run");
        assert!(matches!(err, FazzError::SeedDryRunTimeout));
    }
}
