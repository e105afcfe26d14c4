//! Per-testcase isolation via a subordinate worker **process** (spec §4.6,
//! §5, §9): a hung client can be force-killed without corrupting the
//! fuzzer, and a crash in a native client library does not take it down.
//!
//! The core only knows the contract; the actual subprocess body (connecting
//! a client and calling [`Seed::execute`]) is supplied by the binary crate
//! via [`WorkerEntryPoint`], since constructing a client is itself a
//! per-protocol, out-of-scope concern (spec §1, §6).

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::seed::Seed;

/// What the worker process needs to reconnect and drive the seed.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub seed: Seed,
}

/// What the worker process reports back after a completed (non-killed) run.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerReport {
    pub exec_count: u64,
    pub succ_count: u64,
    pub fail_count: u64,
    /// Set when the seed's definition itself is wrong (`FnNotFound`, spec
    /// §7) — fatal to the seed regardless of epoch.
    pub fn_not_found: Option<String>,
}

/// Spawns `argv` (the calling binary re-invoked with its hidden worker
/// subcommand), feeds it a [`WorkerRequest`] via a temp file, and blocks for
/// at most `deadline`. Returns `Ok(Some(report))` on a completed run,
/// `Ok(None)` if the deadline elapsed and the process was killed.
pub fn run_with_deadline(
    worker_argv: &[String],
    request: &WorkerRequest,
    deadline: Duration,
) -> std::io::Result<Option<WorkerReport>> {
    let request_file = write_request(request)?;
    let report_file = NamedTempFile::new()?;

    let Some((program, fixed_args)) = worker_argv.split_first() else {
        return Err(std::io::Error::other("empty worker argv"));
    };
    let mut child = Command::new(program)
        .args(fixed_args)
        .arg(request_file.path())
        .arg(report_file.path())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let started = Instant::now();
    let poll_interval = Duration::from_millis(20);
    loop {
        if let Some(status) = child.try_wait()? {
            return if status.success() {
                Ok(Some(read_report(report_file.path())?))
            } else {
                // Client-side crash inside the worker process: treated the
                // same as any other failed testcase, not fatal to the
                // fuzzer (spec §5).
                warn!(?status, "worker process exited unsuccessfully");
                Ok(Some(read_report(report_file.path()).unwrap_or(WorkerReport {
                    exec_count: 0,
                    succ_count: 0,
                    fail_count: 0,
                    fn_not_found: None,
                })))
            };
        }
        if started.elapsed() >= deadline {
            kill_worker(&mut child);
            return Ok(None);
        }
        std::thread::sleep(poll_interval);
    }
}

fn kill_worker(child: &mut std::process::Child) {
    let pid = Pid::from_raw(child.id() as i32);
    if let Err(err) = signal::kill(pid, Signal::SIGKILL) {
        warn!(%err, "failed to kill timed-out worker");
    }
    let _ = child.wait();
}

fn write_request(request: &WorkerRequest) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    let payload = serde_json::to_vec(request).map_err(std::io::Error::other)?;
    file.write_all(&payload)?;
    file.flush()?;
    Ok(file)
}

fn read_report(path: &Path) -> std::io::Result<WorkerReport> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(std::io::Error::other)
}

pub fn read_request(path: &Path) -> std::io::Result<WorkerRequest> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(std::io::Error::other)
}

pub fn write_report(path: &Path, report: &WorkerReport) -> std::io::Result<()> {
    let payload = serde_json::to_vec(report).map_err(std::io::Error::other)?;
    std::fs::write(path, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Call;

    fn dummy_request() -> WorkerRequest {
        WorkerRequest {
            protocol: "test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            seed: Seed::new(vec![Call::new("op", vec![])]),
        }
    }

    /// `sh -c '<script>' <request-file> <report-file>` sets `$0` to the
    /// request file and `$1` to the report file, matching how
    /// `run_with_deadline` appends the two IPC files after the fixed argv.
    #[test]
    fn run_with_deadline_parses_a_completed_worker_report() {
        let script = r#"printf '{"exec_count":1,"succ_count":1,"fail_count":0,"fn_not_found":null}' > "$1""#;
        let argv = vec!["sh".to_owned(), "-c".to_owned(), script.to_owned()];
        let report = run_with_deadline(&argv, &dummy_request(), Duration::from_secs(5))
            .unwrap()
            .expect("worker should complete well before the deadline");
        assert_eq!(report.exec_count, 1);
        assert_eq!(report.succ_count, 1);
        assert_eq!(report.fail_count, 0);
        assert!(report.fn_not_found.is_none());
    }

    #[test]
    fn run_with_deadline_kills_and_returns_none_on_timeout() {
        let argv = vec!["sh".to_owned(), "-c".to_owned(), "sleep 5".to_owned()];
        let result = run_with_deadline(&argv, &dummy_request(), Duration::from_millis(150)).unwrap();
        assert!(result.is_none());
    }
}
