//! The server-under-test's scoped lifecycle (spec §4.5, §9): acquire
//! around each testcase, release (terminate + cleanup) on every exit path.

use std::net::{SocketAddrV4, Ipv4Addr};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::error::FazzError;

/// The `[Target]` section of `server-config.ini` (spec §6).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shell-free argv used to spawn the server.
    pub cmd: Vec<String>,
    /// Working directory for the server process.
    pub path: PathBuf,
    /// Passed to the coverage tool.
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
    /// Optional external cleanup command (e.g. `rm` stale data dirs).
    pub clean: Option<String>,
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddrV4, std::net::AddrParseError> {
        let ip: Ipv4Addr = self.host.parse()?;
        Ok(SocketAddrV4::new(ip, self.port))
    }
}

/// How long `start` waits for the server to bind before handing back
/// control (spec §4.5: "a small grace (~100ms)").
const START_GRACE: Duration = Duration::from_millis(100);

/// Exit codes other than these are treated as a crash (spec §4.5).
#[derive(Debug, Clone)]
pub struct AcceptedExitCodes {
    codes: Vec<i32>,
}

impl Default for AcceptedExitCodes {
    fn default() -> Self {
        Self { codes: vec![0] }
    }
}

impl AcceptedExitCodes {
    pub fn new(extra: impl IntoIterator<Item = i32>) -> Self {
        let mut codes = vec![0];
        codes.extend(extra);
        Self { codes }
    }

    pub fn accepts(&self, code: Option<i32>) -> bool {
        code.is_some_and(|c| self.codes.contains(&c))
    }
}

/// How a testcase's target stopped running. A network daemon's `quit`
/// analogue ends the *session*, not necessarily the process — most targets
/// are still alive when `release` is called and die only because the
/// fuzzer signals them. Only a server that exited **on its own**, before
/// being signaled, can meaningfully be judged against
/// [`AcceptedExitCodes`]; a signal-induced death is the fuzzer's own doing
/// and is never a crash (spec §4.5/§4.6 step 4, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The server had already exited by the time `release` checked, with
    /// this exit code.
    SelfExited(Option<i32>),
    /// The server was still running; the fuzzer's termination signal ended
    /// it.
    Signaled,
}

/// Owns the server's lifecycle: start, wait-for-ready, terminate, cleanup,
/// coverage sampling. Oblivious to which protocol is spoken over the socket
/// it exposes via [`ServerConfig::addr`].
pub struct TargetController {
    pub config: ServerConfig,
    pub kill_signal: Signal,
    pub accepted_exit_codes: AcceptedExitCodes,
    pub coverage_command: String,
}

impl TargetController {
    pub fn new(config: ServerConfig, coverage_command: String) -> Self {
        Self {
            config,
            kill_signal: Signal::SIGTERM,
            accepted_exit_codes: AcceptedExitCodes::default(),
            coverage_command,
        }
    }

    /// Invokes the coverage tool rooted at `config.root` (spec §4.5). Valid
    /// to call once the target has exited, independent of any live guard.
    pub fn collect_coverage(&self) -> Result<crate::coverage::CoverageSample, FazzError> {
        crate::coverage::collect_coverage(&self.coverage_command, &self.config.root)
    }

    /// Acquires the target for one testcase. The returned guard releases
    /// (terminate + cleanup) on every exit path, including an early return
    /// or a panic unwinding through the caller (spec §4.5, §9).
    pub fn acquire(&self) -> Result<TargetGuard<'_>, FazzError> {
        let Some((program, args)) = self.config.cmd.split_first() else {
            return Err(FazzError::ServerNotStarted("empty `cmd`".to_owned()));
        };
        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.config.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| FazzError::ServerNotStarted(err.to_string()))?;

        std::thread::sleep(START_GRACE);

        if let Some(status) = child.try_wait().map_err(|err| FazzError::ServerNotStarted(err.to_string()))? {
            warn!(code = ?status.code(), "server had already exited after start");
            return Err(FazzError::ServerTerminated);
        }

        debug!(pid = child.id(), addr = ?self.config.addr().ok(), "target started");
        Ok(TargetGuard {
            controller: self,
            child: Some(child),
        })
    }
}

/// RAII handle for one testcase's target. `terminate` + `cleanup` run in
/// `Drop`, so release happens on every exit path (spec §4.5, §9).
pub struct TargetGuard<'a> {
    controller: &'a TargetController,
    child: Option<Child>,
}

impl TargetGuard<'_> {
    pub fn addr(&self) -> Result<SocketAddrV4, std::net::AddrParseError> {
        self.controller.config.addr()
    }

    /// Checks whether the server is still alive *before* signaling it: if
    /// it already exited on its own, that exit status is the real signal
    /// of server-side misbehaviour; only then does the configured
    /// termination signal get sent. Then runs the configured cleanup
    /// command. Returns the [`TerminationOutcome`] so the caller can tell
    /// a genuine abnormal exit from the fuzzer's own signal-induced death.
    fn release(&mut self) -> Option<TerminationOutcome> {
        let mut child = self.child.take()?;

        let outcome = match child.try_wait() {
            Ok(Some(status)) => TerminationOutcome::SelfExited(status.code()),
            Ok(None) => {
                let pid = Pid::from_raw(child.id() as i32);
                if let Err(err) = signal::kill(pid, self.controller.kill_signal) {
                    warn!(%err, "failed to signal target, it may have already exited");
                }
                if let Err(err) = child.wait() {
                    warn!(%err, "failed to wait on target process");
                }
                TerminationOutcome::Signaled
            }
            Err(err) => {
                warn!(%err, "failed to check target liveness before terminating");
                TerminationOutcome::Signaled
            }
        };

        if let Some(clean_cmd) = &self.controller.config.clean {
            debug!(clean_cmd, "running cleanup command");
            match Command::new("sh").arg("-c").arg(clean_cmd).status() {
                Ok(status) if !status.success() => {
                    warn!(code = ?status.code(), "cleanup command exited non-zero");
                }
                Err(err) => warn!(%err, "failed to launch cleanup command"),
                _ => {}
            }
        }
        Some(outcome)
    }

    /// Releases the target (terminate-if-still-alive + cleanup), returning
    /// the [`TerminationOutcome`] (spec §4.5 step "terminate"/"cleanup").
    /// Safe to call at most meaningfully once; a second call is a no-op
    /// that returns `None`. The guard's `Drop` impl calls this too, so
    /// callers that want the outcome should call it explicitly before the
    /// guard goes out of scope.
    pub fn terminate(&mut self) -> Option<TerminationOutcome> {
        self.release()
    }

    /// A crash is only ever a server that exited **on its own** with a
    /// code outside the accepted set; a signal-induced death (the common
    /// case — the server is still serving the protocol session when the
    /// fuzzer tears it down) is never a crash.
    pub fn is_crash(&self, outcome: Option<TerminationOutcome>) -> bool {
        match outcome {
            Some(TerminationOutcome::SelfExited(code)) => !self.controller.accepted_exit_codes.accepts(code),
            Some(TerminationOutcome::Signaled) | None => false,
        }
    }
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cmd: Vec<&str>) -> ServerConfig {
        ServerConfig {
            cmd: cmd.into_iter().map(String::from).collect(),
            path: PathBuf::from("."),
            root: PathBuf::from("."),
            host: "127.0.0.1".into(),
            port: 0,
            clean: None,
        }
    }

    #[test]
    fn accepted_exit_codes_always_include_zero() {
        let codes = AcceptedExitCodes::new([42]);
        assert!(codes.accepts(Some(0)));
        assert!(codes.accepts(Some(42)));
        assert!(!codes.accepts(Some(1)));
        assert!(!codes.accepts(None));
    }

    #[test]
    fn start_fails_for_a_command_that_does_not_exist() {
        let controller = TargetController::new(config(vec!["/definitely/not/a/real/binary-xyz"]), "true".into());
        assert!(controller.acquire().is_err());
    }

    #[test]
    fn signal_induced_death_is_never_a_crash() {
        let controller = TargetController::new(config(vec!["sleep", "5"]), "true".into());
        let mut guard = controller.acquire().expect("sleep should start and survive the grace period");
        let outcome = guard.terminate();
        assert_eq!(outcome, Some(TerminationOutcome::Signaled));
        assert!(!guard.is_crash(outcome), "a server still alive when signaled is not a crash");
    }

    #[test]
    fn self_exited_target_is_classified_by_its_own_exit_code() {
        let controller = TargetController::new(config(vec!["sh", "-c", "sleep 0.2; exit 7"]), "true".into());
        let mut guard = controller.acquire().expect("should survive the 100ms start grace");
        std::thread::sleep(Duration::from_millis(400));
        let outcome = guard.terminate();
        assert_eq!(outcome, Some(TerminationOutcome::SelfExited(Some(7))));
        assert!(guard.is_crash(outcome), "exit code 7 is not in the default accepted set {{0}}");
    }
}
