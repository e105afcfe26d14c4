//! The subprocess body of the per-testcase executor worker (spec §4.6, §5,
//! §9): re-exec this binary with `--internal-exec-seed <request-file>
//! <report-file>`, construct a client for `(protocol, addr)`, and call
//! `seed.execute(client)`. `fazz-core::worker` owns the join-with-deadline
//! and kill-on-timeout orchestration around this process; this module only
//! supplies the body that runs inside it.

use std::path::Path;

use anyhow::Context;
use fazz_core::error::FazzError;
use fazz_core::worker::{WorkerReport, read_request, write_report};
use fazz_protocols::Protocol;

/// Runs once inside the re-exec'd worker process. Never returns an error
/// for a client-side call failure or unknown method — those are reported
/// back to the parent in `WorkerReport` (spec §7); this only errors on
/// malformed IPC files or a client that cannot even connect, which are
/// process-fatal the same way any other worker crash is (the parent sees
/// the worker exit unsuccessfully and treats the testcase as failed, not
/// the fuzzer).
pub fn run(request_path: &Path, report_path: &Path) -> anyhow::Result<()> {
    let request = read_request(request_path).context("reading worker request")?;
    let protocol: Protocol = request.protocol.parse().context("parsing protocol from worker request")?;
    let addr = format!("{}:{}", request.host, request.port)
        .parse()
        .context("parsing target address from worker request")?;

    let mut client = fazz_protocols::connect(protocol, addr).context("connecting protocol client")?;
    let mut seed = request.seed;

    let fn_not_found = match seed.execute(client.as_mut()) {
        Ok(()) => None,
        Err(FazzError::FnNotFound(name)) => Some(name),
        Err(other) => return Err(other.into()),
    };

    let report = WorkerReport {
        exec_count: seed.exec_count,
        succ_count: seed.succ_count,
        fail_count: seed.fail_count,
        fn_not_found,
    };
    write_report(report_path, &report).context("writing worker report")?;
    Ok(())
}
