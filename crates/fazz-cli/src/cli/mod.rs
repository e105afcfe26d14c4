mod config;
mod logging;
mod worker;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use fazz_core::error::FazzError;
use fazz_core::fuzzer::{Fuzzer, FuzzerConfig};
use fazz_core::target::TargetController;
use fazz_protocols::Protocol;
use tracing::info;

/// Internal flag used to re-exec this binary as the per-testcase executor
/// worker (spec §5, §9). Not part of the public `fazz <protocol> [...]`
/// surface in spec §6 and deliberately left out of `--help`.
const WORKER_FLAG: &str = "--internal-exec-seed";

const DEFAULT_TIMEOUT_TESTCASE: std::time::Duration = std::time::Duration::from_secs(2);
const DEFAULT_TOP_N: usize = 10;
const DEFAULT_MUT_LIMIT: u32 = 5;
const SEED_DIR: &str = "saved-seed";
const SERVER_CONFIG_FILE: &str = "server-config.ini";

/// `fazz <protocol> [-t MINUTES] [-d] [-c] [-l]` (spec §6).
#[derive(Debug, clap::Parser)]
#[command(name = "fazz", version, about = "Coverage-guided, stateful API fuzzer for network protocol servers")]
struct Cli {
    /// Protocol to fuzz.
    #[arg(value_name = "PROTOCOL")]
    protocol: Protocol,

    /// Budget in minutes for cumulative active execution time.
    #[arg(short = 't', long = "timeout", default_value_t = 1.0)]
    timeout_minutes: f64,

    /// Verbose logging.
    #[arg(short, long)]
    debug: bool,

    /// Catch mode: one dry run, then exit.
    #[arg(short, long)]
    catch: bool,

    /// Write a per-run log file under `log/`.
    #[arg(short, long)]
    log: bool,
}

/// Entry point. Dispatches to the hidden worker body before `clap` ever
/// sees the re-exec'd argv — the worker invocation is not a user-facing
/// subcommand (spec §5, §9).
pub fn run() -> anyhow::Result<()> {
    let raw_args: Vec<String> = std::env::args().collect();
    if raw_args.get(1).map(String::as_str) == Some(WORKER_FLAG) {
        let request_path = raw_args.get(2).context("missing worker request path")?;
        let report_path = raw_args.get(3).context("missing worker report path")?;
        return worker::run(std::path::Path::new(request_path), std::path::Path::new(report_path));
    }

    let cli = Cli::parse();

    let unix_timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let log_file = cli
        .log
        .then(|| logging::log_path(&cli.protocol.to_string(), unix_timestamp))
        .transpose()?;
    logging::setup(cli.debug, log_file)?;

    let config_path = PathBuf::from(SERVER_CONFIG_FILE);
    if !config_path.exists() {
        return Err(FazzError::ServerConfigNotFound(config_path).into());
    }
    let loaded = config::load(&config_path)?;

    let target = TargetController::new(loaded.server, loaded.coverage_cmd);

    let scratch_dir = tempfile::tempdir().context("creating scratch directory for initial seed fixtures")?;
    let initial_seed = fazz_protocols::initial_seed(cli.protocol, scratch_dir.path())
        .context("building the authored initial seed")?;

    let worker_argv = vec![
        std::env::current_exe()
            .context("resolving current executable path for worker re-invocation")?
            .to_string_lossy()
            .into_owned(),
        WORKER_FLAG.to_owned(),
    ];

    let rng_seed: u64 = rand::random();
    info!(protocol = %cli.protocol, rng_seed, "starting fazz run");

    let fuzzer_config = FuzzerConfig {
        protocol: cli.protocol.to_string(),
        worker_argv,
        timeout_testcase: DEFAULT_TIMEOUT_TESTCASE,
        timeout_minutes: cli.timeout_minutes,
        seed_dir: PathBuf::from(SEED_DIR),
        top_n: DEFAULT_TOP_N,
        mut_limit: DEFAULT_MUT_LIMIT,
    };
    let mut fuzzer = Fuzzer::new(fuzzer_config, target, initial_seed, rng_seed);

    if cli.catch {
        let report = fuzzer.catch()?;
        info!("{}", report.as_line());
        return Ok(());
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.store(true, Ordering::Relaxed))
            .context("installing SIGINT handler")?;
    }

    let summary = fuzzer.fuzz(|| interrupted.load(Ordering::Relaxed))?;
    info!("{}", summary.as_line());
    Ok(())
}
