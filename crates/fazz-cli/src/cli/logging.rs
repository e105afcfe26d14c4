//! Logging setup (spec §4.7, §6): structured `tracing` events, optionally
//! duplicated to a per-run log file under `log/<protocol>-<timestamp>.log`.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sets up the global `tracing` subscriber. `debug` raises the default
/// level from `info` to `debug`; `log_file`, when present, duplicates every
/// event to that file in addition to stderr.
pub fn setup(debug: bool, log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let default_level = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env()
        .context("constructing log filter from env")?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_owned()));

    match log_file {
        Some(path) => {
            let file = File::create(&path).with_context(|| format!("creating log file {}", path.display()))?;
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_timer(fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_owned()));
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry().with(env_filter).with(stderr_layer).init();
        }
    }
    Ok(())
}

/// `log/<protocol>-<timestamp>.log` (spec §6). Uses the process start time
/// so concurrent runs for different protocols never collide.
pub fn log_path(protocol: &str, unix_timestamp: u64) -> anyhow::Result<PathBuf> {
    let dir = PathBuf::from("log");
    fs::create_dir_all(&dir).context("creating log/ directory")?;
    Ok(dir.join(format!("{protocol}-{unix_timestamp}.log")))
}
