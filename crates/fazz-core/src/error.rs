use std::path::PathBuf;

/// Errors that cross a component boundary inside the fuzzing core.
///
/// Recoverability is per-variant: see spec §7 for who recovers from what.
#[derive(Debug, thiserror::Error)]
pub enum FazzError {
    #[error("client exposes no method named `{0}`")]
    FnNotFound(String),

    #[error("client raised while executing `{name}`: {source}")]
    FnExecFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to open argument file path {0:?}")]
    ArgumentUnpackIo(PathBuf, #[source] std::io::Error),

    #[error("server did not start: {0}")]
    ServerNotStarted(String),

    #[error("server had already terminated before it could be used")]
    ServerTerminated,

    #[error("server exited abnormally with code {0:?}")]
    ServerAbnormallyExited(Option<i32>),

    #[error("server configuration not found at {0:?}")]
    ServerConfigNotFound(PathBuf),

    #[error("coverage tool produced output that could not be parsed: {0:?}")]
    CoverageParseFailed(String),

    #[error("the authored initial seed timed out during the dry run (epoch 0)")]
    SeedDryRunTimeout,
}

pub type Result<T> = std::result::Result<T, FazzError>;
