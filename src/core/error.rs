use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Run-fatal errors. Per-item copy failures never surface here; they are
/// absorbed into [`RunCounters`](super::models::RunCounters) and reported
/// as progress events.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to create staging directory {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to enumerate source tree {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to replace existing archive {path}: {source}")]
    ReplaceOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
