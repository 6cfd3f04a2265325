use crate::bridge::BridgeError;
use crate::rename::RenameError;
use crate::staging::StagingError;

/// Errors that abort a batch.
///
/// Per-file problems (an unreadable table, a document that fails
/// verification, a converter exit code) never show up here; they are
/// collected in the [`BatchReport`](super::BatchReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The batch request itself is unusable
    #[error("Invalid batch request: {0}")]
    InvalidRequest(String),

    /// Staging directories or the input archive failed
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// The rename pass failed
    #[error(transparent)]
    Rename(#[from] RenameError),

    /// The converter stage could not walk its directories
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Listing run files failed
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The batch worker thread could not be started
    #[error("Failed to spawn batch worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The batch worker exited without reporting a result
    #[error("Batch worker terminated unexpectedly")]
    WorkerLost,
}
