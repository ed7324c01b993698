//! Pipeline error types

use lenscore::{AnalysisStatus, RepositoryStatus};
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures raised while creating or running jobs and ingesting sources
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Storage failure or lookup miss
    #[error(transparent)]
    Store(#[from] lensstore::StoreError),

    /// LLM call failure
    #[error(transparent)]
    Llm(#[from] lensllm::LlmError),

    /// Lifecycle or comparison rule violated
    #[error(transparent)]
    Core(#[from] lenscore::CoreError),

    /// Clone failure
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Repository URL without owner and name
    #[error("Could not extract owner and repo from URL: {0}")]
    InvalidUrl(String),

    /// Repository not ready for import
    #[error("Repository is not ready. Status: {0}")]
    RepositoryNotReady(RepositoryStatus),

    /// Results requested before the job finished
    #[error("Analysis job is not yet completed. Current status: {0}")]
    NotCompleted(AnalysisStatus),

    /// Request rejected before any work started
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Shared storage mutex poisoned
    #[error("Storage lock poisoned")]
    LockPoisoned,

    /// Blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Whether this is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::Store(e) if e.is_not_found())
    }
}
