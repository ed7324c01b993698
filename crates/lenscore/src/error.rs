//! Core error types

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the analysis model
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A lifecycle transition that the state machine does not allow
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Analysis kind name outside the supported set
    #[error("Unknown analysis type: {0}")]
    UnknownAnalysisKind(String),

    /// Two analyses that cannot be compared
    #[error("Analyses are not comparable: {0}")]
    NotComparable(String),

    /// Stored stage payload that does not match its kind
    #[error("Malformed {kind} result: {message}")]
    MalformedResult {
        /// Analysis kind of the payload
        kind: String,
        /// Deserialization failure
        message: String,
    },
}

impl CoreError {
    /// Build an invalid transition error from any displayable statuses
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
