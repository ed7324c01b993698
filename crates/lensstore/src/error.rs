//! Storage error types

use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the database and the file workspace
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON column encoding failure
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Lifecycle or payload rule violated
    #[error(transparent)]
    Core(#[from] lenscore::CoreError),

    /// Record lookup miss
    #[error("{kind} with ID {id} not found")]
    NotFound {
        /// Record kind
        kind: &'static str,
        /// Requested ID
        id: String,
    },

    /// Relative path resolving outside its root
    #[error("Path escapes workspace: {}", .0.display())]
    PathEscape(PathBuf),

    /// Column holding a value the model does not know
    #[error("Corrupt column {column}: {value}")]
    Corrupt {
        /// Column name
        column: &'static str,
        /// Stored value
        value: String,
    },
}

impl StoreError {
    /// Lookup miss for `kind`.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether this is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
