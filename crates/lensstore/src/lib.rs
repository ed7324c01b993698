//! lensstore - Persistent Storage Layer
//!
//! SQLite records for repositories, projects, and analysis jobs, plus the
//! on-disk workspace holding cloned repositories and project files.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Analysis job and stage result storage.
pub mod analyses;
/// Storage error types.
pub mod error;
/// Project and project file storage.
pub mod projects;
/// Cloned repository storage.
pub mod repositories;
/// Database schema and connection management.
pub mod schema;
/// On-disk project and clone directories.
pub mod workspace;

pub use analyses::AnalysisStore;
pub use error::{Result, StoreError};
pub use projects::ProjectStore;
pub use repositories::RepositoryStore;
pub use schema::{Storage, StorageConfig};
pub use workspace::{DirectoryScan, Workspace};
