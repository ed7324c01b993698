//! lensserve - HTTP API Server
//!
//! Axum-based HTTP server exposing repository cloning, file uploads, analysis
//! jobs, and result comparison for the CodeLens dashboard.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Server configuration from TOML and environment
pub mod config;

/// API error types
pub mod error;

/// HTTP handlers for REST endpoints
pub mod handlers;

/// Request and response bodies
pub mod responses;

/// Server instance management
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use handlers::{create_router, AppState};
pub use server::{build_app, CodeLensServer};
