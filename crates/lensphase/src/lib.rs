//! lensphase - Analysis Pipeline
//!
//! Runs analysis jobs stage by stage through the LLM service, and brings
//! source trees into the workspace by cloning, importing, or uploading.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Pipeline error types.
pub mod error;
/// Prompt builders for every stage.
pub mod prompts;
/// Job creation, execution, and queries.
pub mod runner;
/// Single snippet analysis.
pub mod snippet;
/// Repository cloning, import, and upload ingestion.
pub mod sources;
/// Per-kind stage analyzers.
pub mod stages;

use lensstore::Storage;
use std::sync::{Arc, Mutex};

/// Storage handle shared between the pipeline, sources, and the server.
pub type SharedStorage = Arc<Mutex<Storage>>;

pub use error::{PipelineError, Result};
pub use runner::AnalysisPipeline;
pub use snippet::{analyze_snippet, SnippetAnalysis};
pub use sources::{authenticated_url, extract_owner_repo, Sources, UploadedFile};
pub use stages::{stage_for, ProjectSource, Stage};
