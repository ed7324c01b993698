//! lenscore - Analysis Core
//!
//! Domain model, analysis status state machine, and the comparison engine
//! that turns two analysis result documents into dashboard metrics.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Comparison and aggregation over analysis results.
pub mod compare;
/// Core error types.
pub mod error;
/// Language detection by file name, shebang, and content.
pub mod language;
/// Repository, project, and analysis records.
pub mod model;
/// Status enums and lifecycle transitions.
pub mod status;
/// Result formatting and key findings.
pub mod summary;
/// Token estimation, truncation, and chunking.
pub mod tokens;

pub use compare::{
    compare_distributions, compare_jobs, compare_results, diff_file_sets, percentage,
    percentage_distribution, AnalysisComparison, CountDelta, DistributionDelta, FileSetDiff,
    JobComparison, JobSide, PrimaryLanguage, Share,
};
pub use error::{CoreError, Result};
pub use language::{
    all_languages, detect_language, detect_language_from_content, detect_language_from_name,
};
pub use model::{
    AnalysisJob, AnalysisResults, ArchitectureAnalysis, BusinessAnalysis, CodeAnalysis,
    DependencyAnalysis, ProjectFile, ProjectRecord, RepositoryRecord, StageOutcome, StageResult,
};
pub use status::{progress_percent, AnalysisKind, AnalysisStatus, ProjectStatus, RepositoryStatus};
pub use summary::{extract_key_findings, format_results, AnalysisResultsView, KeyFindings};
pub use tokens::{chunk_text, estimate_tokens, truncate_text_for_model, truncate_to_tokens};
