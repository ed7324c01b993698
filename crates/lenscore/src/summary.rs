//! Result formatting and key findings

use crate::model::{
    AnalysisJob, AnalysisResults, ArchitectureAnalysis, BusinessAnalysis, CodeAnalysis,
    DependencyAnalysis,
};
use crate::status::{AnalysisKind, AnalysisStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A job and its results, flattened for clients
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalysisResultsView {
    /// Analysis ID
    pub id: String,
    /// Project ID
    pub project_id: String,
    /// Status
    pub status: AnalysisStatus,
    /// Requested stages
    pub analysis_types: Vec<AnalysisKind>,
    /// Progress 0..=100
    pub progress: u8,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Completion time
    pub completed_at: Option<DateTime<Utc>>,
    /// Project name
    pub project_name: String,
    /// Project file count
    pub file_count: u64,
    /// Project languages
    pub languages: Vec<String>,
    /// Job failure
    pub error: Option<String>,
    /// Code stage result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeAnalysis>,
    /// Dependency stage result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyAnalysis>,
    /// Business stage result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business: Option<BusinessAnalysis>,
    /// Architecture stage result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<ArchitectureAnalysis>,
    /// Per-stage errors
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stage_errors: Vec<StageError>,
}

/// Error recorded for one stage
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StageError {
    /// Stage
    pub analysis_type: AnalysisKind,
    /// Error message
    pub error: String,
}

/// Flatten a job and its results into a client view.
pub fn format_results(job: &AnalysisJob, results: &AnalysisResults) -> AnalysisResultsView {
    let stage_errors = results
        .iter()
        .filter_map(|(kind, outcome)| {
            outcome.error().map(|error| StageError {
                analysis_type: *kind,
                error: error.to_string(),
            })
        })
        .collect();

    AnalysisResultsView {
        id: job.id.clone(),
        project_id: job.project_id.clone(),
        status: job.status,
        analysis_types: job.analysis_types.clone(),
        progress: job.progress,
        created_at: job.created_at,
        updated_at: job.updated_at,
        completed_at: job.completed_at,
        project_name: job.project_name.clone(),
        file_count: job.file_count,
        languages: job.languages.clone(),
        error: job.error.clone(),
        code: results.code().cloned(),
        dependencies: results.dependencies().cloned(),
        business: results.business().cloned(),
        architecture: results.architecture().cloned(),
        stage_errors,
    }
}

/// Project part of the key findings
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectSummary {
    /// Project name
    pub name: String,
    /// File count
    pub file_count: u64,
    /// Languages
    pub languages: Vec<String>,
    /// Completion time of the analysis
    pub analysis_date: Option<DateTime<Utc>>,
}

/// Code part of the key findings
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CodeFindings {
    /// Number of languages in the distribution
    pub language_count: usize,
    /// Language with the most files, empty when none
    pub primary_language: String,
    /// Number of summarized files
    pub analyzed_files: usize,
}

/// Findings of a stage that reports analyzed files
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StageFindings {
    /// Number of analyzed files
    pub analyzed_files: usize,
}

/// Condensed view for the dashboard summary card
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KeyFindings {
    /// Project summary
    pub summary: ProjectSummary,
    /// Code findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeFindings>,
    /// Dependency findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<StageFindings>,
    /// Business findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business: Option<StageFindings>,
    /// Architecture findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<StageFindings>,
}

/// Reduce a results view to its key findings. Failed stages are left out.
pub fn extract_key_findings(view: &AnalysisResultsView) -> KeyFindings {
    KeyFindings {
        summary: ProjectSummary {
            name: view.project_name.clone(),
            file_count: view.file_count,
            languages: view.languages.clone(),
            analysis_date: view.completed_at,
        },
        code: view.code.as_ref().map(|code| CodeFindings {
            language_count: code.language_distribution.len(),
            primary_language: code.primary_language().unwrap_or_default().to_string(),
            analyzed_files: code.file_summaries.len(),
        }),
        dependencies: view.dependencies.as_ref().map(|d| StageFindings {
            analyzed_files: d.analyzed_files.len(),
        }),
        business: view.business.as_ref().map(|b| StageFindings {
            analyzed_files: b.analyzed_files.len(),
        }),
        architecture: view.architecture.as_ref().map(|a| StageFindings {
            analyzed_files: a.analyzed_files.len(),
        }),
    }
}
