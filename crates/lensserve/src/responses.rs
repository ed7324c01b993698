//! Request and response bodies of the HTTP API

use lenscore::{AnalysisJob, AnalysisKind, AnalysisStatus, ProjectStatus};
use serde::{Deserialize, Serialize};

fn default_branch() -> String {
    "main".to_string()
}

fn default_analysis_types() -> Vec<String> {
    AnalysisKind::defaults()
        .iter()
        .map(|k| k.as_str().to_string())
        .collect()
}

/// Body of `POST /github/repositories`
#[derive(Debug, Clone, Deserialize)]
pub struct CloneRequest {
    /// Repository URL
    pub repository_url: String,

    /// Branch to clone
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Token for private repositories
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Reply to an accepted upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// New project ID
    pub project_id: String,

    /// Project name
    pub name: String,

    /// Project status at acceptance
    pub status: ProjectStatus,

    /// Human readable note
    pub message: String,
}

/// Content of one project file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContentResponse {
    /// Project ID
    pub project_id: String,

    /// Relative file path
    pub file_path: String,

    /// File text
    pub content: String,
}

/// Body of `POST /analysis/code`
#[derive(Debug, Clone, Deserialize)]
pub struct CodeAnalysisRequest {
    /// Snippet source
    pub code: String,

    /// Snippet language
    pub language: String,

    /// Optional file name for context
    #[serde(default)]
    pub filename: Option<String>,
}

/// Body of `POST /analysis/projects/:id/analyze`
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    /// Requested kinds by name
    #[serde(default = "default_analysis_types")]
    pub analysis_types: Vec<String>,
}

impl Default for AnalyzeRequest {
    fn default() -> Self {
        Self {
            analysis_types: default_analysis_types(),
        }
    }
}

/// Query of `POST /analysis/projects/:id/analyze`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeQuery {
    /// Treat the path ID as a repository to import first
    #[serde(default)]
    pub from_repository: bool,
}

/// Job status as reported to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJobResponse {
    /// Job ID
    pub analysis_id: String,

    /// Project ID
    pub project_id: String,

    /// Job status
    pub status: AnalysisStatus,

    /// Requested kinds
    pub analysis_types: Vec<AnalysisKind>,

    /// Progress 0..=100
    pub progress: u8,

    /// Human readable note
    pub message: String,
}

impl AnalysisJobResponse {
    /// Reply for a freshly created job.
    pub fn created(job: &AnalysisJob) -> Self {
        Self::with_message(
            job,
            "Analysis job created. Check status using the analysis_id.".to_string(),
        )
    }

    /// Reply for a status lookup.
    pub fn status(job: &AnalysisJob) -> Self {
        Self::with_message(job, format!("Analysis status: {}", job.status))
    }

    fn with_message(job: &AnalysisJob, message: String) -> Self {
        Self {
            analysis_id: job.id.clone(),
            project_id: job.project_id.clone(),
            status: job.status,
            analysis_types: job.analysis_types.clone(),
            progress: job.progress,
            message,
        }
    }
}

/// Query of the latest-analysis endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestQuery {
    /// Restrict to jobs holding this kind
    pub analysis_type: Option<String>,
}

/// Query of the project results endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectResultsQuery {
    /// Job to read; the latest completed job when absent
    pub analysis_id: Option<String>,

    /// Restrict to one kind
    pub analysis_type: Option<String>,
}

/// Query of the comparison endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CompareQuery {
    /// Base job ID
    pub base: String,

    /// Head job ID
    pub head: String,

    /// Allow jobs of different projects
    #[serde(default)]
    pub allow_cross_project: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_request_defaults_to_main() {
        let req: CloneRequest =
            serde_json::from_str(r#"{"repository_url": "https://github.com/acme/shop"}"#)
                .expect("parse");
        assert_eq!(req.branch, "main");
        assert!(req.access_token.is_none());
    }

    #[test]
    fn analyze_request_defaults_to_every_kind() {
        let req: AnalyzeRequest = serde_json::from_str("{}").expect("parse");
        assert_eq!(
            req.analysis_types,
            vec!["code", "dependencies", "business", "architecture"]
        );
    }
}
