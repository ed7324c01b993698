//! Repository, project, and analysis records

use crate::error::{CoreError, Result};
use crate::status::{AnalysisKind, AnalysisStatus, ProjectStatus, RepositoryStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A GitHub repository registered for cloning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryRecord {
    /// Repository ID (UUID v4)
    pub id: String,
    /// Owner segment of the URL
    pub owner: String,
    /// Repository name segment of the URL
    pub repo: String,
    /// Clone URL as submitted
    pub url: String,
    /// Branch to clone
    pub branch: String,
    /// Lifecycle status
    pub status: RepositoryStatus,
    /// Tracked file count after cloning
    pub file_count: Option<u64>,
    /// Languages seen in the clone
    #[serde(default)]
    pub languages: Vec<String>,
    /// Clone size in KiB
    pub size_kb: Option<u64>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl RepositoryRecord {
    /// New pending repository with a fresh ID.
    pub fn new(owner: &str, repo: &str, url: &str, branch: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            url: url.to_string(),
            branch: branch.to_string(),
            status: RepositoryStatus::Pending,
            file_count: None,
            languages: Vec::new(),
            size_kb: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// A set of files available for analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRecord {
    /// Project ID (UUID v4)
    pub id: String,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Lifecycle status
    pub status: ProjectStatus,
    /// Number of files
    pub file_count: u64,
    /// Detected languages
    pub languages: Vec<String>,
    /// Total size in KiB
    pub size_kb: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    /// New empty project with a fresh ID.
    pub fn new(name: &str, description: Option<&str>, status: ProjectStatus) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            status,
            file_count: 0,
            languages: Vec::new(),
            size_kb: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One file of a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectFile {
    /// Path relative to the project root, `/`-separated
    pub path: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Detected language
    pub language: Option<String>,
}

impl ProjectFile {
    /// Files with a detected language are treated as code.
    pub fn is_code(&self) -> bool {
        self.language.is_some()
    }
}

/// An analysis job over one project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisJob {
    /// Job ID (UUID v4)
    pub id: String,
    /// Analyzed project
    pub project_id: String,
    /// Requested stages in execution order
    pub analysis_types: Vec<AnalysisKind>,
    /// Lifecycle status
    pub status: AnalysisStatus,
    /// Progress 0..=100
    pub progress: u8,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Set once the job reaches a terminal status
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure message
    pub error: Option<String>,
    /// Project name at creation time
    pub project_name: String,
    /// Project file count at creation time
    pub file_count: u64,
    /// Project languages at creation time
    pub languages: Vec<String>,
}

impl AnalysisJob {
    /// New pending job snapshotting the project metadata.
    pub fn new(project: &ProjectRecord, analysis_types: Vec<AnalysisKind>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            analysis_types,
            status: AnalysisStatus::Pending,
            progress: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error: None,
            project_name: project.name.clone(),
            file_count: project.file_count,
            languages: project.languages.clone(),
        }
    }

    /// Move to `next`, keeping progress and completion time consistent.
    pub fn advance(&mut self, next: AnalysisStatus) -> Result<()> {
        self.status = self.status.transition(next)?;
        let now = Utc::now();
        self.updated_at = now;
        if next == AnalysisStatus::Completed {
            self.progress = 100;
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Fail the job with `message`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.advance(AnalysisStatus::Failed)?;
        self.error = Some(message.into());
        Ok(())
    }

    /// Job that failed before it could be attached to a project.
    pub fn rejected(
        target_id: &str,
        analysis_types: Vec<AnalysisKind>,
        error: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: target_id.to_string(),
            analysis_types,
            status: AnalysisStatus::Failed,
            progress: 0,
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
            error: Some(error.into()),
            project_name: String::new(),
            file_count: 0,
            languages: Vec::new(),
        }
    }
}

/// Output of the code stage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeAnalysis {
    /// Summary per language
    #[serde(default)]
    pub language_summaries: BTreeMap<String, String>,
    /// Summary per sampled file
    #[serde(default)]
    pub file_summaries: BTreeMap<String, String>,
    /// Number of code files
    #[serde(default)]
    pub file_count: u64,
    /// Code files per language
    #[serde(default)]
    pub language_distribution: BTreeMap<String, u64>,
}

impl CodeAnalysis {
    /// Language with the most files; ties resolve to the smallest name.
    pub fn primary_language(&self) -> Option<&str> {
        self.language_distribution
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, _)| name.as_str())
    }
}

/// Output of the dependency stage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DependencyAnalysis {
    /// Free-form dependency analysis
    #[serde(default)]
    pub dependencies: String,
    /// Mermaid graph
    #[serde(default)]
    pub dependency_graph: String,
    /// Files fed to the prompt
    #[serde(default)]
    pub analyzed_files: Vec<String>,
}

/// Output of the business stage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BusinessAnalysis {
    /// Free-form business analysis
    #[serde(default)]
    pub business_functionality: String,
    /// Parsed entity model, or the raw answer as a string
    #[serde(default)]
    pub business_entities: serde_json::Value,
    /// Files fed to the prompt
    #[serde(default)]
    pub analyzed_files: Vec<String>,
}

/// Output of the architecture stage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArchitectureAnalysis {
    /// Free-form architecture analysis
    #[serde(default)]
    pub architecture_analysis: String,
    /// Mermaid diagram
    #[serde(default)]
    pub architecture_diagram: String,
    /// Files fed to the prompt
    #[serde(default)]
    pub analyzed_files: Vec<String>,
}

/// Successful output of one stage
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StageResult {
    /// Code stage
    Code(CodeAnalysis),
    /// Dependency stage
    Dependencies(DependencyAnalysis),
    /// Business stage
    Business(BusinessAnalysis),
    /// Architecture stage
    Architecture(ArchitectureAnalysis),
}

impl StageResult {
    /// Kind that produced this result.
    pub fn kind(&self) -> AnalysisKind {
        match self {
            StageResult::Code(_) => AnalysisKind::Code,
            StageResult::Dependencies(_) => AnalysisKind::Dependencies,
            StageResult::Business(_) => AnalysisKind::Business,
            StageResult::Architecture(_) => AnalysisKind::Architecture,
        }
    }

    /// Files the stage looked at. For the code stage these are the summarized files.
    pub fn analyzed_files(&self) -> Vec<String> {
        match self {
            StageResult::Code(code) => code.file_summaries.keys().cloned().collect(),
            StageResult::Dependencies(deps) => deps.analyzed_files.clone(),
            StageResult::Business(business) => business.analyzed_files.clone(),
            StageResult::Architecture(arch) => arch.analyzed_files.clone(),
        }
    }
}

/// Stored outcome of one stage: its result, or the error that stopped it
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StageOutcome {
    /// Stage finished
    Completed(StageResult),
    /// Stage raised an error; the run carried on
    Failed {
        /// Error message
        error: String,
    },
}

impl StageOutcome {
    /// Decode a stored JSON payload for `kind`.
    pub fn from_value(kind: AnalysisKind, value: serde_json::Value) -> Result<Self> {
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            return Ok(StageOutcome::Failed {
                error: error.to_string(),
            });
        }

        let malformed = |e: serde_json::Error| CoreError::MalformedResult {
            kind: kind.to_string(),
            message: e.to_string(),
        };

        let result = match kind {
            AnalysisKind::Code => {
                StageResult::Code(serde_json::from_value(value).map_err(malformed)?)
            }
            AnalysisKind::Dependencies => {
                StageResult::Dependencies(serde_json::from_value(value).map_err(malformed)?)
            }
            AnalysisKind::Business => {
                StageResult::Business(serde_json::from_value(value).map_err(malformed)?)
            }
            AnalysisKind::Architecture => {
                StageResult::Architecture(serde_json::from_value(value).map_err(malformed)?)
            }
        };
        Ok(StageOutcome::Completed(result))
    }

    /// Encode for storage.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Successful result, if any.
    pub fn result(&self) -> Option<&StageResult> {
        match self {
            StageOutcome::Completed(result) => Some(result),
            StageOutcome::Failed { .. } => None,
        }
    }

    /// Error message, if the stage failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            StageOutcome::Completed(_) => None,
            StageOutcome::Failed { error } => Some(error),
        }
    }
}

/// Stage outcomes of one analysis keyed by kind
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct AnalysisResults {
    stages: BTreeMap<AnalysisKind, StageOutcome>,
}

impl AnalysisResults {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of `kind`, replacing any previous one.
    pub fn insert(&mut self, kind: AnalysisKind, outcome: StageOutcome) {
        self.stages.insert(kind, outcome);
    }

    /// Record a successful result under its own kind.
    pub fn insert_result(&mut self, result: StageResult) {
        self.stages.insert(result.kind(), StageOutcome::Completed(result));
    }

    /// Record a failed stage.
    pub fn insert_error(&mut self, kind: AnalysisKind, error: impl Into<String>) {
        self.stages.insert(
            kind,
            StageOutcome::Failed {
                error: error.into(),
            },
        );
    }

    /// Outcome of `kind`.
    pub fn get(&self, kind: AnalysisKind) -> Option<&StageOutcome> {
        self.stages.get(&kind)
    }

    /// Whether `kind` has an outcome, successful or not.
    pub fn contains(&self, kind: AnalysisKind) -> bool {
        self.stages.contains_key(&kind)
    }

    /// Successful result of `kind`.
    pub fn result(&self, kind: AnalysisKind) -> Option<&StageResult> {
        self.get(kind).and_then(StageOutcome::result)
    }

    /// Code stage result.
    pub fn code(&self) -> Option<&CodeAnalysis> {
        match self.result(AnalysisKind::Code) {
            Some(StageResult::Code(code)) => Some(code),
            _ => None,
        }
    }

    /// Dependency stage result.
    pub fn dependencies(&self) -> Option<&DependencyAnalysis> {
        match self.result(AnalysisKind::Dependencies) {
            Some(StageResult::Dependencies(deps)) => Some(deps),
            _ => None,
        }
    }

    /// Business stage result.
    pub fn business(&self) -> Option<&BusinessAnalysis> {
        match self.result(AnalysisKind::Business) {
            Some(StageResult::Business(business)) => Some(business),
            _ => None,
        }
    }

    /// Architecture stage result.
    pub fn architecture(&self) -> Option<&ArchitectureAnalysis> {
        match self.result(AnalysisKind::Architecture) {
            Some(StageResult::Architecture(arch)) => Some(arch),
            _ => None,
        }
    }

    /// Kinds with an outcome, in canonical order.
    pub fn kinds(&self) -> Vec<AnalysisKind> {
        self.stages.keys().copied().collect()
    }

    /// Kinds whose outcome is an error.
    pub fn failed_kinds(&self) -> Vec<AnalysisKind> {
        self.stages
            .iter()
            .filter(|(_, outcome)| outcome.error().is_some())
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Restrict to a single kind.
    pub fn only(&self, kind: AnalysisKind) -> AnalysisResults {
        let mut out = AnalysisResults::new();
        if let Some(outcome) = self.stages.get(&kind) {
            out.insert(kind, outcome.clone());
        }
        out
    }

    /// Iterate outcomes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&AnalysisKind, &StageOutcome)> {
        self.stages.iter()
    }

    /// No outcomes recorded.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
