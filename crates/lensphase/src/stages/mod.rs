//! Stage analyzers, one per analysis kind

/// Architecture analysis and diagram.
pub mod architecture;
/// Business functionality and entity model.
pub mod business;
/// Per-language and per-file summaries.
pub mod code;
/// Dependency analysis and graph.
pub mod dependencies;

use crate::error::Result;
use async_trait::async_trait;
use lenscore::{AnalysisKind, ProjectFile, ProjectRecord, StageResult};
use lensllm::LlmService;
use lensstore::Workspace;
use tracing::warn;

/// Code files fed to the multi-file stages.
pub const SAMPLE_FILES: usize = 20;

/// One analysis stage
#[async_trait]
pub trait Stage: Send + Sync {
    /// Kind this stage produces.
    fn kind(&self) -> AnalysisKind;

    /// Run the stage over a project.
    async fn run(&self, source: &ProjectSource, llm: &LlmService) -> Result<StageResult>;
}

/// Analyzer for `kind`.
pub fn stage_for(kind: AnalysisKind) -> Box<dyn Stage> {
    match kind {
        AnalysisKind::Code => Box::new(code::CodeStage),
        AnalysisKind::Dependencies => Box::new(dependencies::DependencyStage),
        AnalysisKind::Business => Box::new(business::BusinessStage),
        AnalysisKind::Architecture => Box::new(architecture::ArchitectureStage),
    }
}

/// A project with its file list and access to file contents
#[derive(Debug, Clone)]
pub struct ProjectSource {
    /// Project metadata
    pub project: ProjectRecord,
    /// Files in scan order
    pub files: Vec<ProjectFile>,
    workspace: Workspace,
}

impl ProjectSource {
    /// Bundle a project with its files.
    pub fn new(project: ProjectRecord, files: Vec<ProjectFile>, workspace: Workspace) -> Self {
        Self {
            project,
            files,
            workspace,
        }
    }

    /// Files with a detected language, in scan order.
    pub fn code_files(&self) -> Vec<&ProjectFile> {
        self.files.iter().filter(|f| f.is_code()).collect()
    }

    /// Text of a file. Unreadable and empty files yield `None`.
    pub fn content(&self, path: &str) -> Option<String> {
        match self.workspace.read_file(&self.project.id, path) {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping {} in project {}: {}", path, self.project.id, e);
                None
            }
        }
    }

    /// Contents of the first `limit` code files, skipping empty ones.
    pub fn sample_contents(&self, limit: usize) -> Vec<(String, String)> {
        self.code_files()
            .into_iter()
            .take(limit)
            .filter_map(|f| self.content(&f.path).map(|text| (f.path.clone(), text)))
            .collect()
    }
}
