//! Analysis job creation, execution, and queries
//!
//! A job walks `pending → running → analyzing_<kind>… → completed`. Stage
//! failures are stored per kind and do not stop the run; only a missing
//! project, an empty project, or a storage failure fails the whole job.

use crate::error::{PipelineError, Result};
use crate::snippet::{analyze_snippet, SnippetAnalysis};
use crate::sources::Sources;
use crate::stages::{stage_for, ProjectSource};
use crate::SharedStorage;
use lenscore::{
    compare_jobs, extract_key_findings, format_results, progress_percent, AnalysisJob,
    AnalysisKind, AnalysisResults, AnalysisResultsView, AnalysisStatus, JobComparison,
    KeyFindings, StageOutcome,
};
use lensllm::LlmService;
use lensstore::{AnalysisStore, ProjectStore, Storage, StoreError, Workspace};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs analysis jobs and answers queries about them
#[derive(Clone)]
pub struct AnalysisPipeline {
    storage: SharedStorage,
    sources: Sources,
    llm: Arc<LlmService>,
}

impl AnalysisPipeline {
    /// Create a pipeline over shared storage, a workspace, and an LLM service.
    pub fn new(storage: SharedStorage, workspace: Workspace, llm: Arc<LlmService>) -> Self {
        let sources = Sources::new(storage.clone(), workspace);
        Self {
            storage,
            sources,
            llm,
        }
    }

    /// Repository and project ingestion sharing this pipeline's storage.
    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// LLM service used by the stages.
    pub fn llm(&self) -> &LlmService {
        &self.llm
    }

    fn with_storage<T>(&self, f: impl FnOnce(&mut Storage) -> Result<T>) -> Result<T> {
        let mut storage = self.storage.lock().map_err(|_| PipelineError::LockPoisoned)?;
        f(&mut storage)
    }

    fn save_job(&self, job: &AnalysisJob) -> Result<()> {
        self.with_storage(|s| Ok(AnalysisStore::new(s).update(job)?))
    }

    /// Store a pending job for an existing project.
    pub fn create_job(&self, project_id: &str, kinds: Vec<AnalysisKind>) -> Result<AnalysisJob> {
        if kinds.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "at least one analysis type is required".to_string(),
            ));
        }
        let job = self.with_storage(|s| {
            let project = ProjectStore::new(s).require(project_id)?;
            let job = AnalysisJob::new(&project, kinds);
            AnalysisStore::new(s).insert(&job)?;
            Ok(job)
        })?;
        info!(
            "Created analysis job {} for project {} ({} stages)",
            job.id,
            project_id,
            job.analysis_types.len()
        );
        Ok(job)
    }

    /// Import a ready repository into a new project and create a job for it.
    ///
    /// When the import fails a failed job is stored against the repository
    /// ID and the error is returned.
    pub async fn create_job_from_repository(
        &self,
        repository_id: &str,
        kinds: Vec<AnalysisKind>,
    ) -> Result<AnalysisJob> {
        if kinds.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "at least one analysis type is required".to_string(),
            ));
        }

        let attempt = match self.sources.import_repository(repository_id).await {
            Ok(project) => self.create_job(&project.id, kinds.clone()),
            Err(e) => Err(e),
        };

        match attempt {
            Ok(job) => Ok(job),
            Err(e) => {
                error!(
                    "Failed to create analysis job from repository {}: {}",
                    repository_id, e
                );
                let rejected = AnalysisJob::rejected(repository_id, kinds, e.to_string());
                self.with_storage(|s| Ok(AnalysisStore::new(s).insert(&rejected)?))?;
                Err(e)
            }
        }
    }

    /// Run a pending job to completion.
    ///
    /// The returned job is terminal. `Err` means the job could not be
    /// loaded, was already started, or its final state could not be saved.
    pub async fn run_job(&self, job_id: &str) -> Result<AnalysisJob> {
        let mut job = self.job(job_id)?;
        if job.status != AnalysisStatus::Pending {
            return Err(PipelineError::InvalidRequest(format!(
                "analysis job {} already started (status: {})",
                job_id, job.status
            )));
        }

        if let Err(e) = self.execute(&mut job).await {
            error!("Analysis job {} failed: {}", job_id, e);
            if !job.status.is_terminal() {
                job.fail(e.to_string())?;
                self.save_job(&job)?;
            }
        }
        Ok(job)
    }

    async fn execute(&self, job: &mut AnalysisJob) -> Result<()> {
        job.advance(AnalysisStatus::Running)?;
        job.progress = 0;
        self.save_job(job)?;
        info!("Starting analysis job {} for project {}", job.id, job.project_id);

        let loaded = self.with_storage(|s| {
            let store = ProjectStore::new(s);
            match store.get(&job.project_id)? {
                Some(project) => {
                    let files = store.files(&project.id)?;
                    Ok(Some((project, files)))
                }
                None => Ok(None),
            }
        })?;
        let Some((project, files)) = loaded else {
            let message = format!("Project with ID {} not found", job.project_id);
            return self.fail_job(job, message);
        };
        if files.is_empty() {
            let message = format!("No files found for project {}", job.project_id);
            return self.fail_job(job, message);
        }

        let source = ProjectSource::new(project, files, self.sources.workspace().clone());
        let kinds = job.analysis_types.clone();
        let total = kinds.len();

        for (done, kind) in kinds.into_iter().enumerate() {
            job.advance(AnalysisStatus::for_stage(kind))?;
            job.progress = progress_percent(done, total);
            self.save_job(job)?;

            let outcome = match stage_for(kind).run(&source, &self.llm).await {
                Ok(result) => StageOutcome::Completed(result),
                Err(e) => {
                    warn!("Stage {} of job {} failed: {}", kind, job.id, e);
                    StageOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            let job_id = job.id.clone();
            self.with_storage(|s| Ok(AnalysisStore::new(s).save_result(&job_id, kind, &outcome)?))?;
        }

        job.advance(AnalysisStatus::Completed)?;
        self.save_job(job)?;
        info!("Analysis job {} completed", job.id);
        Ok(())
    }

    fn fail_job(&self, job: &mut AnalysisJob, message: String) -> Result<()> {
        warn!("Analysis job {} failed: {}", job.id, message);
        job.fail(message)?;
        self.save_job(job)
    }

    /// Job by ID.
    pub fn job(&self, job_id: &str) -> Result<AnalysisJob> {
        self.with_storage(|s| Ok(AnalysisStore::new(s).require(job_id)?))
    }

    /// Jobs of an existing project, newest first.
    pub fn jobs_for_project(&self, project_id: &str) -> Result<Vec<AnalysisJob>> {
        self.with_storage(|s| {
            ProjectStore::new(s).require(project_id)?;
            Ok(AnalysisStore::new(s).list_for_project(project_id)?)
        })
    }

    /// Newest completed job of an existing project, optionally holding `kind`.
    pub fn latest_analysis(
        &self,
        project_id: &str,
        kind: Option<AnalysisKind>,
    ) -> Result<AnalysisJob> {
        self.with_storage(|s| {
            ProjectStore::new(s).require(project_id)?;
            AnalysisStore::new(s)
                .latest_completed(project_id, kind)?
                .ok_or_else(|| StoreError::not_found("Analysis for project", project_id).into())
        })
    }

    /// Stage outcomes of a job, all of them or only `kind`.
    pub fn results(&self, job_id: &str, kind: Option<AnalysisKind>) -> Result<AnalysisResults> {
        let results = self.with_storage(|s| Ok(AnalysisStore::new(s).results(job_id)?))?;
        let results = match kind {
            Some(kind) => results.only(kind),
            None => results,
        };
        if results.is_empty() {
            return Err(StoreError::not_found("Analysis results", job_id).into());
        }
        Ok(results)
    }

    /// Results of `analysis_id`, or of the newest completed job, for a project.
    pub fn project_results(
        &self,
        project_id: &str,
        analysis_id: Option<&str>,
        kind: Option<AnalysisKind>,
    ) -> Result<AnalysisResults> {
        let job_id = match analysis_id {
            Some(id) => {
                self.sources.project(project_id)?;
                id.to_string()
            }
            None => self.latest_analysis(project_id, kind)?.id,
        };
        self.results(&job_id, kind)
    }

    fn completed_results(&self, job_id: &str) -> Result<(AnalysisJob, AnalysisResults)> {
        let job = self.job(job_id)?;
        if job.status != AnalysisStatus::Completed {
            return Err(PipelineError::NotCompleted(job.status));
        }
        let results = self.results(job_id, None)?;
        Ok((job, results))
    }

    /// Dashboard view of a completed job.
    pub fn formatted_results(&self, job_id: &str) -> Result<AnalysisResultsView> {
        let (job, results) = self.completed_results(job_id)?;
        Ok(format_results(&job, &results))
    }

    /// Key findings of a completed job.
    pub fn key_findings(&self, job_id: &str) -> Result<KeyFindings> {
        Ok(extract_key_findings(&self.formatted_results(job_id)?))
    }

    /// Compare two completed jobs.
    pub fn compare(
        &self,
        base_id: &str,
        head_id: &str,
        allow_cross_project: bool,
    ) -> Result<JobComparison> {
        let (base_job, base_results) = self.completed_results(base_id)?;
        let (head_job, head_results) = self.completed_results(head_id)?;
        Ok(compare_jobs(
            (&base_job, &base_results),
            (&head_job, &head_results),
            allow_cross_project,
        )?)
    }

    /// Analyze a single snippet.
    pub async fn snippet(
        &self,
        code: &str,
        language: &str,
        filename: Option<&str>,
    ) -> Result<SnippetAnalysis> {
        analyze_snippet(&self.llm, code, language, filename).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lenscore::ProjectStatus;
    use lensllm::{PromptCache, ScriptedProvider};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn pipeline(provider: ScriptedProvider) -> (TempDir, AnalysisPipeline) {
        let dir = TempDir::new().expect("temp dir");
        let storage = Storage::open(dir.path().join("codelens.db")).expect("open");
        let workspace = Workspace::new(dir.path().join("repos"), dir.path().join("files"));
        workspace.ensure_dirs().expect("dirs");
        let llm = LlmService::new(Arc::new(provider), PromptCache::in_memory());
        let pipeline =
            AnalysisPipeline::new(Arc::new(Mutex::new(storage)), workspace, Arc::new(llm));
        (dir, pipeline)
    }

    #[test]
    fn empty_kind_list_is_rejected() {
        let (_dir, pipeline) = pipeline(ScriptedProvider::new());
        let err = pipeline.create_job("anything", vec![]).expect_err("empty");
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }

    #[test]
    fn job_for_missing_project_is_not_found() {
        let (_dir, pipeline) = pipeline(ScriptedProvider::new());
        let err = pipeline
            .create_job("missing", vec![AnalysisKind::Code])
            .expect_err("missing");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn project_without_files_fails_the_job() {
        let (_dir, pipeline) = pipeline(ScriptedProvider::new());
        let project = pipeline
            .sources()
            .create_upload_project("empty", None)
            .expect("project");
        pipeline
            .sources()
            .ingest_upload(&project.id, vec![])
            .await
            .expect("ingest");
        let job = pipeline
            .create_job(&project.id, vec![AnalysisKind::Code])
            .expect("job");

        let job = pipeline.run_job(&job.id).await.expect("run");
        assert_eq!(job.status, AnalysisStatus::Failed);
        assert_eq!(
            job.error.as_deref(),
            Some(format!("No files found for project {}", project.id).as_str())
        );
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn jobs_cannot_run_twice() {
        let (_dir, pipeline) = pipeline(ScriptedProvider::new());
        let project = pipeline
            .sources()
            .create_upload_project("empty", None)
            .expect("project");
        let job = pipeline
            .create_job(&project.id, vec![AnalysisKind::Code])
            .expect("job");
        pipeline.run_job(&job.id).await.expect("first run");
        let err = pipeline.run_job(&job.id).await.expect_err("second run");
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn repository_that_is_not_ready_leaves_a_failed_job() {
        let (_dir, pipeline) = pipeline(ScriptedProvider::new());
        let repo = pipeline
            .sources()
            .start_clone("https://github.com/acme/shop", "main")
            .expect("register");

        let err = pipeline
            .create_job_from_repository(&repo.id, vec![AnalysisKind::Code])
            .await
            .expect_err("not ready");
        assert!(matches!(err, PipelineError::RepositoryNotReady(_)));

        let jobs = pipeline
            .with_storage(|s| Ok(AnalysisStore::new(s).list_for_project(&repo.id)?))
            .expect("jobs");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, AnalysisStatus::Failed);
        assert_eq!(
            jobs[0].error.as_deref(),
            Some("Repository is not ready. Status: pending")
        );
        assert!(pipeline.projects_named("acme/shop").is_empty());
    }

    #[tokio::test]
    async fn results_wait_for_completion() {
        let (_dir, pipeline) = pipeline(ScriptedProvider::new());
        let project = pipeline
            .sources()
            .create_upload_project("p", None)
            .expect("project");
        let job = pipeline
            .create_job(&project.id, vec![AnalysisKind::Code])
            .expect("job");

        let err = pipeline.formatted_results(&job.id).expect_err("pending");
        assert_eq!(
            err.to_string(),
            "Analysis job is not yet completed. Current status: pending"
        );
        assert!(matches!(
            pipeline.key_findings(&job.id),
            Err(PipelineError::NotCompleted(AnalysisStatus::Pending))
        ));
        assert_eq!(
            pipeline.sources().project(&project.id).expect("project").status,
            ProjectStatus::Pending
        );
    }

    impl AnalysisPipeline {
        fn projects_named(&self, name: &str) -> Vec<lenscore::ProjectRecord> {
            self.sources
                .projects()
                .expect("projects")
                .into_iter()
                .filter(|p| p.name == name)
                .collect()
        }
    }
}
