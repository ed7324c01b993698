//! HTTP handlers for REST API endpoints

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lenscore::{
    AnalysisJob, AnalysisKind, AnalysisResults, AnalysisResultsView, JobComparison, KeyFindings,
    ProjectFile, ProjectRecord, RepositoryRecord,
};
use lensphase::{
    sources::validate_upload_name, AnalysisPipeline, SnippetAnalysis, UploadedFile,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::responses::{
    AnalysisJobResponse, AnalyzeQuery, AnalyzeRequest, CloneRequest, CodeAnalysisRequest,
    CompareQuery, FileContentResponse, LatestQuery, ProjectResultsQuery, UploadResponse,
};

/// State shared across all handlers
///
/// The pipeline owns the storage handle; handlers never lock it directly.
#[derive(Clone)]
pub struct AppState {
    /// Job runner and source ingestion
    pub pipeline: AnalysisPipeline,

    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new AppState instance with a pipeline and configuration
    pub fn new(pipeline: AnalysisPipeline, config: ServerConfig) -> Self {
        Self {
            pipeline,
            config: Arc::new(config),
        }
    }
}

fn parse_kinds(names: &[String]) -> ApiResult<Vec<AnalysisKind>> {
    let (kinds, unknown) = AnalysisKind::parse_list(names);
    if !unknown.is_empty() {
        return Err(ApiError::validation(format!(
            "Unknown analysis type(s): {}",
            unknown.join(", ")
        )));
    }
    if kinds.is_empty() {
        return Err(ApiError::validation(
            "At least one analysis type is required",
        ));
    }
    Ok(kinds)
}

/// Decode the analyze body. Only an empty body selects the default kinds.
fn parse_analyze_body(body: &[u8]) -> ApiResult<AnalyzeRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AnalyzeRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::validation(format!("Invalid analysis request: {}", e)))
}

fn parse_kind(name: Option<&str>) -> ApiResult<Option<AnalysisKind>> {
    match name.filter(|n| !n.is_empty()) {
        Some(name) => Ok(Some(AnalysisKind::parse(name)?)),
        None => Ok(None),
    }
}

fn spawn_job(pipeline: &AnalysisPipeline, job_id: String) {
    let pipeline = pipeline.clone();
    tokio::spawn(async move {
        match pipeline.run_job(&job_id).await {
            Ok(job) => info!("Analysis job {} finished with status {}", job.id, job.status),
            Err(e) => error!("Analysis job {} could not run: {}", job_id, e),
        }
    });
}

/// GET / - Service description
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "CodeLens Source Code Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Service for retrieving and analyzing source code",
    }))
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "source-code-service",
        "llm_provider": state.pipeline.llm().provider_name(),
    }))
}

/// GET /health/readiness
pub async fn readiness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ready" }))
}

/// GET /health/liveness
pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "alive" }))
}

/// POST /github/repositories - Register a repository and clone it in the background
pub async fn clone_repository(
    State(state): State<AppState>,
    Json(request): Json<CloneRequest>,
) -> ApiResult<(StatusCode, Json<RepositoryRecord>)> {
    let sources = state.pipeline.sources().clone();
    let record = sources.start_clone(&request.repository_url, &request.branch)?;

    let repository_id = record.id.clone();
    let token = request.access_token.filter(|t| !t.is_empty());
    tokio::spawn(async move {
        if let Err(e) = sources.clone_repository(&repository_id, token).await {
            warn!("Clone of repository {} failed: {}", repository_id, e);
        }
    });

    Ok((StatusCode::ACCEPTED, Json(record)))
}

/// GET /github/repositories/:id
pub async fn get_repository(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RepositoryRecord>> {
    Ok(Json(state.pipeline.sources().repository(&id)?))
}

/// GET /github/repositories
pub async fn list_repositories(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RepositoryRecord>>> {
    Ok(Json(state.pipeline.sources().repositories()?))
}

/// POST /files/upload - Create a project from uploaded files
///
/// Multipart fields: `files` (repeated, `files[]` accepted), `project_name`,
/// and an optional `description`.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut project_name = None;
    let mut description = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "project_name" => project_name = Some(field.text().await?),
            "description" => description = Some(field.text().await?).filter(|d| !d.is_empty()),
            "files" | "files[]" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::validation("Uploaded file has no filename"))?;
                validate_upload_name(&filename)?;
                let contents = field.bytes().await?.to_vec();
                files.push(UploadedFile { filename, contents });
            }
            other => warn!("Ignoring unexpected upload field: {}", other),
        }
    }

    let project_name = project_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::validation("project_name is required"))?;
    if files.is_empty() {
        return Err(ApiError::validation("At least one file is required"));
    }

    let sources = state.pipeline.sources().clone();
    let project = sources.create_upload_project(&project_name, description.as_deref())?;
    info!(
        "Accepted {} files for project {} ({})",
        files.len(),
        project.id,
        project.name
    );

    let project_id = project.id.clone();
    tokio::spawn(async move {
        if let Err(e) = sources.ingest_upload(&project_id, files).await {
            warn!("Upload processing for project {} failed: {}", project_id, e);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            project_id: project.id,
            name: project.name,
            status: project.status,
            message: "Files are being processed. Check status using the project ID.".to_string(),
        }),
    ))
}

/// GET /files/projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectRecord>>> {
    Ok(Json(state.pipeline.sources().projects()?))
}

/// GET /files/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectRecord>> {
    Ok(Json(state.pipeline.sources().project(&id)?))
}

/// GET /files/projects/:id/files
pub async fn list_project_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ProjectFile>>> {
    Ok(Json(state.pipeline.sources().project_files(&id)?))
}

/// GET /files/projects/:id/files/*path
pub async fn get_file_content(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
) -> ApiResult<Json<FileContentResponse>> {
    let content = state.pipeline.sources().file_content(&id, &path)?;
    Ok(Json(FileContentResponse {
        project_id: id,
        file_path: path,
        content,
    }))
}

/// DELETE /files/projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.pipeline.sources().delete_project(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Project with ID {} not found", id)))
    }
}

/// POST /analysis/code - Analyze a single snippet
pub async fn analyze_code(
    State(state): State<AppState>,
    Json(request): Json<CodeAnalysisRequest>,
) -> ApiResult<Json<SnippetAnalysis>> {
    let analysis = state
        .pipeline
        .snippet(&request.code, &request.language, request.filename.as_deref())
        .await?;
    Ok(Json(analysis))
}

/// POST /analysis/projects/:id/analyze - Create a job and run it in the background
pub async fn analyze_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AnalyzeQuery>,
    body: Bytes,
) -> ApiResult<Json<AnalysisJobResponse>> {
    let request = parse_analyze_body(&body)?;
    let kinds = parse_kinds(&request.analysis_types)?;

    let job = if query.from_repository {
        state.pipeline.create_job_from_repository(&id, kinds).await?
    } else {
        state.pipeline.create_job(&id, kinds)?
    };
    spawn_job(&state.pipeline, job.id.clone());

    Ok(Json(AnalysisJobResponse::created(&job)))
}

/// GET /analysis/analysis/:id
pub async fn get_analysis_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalysisJobResponse>> {
    let job = state.pipeline.job(&id)?;
    Ok(Json(AnalysisJobResponse::status(&job)))
}

/// GET /analysis/analysis/:id/results
pub async fn get_detailed_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalysisResultsView>> {
    Ok(Json(state.pipeline.formatted_results(&id)?))
}

/// GET /analysis/analysis/:id/summary
pub async fn get_analysis_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<KeyFindings>> {
    Ok(Json(state.pipeline.key_findings(&id)?))
}

/// GET /analysis/projects/:id/analysis
pub async fn list_project_analyses(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<AnalysisJob>>> {
    Ok(Json(state.pipeline.jobs_for_project(&id)?))
}

/// GET /analysis/projects/:id/analysis/latest
pub async fn get_latest_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LatestQuery>,
) -> ApiResult<Json<AnalysisJob>> {
    let kind = parse_kind(query.analysis_type.as_deref())?;
    Ok(Json(state.pipeline.latest_analysis(&id, kind)?))
}

/// GET /analysis/projects/:id/analysis/results
pub async fn get_project_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ProjectResultsQuery>,
) -> ApiResult<Json<AnalysisResults>> {
    let kind = parse_kind(query.analysis_type.as_deref())?;
    let analysis_id = query.analysis_id.as_deref().filter(|a| !a.is_empty());
    Ok(Json(state.pipeline.project_results(&id, analysis_id, kind)?))
}

/// GET /analysis/compare
pub async fn compare_analyses(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> ApiResult<Json<JobComparison>> {
    Ok(Json(state.pipeline.compare(
        &query.base,
        &query.head,
        query.allow_cross_project,
    )?))
}

/// Create router with all API endpoints
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/health/readiness", get(readiness))
        .route("/health/liveness", get(liveness))
        .route(
            "/github/repositories",
            post(clone_repository).get(list_repositories),
        )
        .route("/github/repositories/:id", get(get_repository))
        .route("/files/upload", post(upload_files))
        .route("/files/projects", get(list_projects))
        .route("/files/projects/:id", get(get_project).delete(delete_project))
        .route("/files/projects/:id/files", get(list_project_files))
        .route("/files/projects/:id/files/*path", get(get_file_content))
        .route("/analysis/code", post(analyze_code))
        .route("/analysis/projects/:id/analyze", post(analyze_project))
        .route("/analysis/analysis/:id", get(get_analysis_status))
        .route("/analysis/analysis/:id/results", get(get_detailed_results))
        .route("/analysis/analysis/:id/summary", get(get_analysis_summary))
        .route("/analysis/projects/:id/analysis", get(list_project_analyses))
        .route(
            "/analysis/projects/:id/analysis/latest",
            get(get_latest_analysis),
        )
        .route(
            "/analysis/projects/:id/analysis/results",
            get(get_project_results),
        )
        .route("/analysis/compare", get(compare_analyses))
}
