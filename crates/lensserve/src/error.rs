//! API error types

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lenscore::CoreError;
use lensphase::PipelineError;
use lensstore::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API error with HTTP status code
#[derive(Debug, Clone, Serialize, Error)]
pub struct ApiError {
    /// HTTP status code
    #[serde(skip)]
    pub status: StatusCode,

    /// Error message
    pub message: String,

    /// Optional error code for client handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    /// Create a new API error with code
    pub fn with_code(
        status: StatusCode,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, message, "NOT_FOUND")
    }

    /// 409 Conflict
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::CONFLICT, message, "CONFLICT")
    }

    /// 422 Unprocessable Entity
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::UNPROCESSABLE_ENTITY, message, "VALIDATION_ERROR")
    }

    /// 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
    }

    /// 502 Bad Gateway, used for LLM provider failures
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_GATEWAY, message, "LLM_ERROR")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{:?}] [{}] {}", self.status, code, self.message),
            None => write!(f, "[{:?}] {}", self.status, self.message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("HTTP error: {}", self);
        }
        let body = Json(serde_json::json!({
            "success": false,
            "message": self.message,
            "code": self.code,
        }));

        (self.status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { .. } => ApiError::conflict(err.to_string()),
            CoreError::UnknownAnalysisKind(_) => ApiError::validation(err.to_string()),
            CoreError::NotComparable(_) => ApiError::bad_request(err.to_string()),
            CoreError::MalformedResult { .. } => ApiError::internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::not_found(err.to_string()),
            StoreError::PathEscape(_) => ApiError::bad_request(err.to_string()),
            StoreError::Core(core) => core.into(),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Store(store) => store.into(),
            PipelineError::Core(core) => core.into(),
            PipelineError::Llm(llm) => ApiError::upstream(llm.to_string()),
            PipelineError::InvalidRequest(_) => ApiError::validation(err.to_string()),
            PipelineError::InvalidUrl(_)
            | PipelineError::RepositoryNotReady(_)
            | PipelineError::NotCompleted(_) => ApiError::bad_request(err.to_string()),
            PipelineError::Git(_) | PipelineError::LockPoisoned | PipelineError::Task(_) => {
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lenscore::{AnalysisStatus, RepositoryStatus};

    #[test]
    fn test_api_error_not_found() {
        let error: ApiError = StoreError::not_found("Project", "p1").into();
        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert_eq!(error.message, "Project with ID p1 not found");
        assert_eq!(error.code.as_deref(), Some("NOT_FOUND"));
    }

    #[test]
    fn test_pipeline_error_mapping() {
        let cases = [
            (
                PipelineError::NotCompleted(AnalysisStatus::Running),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::RepositoryNotReady(RepositoryStatus::Cloning),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::InvalidRequest("empty".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PipelineError::Core(CoreError::invalid_transition("completed", "running")),
                StatusCode::CONFLICT,
            ),
            (
                PipelineError::Llm(lensllm::LlmError::Exhausted {
                    provider: "OpenAI",
                    attempts: 3,
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (PipelineError::LockPoisoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_not_completed_message() {
        let error: ApiError = PipelineError::NotCompleted(AnalysisStatus::Pending).into();
        assert_eq!(
            error.message,
            "Analysis job is not yet completed. Current status: pending"
        );
    }

    #[test]
    fn test_api_error_display() {
        let error = ApiError::not_found("test");
        let display = format!("{}", error);
        assert!(display.contains("NOT_FOUND"));
        assert!(display.contains("test"));
    }

    #[test]
    fn test_api_error_into_response() {
        let error = ApiError::bad_request("test error");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
