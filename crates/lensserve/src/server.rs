//! Server instance management

use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use lensllm::LlmService;
use lensphase::AnalysisPipeline;
use lensstore::{Storage, Workspace};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::handlers::{create_router, AppState};

/// CORS layer for the configured origins. `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// Router with every endpoint, body limit, tracing, and CORS applied.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();
    let cors = cors_layer(&state.config.cors_origins);
    create_router()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CodeLens HTTP server
///
/// Owns the configuration and the shared application state.
pub struct CodeLensServer {
    /// Server configuration
    config: ServerConfig,

    /// Handler state
    state: AppState,
}

impl CodeLensServer {
    /// Create new server instance
    ///
    /// Validates the configuration, creates the data directories, opens
    /// storage, and builds the LLM provider.
    pub fn new(config: ServerConfig) -> Result<Self, ApiError> {
        config
            .validate()
            .map_err(|e| ApiError::internal(format!("Invalid config: {}", e)))?;

        let workspace = Workspace::new(config.clone_root(), config.files_root());
        workspace.ensure_dirs().map_err(|e| {
            error!("Failed to create data directories: {}", e);
            ApiError::internal(format!("Failed to create data directories: {}", e))
        })?;
        std::fs::create_dir_all(config.cache_dir())
            .map_err(|e| ApiError::internal(format!("Failed to create cache directory: {}", e)))?;

        let storage = Storage::open(config.db_path()).map_err(|e| {
            error!("Failed to open storage: {}", e);
            ApiError::internal(format!("Failed to open storage: {}", e))
        })?;

        let llm = LlmService::from_settings(&config.llm_settings())
            .map_err(|e| ApiError::internal(format!("Failed to configure LLM provider: {}", e)))?;

        let pipeline =
            AnalysisPipeline::new(Arc::new(Mutex::new(storage)), workspace, Arc::new(llm));
        let state = AppState::new(pipeline, config.clone());

        Ok(Self { config, state })
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, ApiError> {
        self.config
            .socket_addr()
            .map_err(|e| ApiError::internal(e.to_string()))
    }

    /// Router serving this server's state
    pub fn app(&self) -> Router {
        build_app(self.state.clone())
    }

    /// Start server and run until a shutdown signal arrives
    pub async fn start(&self) -> Result<(), ApiError> {
        let addr = self.socket_addr()?;

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind to {}: {:?}", addr, e);
            ApiError::internal(format!("Failed to bind to {}: {}", addr, e))
        })?;

        info!("Server listening on: {}", self.server_url());

        axum::serve(listener, self.app())
            .with_graceful_shutdown(wait_for_shutdown())
            .await
            .map_err(|e| ApiError::internal(format!("Server error: {}", e)))
    }

    /// Get server URL
    #[must_use]
    pub fn server_url(&self) -> String {
        self.config.server_url()
    }
}

/// Wait for Ctrl+C or SIGTERM
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix;
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received TERM signal");
            }
            Err(e) => {
                error!("Failed to install TERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_creates_data_dirs() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let server = CodeLensServer::new(config).expect("server");
        assert!(dir.path().join("repos").is_dir());
        assert!(dir.path().join("files").is_dir());
        assert!(dir.path().join("cache").is_dir());
        assert!(dir.path().join("codelens.db").is_file());
        assert!(server.server_url().starts_with("http://"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert!(CodeLensServer::new(config).is_err());
    }
}
