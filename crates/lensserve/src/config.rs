//! Server configuration from TOML and environment

use lensllm::{LlmProviderKind, LlmSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default host address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port number
pub const DEFAULT_PORT: u16 = 8000;

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "/tmp/codelens";

/// Default request body cap for uploads, in megabytes
pub const DEFAULT_MAX_UPLOAD_MB: usize = 100;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "CODELENS_";

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment variable with an unusable value
    #[error("Invalid value for {name}: {value}")]
    Env {
        /// Variable name
        name: String,
        /// Offending value
        value: String,
    },

    /// Setting outside its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Root of clones, project files, database, and cache
    pub data_dir: PathBuf,

    /// Log level for tracing
    pub log_level: String,

    /// Request body cap for uploads, in megabytes
    pub max_upload_mb: usize,

    /// LLM provider settings
    pub llm: LlmSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: vec!["*".to_string()],
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_level: "info".to_string(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            llm: LlmSettings::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name: name.to_string(),
        value,
    })
}

impl ServerConfig {
    /// Load from an optional TOML file, apply environment overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// Variables, each prefixed with `CODELENS_`:
    /// - `HOST`, `PORT`, `DATA_DIR`, `LOG_LEVEL`, `MAX_UPLOAD_MB`
    /// - `CORS_ORIGINS` - comma separated
    /// - `LLM_PROVIDER` - `openai` or `ollama`
    /// - `OPENAI_API_BASE`, `OPENAI_MODEL`, `OPENAI_API_KEY`,
    ///   `OPENAI_MAX_TOKENS`, `OPENAI_TEMPERATURE`
    /// - `OLLAMA_API_BASE`, `OLLAMA_MODEL`
    ///
    /// A bare `OPENAI_API_KEY` is used when the prefixed key is unset.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |suffix: &str| -> Option<(String, String)> {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, host)) = var("HOST") {
            self.host = host;
        }
        if let Some((name, port)) = var("PORT") {
            self.port = parse_env(&name, port)?;
        }
        if let Some((_, dir)) = var("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some((_, level)) = var("LOG_LEVEL") {
            self.log_level = level.to_ascii_lowercase();
        }
        if let Some((name, mb)) = var("MAX_UPLOAD_MB") {
            self.max_upload_mb = parse_env(&name, mb)?;
        }
        if let Some((_, origins)) = var("CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some((name, provider)) = var("LLM_PROVIDER") {
            self.llm.provider = LlmProviderKind::parse(&provider).map_err(|_| ConfigError::Env {
                name,
                value: provider,
            })?;
        }
        if let Some((_, base)) = var("OPENAI_API_BASE") {
            self.llm.api_base = base;
        }
        if let Some((_, model)) = var("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some((_, key)) = var("OPENAI_API_KEY").or_else(|| {
            lookup("OPENAI_API_KEY").map(|value| ("OPENAI_API_KEY".to_string(), value))
        }) {
            self.llm.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some((name, tokens)) = var("OPENAI_MAX_TOKENS") {
            self.llm.max_tokens = parse_env(&name, tokens)?;
        }
        if let Some((name, temperature)) = var("OPENAI_TEMPERATURE") {
            self.llm.temperature = parse_env(&name, temperature)?;
        }
        if let Some((_, base)) = var("OLLAMA_API_BASE") {
            self.llm.ollama_api_base = base;
        }
        if let Some((_, model)) = var("OLLAMA_MODEL") {
            self.llm.ollama_model = model;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("Port cannot be zero".to_string()));
        }
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("Host cannot be empty".to_string()));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("Data directory cannot be empty".to_string()));
        }
        if self.max_upload_mb == 0 {
            return Err(ConfigError::Invalid(
                "Upload limit must be greater than zero".to_string(),
            ));
        }
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.log_level
                )));
            }
        }
        self.llm
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Socket address for the listener
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("Invalid address: {}", e)))
    }

    /// Full server URL
    #[must_use]
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Directory holding repository clones
    pub fn clone_root(&self) -> PathBuf {
        self.data_dir.join("repos")
    }

    /// Directory holding project files
    pub fn files_root(&self) -> PathBuf {
        self.data_dir.join("files")
    }

    /// SQLite database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("codelens.db")
    }

    /// LLM answer cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// LLM settings with the cache directory filled in
    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            cache_dir: Some(self.cache_dir()),
            ..self.llm.clone()
        }
    }

    /// Upload body cap in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
