// Provider trait, provider selection, and settings

use crate::error::{LlmError, Result};
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A backend that turns a prompt into an answer
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the answer text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// OpenAI-compatible chat completions
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

impl LlmProviderKind {
    /// Return the configuration name of the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProviderKind::OpenAi => "openai",
            LlmProviderKind::Ollama => "ollama",
        }
    }

    /// Parse a configuration name, case-insensitively.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProviderKind::OpenAi),
            "ollama" => Ok(LlmProviderKind::Ollama),
            _ => Err(LlmError::UnknownProvider(s.to_string())),
        }
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for provider construction and the answer cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Selected backend
    pub provider: LlmProviderKind,
    /// OpenAI-compatible API base URL
    pub api_base: String,
    /// OpenAI model name
    pub model: String,
    /// OpenAI API key
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Completion token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Ollama API base URL
    pub ollama_api_base: String,
    /// Ollama model name
    pub ollama_model: String,
    /// Directory holding `llm_cache.json`; `None` disables persistence
    pub cache_dir: Option<PathBuf>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::OpenAi,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            api_key: None,
            max_tokens: 2048,
            temperature: 0.0,
            ollama_api_base: "http://localhost:11434".to_string(),
            ollama_model: "llama2".to_string(),
            cache_dir: None,
        }
    }
}

impl LlmSettings {
    /// Check the settings of the selected provider.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        match self.provider {
            LlmProviderKind::OpenAi => {
                if self.api_base.trim().is_empty() || self.model.trim().is_empty() {
                    return Err(LlmError::Config(
                        "OpenAI API base and model must be set".to_string(),
                    ));
                }
                if self.max_tokens == 0 {
                    return Err(LlmError::Config("max_tokens must be positive".to_string()));
                }
            }
            LlmProviderKind::Ollama => {
                if self.ollama_api_base.trim().is_empty() || self.ollama_model.trim().is_empty() {
                    return Err(LlmError::Config(
                        "Ollama API base and model must be set".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Construct the provider selected by `settings`.
pub fn build_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>> {
    settings.validate()?;
    let provider: Arc<dyn LlmProvider> = match settings.provider {
        LlmProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
            &settings.api_base,
            settings.api_key.clone().unwrap_or_default(),
            &settings.model,
            settings.max_tokens,
            settings.temperature,
        )?),
        LlmProviderKind::Ollama => Arc::new(OllamaProvider::new(
            &settings.ollama_api_base,
            &settings.ollama_model,
            settings.temperature,
        )?),
    };
    Ok(provider)
}
