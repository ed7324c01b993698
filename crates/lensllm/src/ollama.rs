// Ollama generate provider

use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const PROVIDER: &str = "Ollama";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const RETRY_PAUSE: Duration = Duration::from_secs(2);
const MAX_ATTEMPTS: u32 = 3;

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Provider for `POST {api_base}/api/generate`
pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OllamaProvider {
    /// Create a provider with a 120 second request timeout.
    pub fn new(api_base: &str, model: &str, temperature: f32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", api_base.trim_end_matches('/')),
            model: model.to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        debug!(
            "Sending request to Ollama API: {}",
            prompt.chars().take(50).collect::<String>()
        );

        for _ in 0..MAX_ATTEMPTS {
            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(response) if response.status().is_success() => {
                    let body: GenerateResponse =
                        response.json().await.map_err(|e| LlmError::MalformedResponse {
                            provider: PROVIDER,
                            message: e.to_string(),
                        })?;
                    return Ok(body.response);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    error!("Ollama API error ({}): {}", status, body);
                }
                Err(e) => error!("Ollama request error: {}", e),
            }
            tokio::time::sleep(RETRY_PAUSE).await;
        }

        error!("All Ollama API attempts failed");
        Err(LlmError::Exhausted {
            provider: PROVIDER,
            attempts: MAX_ATTEMPTS,
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
