// OpenAI-compatible chat completions provider

use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const PROVIDER: &str = "OpenAI";
const SYSTEM_PROMPT: &str = "You are a source code analysis assistant.";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ATTEMPTS: u32 = 3;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatAnswer,
}

#[derive(Deserialize)]
struct ChatAnswer {
    content: Option<String>,
}

/// Provider for `POST {api_base}/chat/completions`
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiProvider {
    /// Create a provider with a 60 second request timeout.
    pub fn new(
        api_base: &str,
        api_key: String,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            max_tokens,
            temperature,
        })
    }

    /// Wait before retrying after a 429 on `attempt` (0-based).
    fn rate_limit_backoff(attempt: u32) -> Duration {
        Duration::from_secs(2u64.pow(attempt) + 1)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(
            "Sending request to OpenAI API: {}",
            prompt.chars().take(50).collect::<String>()
        );

        for attempt in 0..MAX_ATTEMPTS {
            let response = match self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    error!("OpenAI request error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let body: ChatResponse = response.json().await?;
                return body
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .ok_or_else(|| LlmError::MalformedResponse {
                        provider: PROVIDER,
                        message: "no choices in response".to_string(),
                    });
            }

            let body = response.text().await.unwrap_or_default();
            error!("OpenAI API error ({}): {}", status.as_u16(), body);
            if status.as_u16() == 429 {
                let wait = Self::rate_limit_backoff(attempt);
                info!("Rate limited, waiting {} seconds", wait.as_secs());
                tokio::time::sleep(wait).await;
            } else {
                return Err(LlmError::Status {
                    provider: PROVIDER,
                    status: status.as_u16(),
                    body,
                });
            }
        }

        error!("All OpenAI API attempts failed");
        Err(LlmError::Exhausted {
            provider: PROVIDER,
            attempts: MAX_ATTEMPTS,
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        assert_eq!(OpenAiProvider::rate_limit_backoff(0), Duration::from_secs(2));
        assert_eq!(OpenAiProvider::rate_limit_backoff(1), Duration::from_secs(3));
        assert_eq!(OpenAiProvider::rate_limit_backoff(2), Duration::from_secs(5));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let provider =
            OpenAiProvider::new("https://api.example.com/v1/", String::new(), "gpt-4", 16, 0.0)
                .expect("provider");
        assert_eq!(provider.endpoint, "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn request_body_carries_system_message() {
        let request = ChatRequest {
            model: "gpt-4",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            max_tokens: 8,
            temperature: 0.0,
        };
        let value = serde_json::to_value(&request).expect("json");
        assert_eq!(value["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["max_tokens"], 8);
    }

    #[test]
    fn response_body_decodes() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#,
        )
        .expect("decode");
        assert_eq!(body.choices[0].message.content.as_deref(), Some("ok"));
    }
}
