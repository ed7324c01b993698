//! LLM error types

use thiserror::Error;

/// Result type for LLM calls
pub type Result<T> = std::result::Result<T, LlmError>;

/// Failures talking to an LLM provider
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport failure after all attempts
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the provider
    #[error("{provider} API error ({status}): {body}")]
    Status {
        /// Provider name
        provider: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Every attempt failed
    #[error("Could not get a response from the {provider} API after {attempts} attempts")]
    Exhausted {
        /// Provider name
        provider: &'static str,
        /// Attempts made
        attempts: u32,
    },

    /// Response body did not carry an answer
    #[error("Malformed {provider} response: {message}")]
    MalformedResponse {
        /// Provider name
        provider: &'static str,
        /// What was missing
        message: String,
    },

    /// Provider name not recognised
    #[error("Unsupported LLM provider: {0}")]
    UnknownProvider(String),

    /// Provider settings unusable
    #[error("Invalid LLM configuration: {0}")]
    Config(String),

    /// Scripted provider ran out of answers
    #[error("No scripted answer left for prompt: {0}")]
    ScriptExhausted(String),
}
