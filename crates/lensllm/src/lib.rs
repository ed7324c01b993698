//! lensllm - LLM Invocation Layer
//!
//! Provider adapters for OpenAI-compatible and Ollama endpoints, and a
//! service wrapping them with prompt truncation and a persistent answer cache.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Persistent prompt/answer cache.
pub mod cache;
/// LLM error types.
pub mod error;
/// Ollama `/api/generate` provider.
pub mod ollama;
/// OpenAI chat completions provider.
pub mod openai;
/// Provider trait and settings.
pub mod provider;
/// In-memory provider answering from a script.
pub mod scripted;
/// Truncating, caching service over a provider.
pub mod service;

pub use cache::PromptCache;
pub use error::{LlmError, Result};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{build_provider, LlmProvider, LlmProviderKind, LlmSettings};
pub use scripted::ScriptedProvider;
pub use service::{LlmService, MAX_PROMPT_TOKENS};
