// Truncating, caching front for an LLM provider

use crate::cache::PromptCache;
use crate::error::Result;
use crate::provider::{build_provider, LlmProvider, LlmSettings};
use lenscore::{estimate_tokens, truncate_to_tokens};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Prompts above this estimate are cut before sending.
pub const MAX_PROMPT_TOKENS: usize = 4000;

/// Entry point used by the analysis stages
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    cache: Mutex<PromptCache>,
}

impl LlmService {
    /// Wrap `provider` with `cache`.
    pub fn new(provider: Arc<dyn LlmProvider>, cache: PromptCache) -> Self {
        info!("LLM service initialized with provider: {}", provider.name());
        Self {
            provider,
            cache: Mutex::new(cache),
        }
    }

    /// Build the configured provider and open its cache.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let provider = build_provider(settings)?;
        let cache = match &settings.cache_dir {
            Some(dir) => PromptCache::open(dir),
            None => PromptCache::in_memory(),
        };
        Ok(Self::new(provider, cache))
    }

    /// Name of the wrapped provider.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Send a prompt, answering from the cache when possible.
    ///
    /// Only successful answers are cached.
    pub async fn analyze(&self, prompt: &str) -> Result<String> {
        let prompt = prepare_prompt(prompt);

        if let Some(hit) = self.cached(&prompt) {
            debug!(
                "Using cached response for prompt: {}",
                prompt.chars().take(50).collect::<String>()
            );
            return Ok(hit);
        }

        let answer = self.provider.complete(&prompt).await?;
        self.remember(&prompt, &answer);
        Ok(answer)
    }

    fn cached(&self, prompt: &str) -> Option<String> {
        let cache = self.cache.lock().ok()?;
        cache.get(prompt).map(str::to_string)
    }

    fn remember(&self, prompt: &str, answer: &str) {
        let Ok(mut cache) = self.cache.lock() else {
            return;
        };
        if let Err(e) = cache.insert(prompt, answer.to_string()) {
            warn!("Failed to persist LLM cache: {}", e);
        }
    }
}

fn prepare_prompt(prompt: &str) -> String {
    let tokens = estimate_tokens(prompt);
    if tokens > MAX_PROMPT_TOKENS {
        warn!(
            "Prompt token count ({}) exceeds limit, truncating to {}",
            tokens, MAX_PROMPT_TOKENS
        );
        truncate_to_tokens(prompt, MAX_PROMPT_TOKENS)
    } else {
        prompt.to_string()
    }
}
