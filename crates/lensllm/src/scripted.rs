// In-memory provider for offline runs and tests

use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;
use async_trait::async_trait;
use std::sync::Mutex;

/// One scripted reaction: a prompt fragment and what to answer
#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    answer: std::result::Result<String, String>,
}

/// Provider answering from rules matched against the prompt.
///
/// Rules are checked in insertion order; the first whose needle occurs in
/// the prompt wins. Without a match the fallback answer is used.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    rules: Vec<Rule>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    /// Provider with no rules and no fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `answer` to prompts containing `needle`.
    pub fn answer(mut self, needle: &str, answer: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            answer: Ok(answer.to_string()),
        });
        self
    }

    /// Fail prompts containing `needle` with `message`.
    pub fn fail(mut self, needle: &str, message: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            answer: Err(message.to_string()),
        });
        self
    }

    /// Answer used when no rule matches.
    pub fn otherwise(mut self, answer: &str) -> Self {
        self.fallback = Some(answer.to_string());
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let rule = self.rules.iter().find(|r| prompt.contains(&r.needle));
        match (rule, &self.fallback) {
            (Some(rule), _) => rule.answer.clone().map_err(|message| LlmError::Status {
                provider: "Scripted",
                status: 500,
                body: message,
            }),
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(LlmError::ScriptExhausted(
                prompt.chars().take(50).collect(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }
}
