// One-off snippet analysis

use crate::error::{PipelineError, Result};
use crate::prompts;
use lensllm::LlmService;
use serde::{Deserialize, Serialize};

/// Parsed answer for a snippet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnippetAnalysis {
    /// Request ID
    pub analysis_id: String,
    /// What the code does
    pub summary: String,
    /// Language as requested
    pub language: String,
    /// Complexity assessment
    pub complexity: Option<String>,
    /// Improvement suggestions
    pub suggestions: Option<String>,
}

fn labelled<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.strip_prefix(label).map(str::trim)
}

/// Split an answer into its labelled lines.
///
/// The whole answer is the summary when no summary line exists.
pub fn parse_snippet_answer(answer: &str) -> (String, Option<String>, Option<String>) {
    let mut summary = None;
    let mut complexity = None;
    let mut suggestions = None;
    for line in answer.lines() {
        if let Some(value) = labelled(line, "- Summary:") {
            summary = Some(value.to_string());
        } else if let Some(value) = labelled(line, "- Complexity:") {
            complexity = Some(value.to_string());
        } else if let Some(value) = labelled(line, "- Suggestions:") {
            suggestions = Some(value.to_string());
        }
    }
    let summary = summary
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| answer.to_string());
    (summary, complexity, suggestions)
}

/// Ask the LLM about one snippet.
pub async fn analyze_snippet(
    llm: &LlmService,
    code: &str,
    language: &str,
    filename: Option<&str>,
) -> Result<SnippetAnalysis> {
    if code.trim().is_empty() {
        return Err(PipelineError::InvalidRequest("code must not be empty".to_string()));
    }
    let answer = llm
        .analyze(&prompts::code_snippet(code, language, filename))
        .await?;
    let (summary, complexity, suggestions) = parse_snippet_answer(&answer);
    Ok(SnippetAnalysis {
        analysis_id: uuid::Uuid::new_v4().to_string(),
        summary,
        language: language.to_string(),
        complexity,
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lensllm::{PromptCache, ScriptedProvider};
    use std::sync::Arc;

    #[test]
    fn labelled_lines_are_extracted() {
        let (summary, complexity, suggestions) = parse_snippet_answer(
            "Intro\n- Summary: adds numbers\n- Complexity: trivial\n- Suggestions: add types\n",
        );
        assert_eq!(summary, "adds numbers");
        assert_eq!(complexity.as_deref(), Some("trivial"));
        assert_eq!(suggestions.as_deref(), Some("add types"));
    }

    #[test]
    fn unlabelled_answer_becomes_summary() {
        let (summary, complexity, suggestions) = parse_snippet_answer("It prints a value.");
        assert_eq!(summary, "It prints a value.");
        assert!(complexity.is_none());
        assert!(suggestions.is_none());
    }

    #[tokio::test]
    async fn snippet_round_trip_through_llm() {
        let provider = Arc::new(
            ScriptedProvider::new().otherwise("- Summary: prints one\n- Complexity: low"),
        );
        let llm = LlmService::new(provider, PromptCache::in_memory());
        let result = analyze_snippet(&llm, "print(1)", "python", None)
            .await
            .expect("analysis");
        assert_eq!(result.summary, "prints one");
        assert_eq!(result.complexity.as_deref(), Some("low"));
        assert_eq!(result.suggestions, None);
        assert_eq!(result.language, "python");

        assert!(analyze_snippet(&llm, "  ", "python", None).await.is_err());
    }
}
