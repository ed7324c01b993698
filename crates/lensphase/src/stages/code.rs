use super::{ProjectSource, Stage};
use crate::error::Result;
use crate::prompts;
use async_trait::async_trait;
use lenscore::{AnalysisKind, CodeAnalysis, ProjectFile, StageResult};
use lensllm::LlmService;
use std::collections::BTreeMap;
use tracing::info;

/// Files per language that get an individual summary.
pub const FILES_PER_LANGUAGE: usize = 10;

/// Language and file summaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeStage;

#[async_trait]
impl Stage for CodeStage {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Code
    }

    async fn run(&self, source: &ProjectSource, llm: &LlmService) -> Result<StageResult> {
        info!("Starting code analysis for project {}", source.project.id);

        let code_files = source.code_files();
        let mut by_language: BTreeMap<&str, Vec<&ProjectFile>> = BTreeMap::new();
        for file in &code_files {
            if let Some(language) = file.language.as_deref() {
                by_language.entry(language).or_default().push(file);
            }
        }

        let mut analysis = CodeAnalysis {
            file_count: code_files.len() as u64,
            language_distribution: by_language
                .iter()
                .map(|(lang, files)| (lang.to_string(), files.len() as u64))
                .collect(),
            ..CodeAnalysis::default()
        };

        for (language, files) in &by_language {
            let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
            let summary = llm
                .analyze(&prompts::language_summary(language, &paths))
                .await?;
            analysis
                .language_summaries
                .insert(language.to_string(), summary);

            for file in files.iter().take(FILES_PER_LANGUAGE) {
                let Some(content) = source.content(&file.path) else {
                    continue;
                };
                let summary = llm
                    .analyze(&prompts::file_summary(&file.path, language, &content))
                    .await?;
                analysis.file_summaries.insert(file.path.clone(), summary);
            }
        }

        Ok(StageResult::Code(analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::source_with;
    use lensllm::{PromptCache, ScriptedProvider};
    use std::sync::Arc;

    #[tokio::test]
    async fn summarizes_each_language_and_sampled_file() {
        let (_dir, source) = source_with(&[
            ("app.py", "import os\n"),
            ("util.py", "def f():\n    pass\n"),
            ("main.go", "package main\n"),
            ("README", "docs"),
        ]);
        let provider = Arc::new(
            ScriptedProvider::new()
                .answer("Review this file", "file summary")
                .otherwise("language summary"),
        );
        let llm = LlmService::new(provider.clone(), PromptCache::in_memory());

        let result = CodeStage.run(&source, &llm).await.expect("code stage");
        let StageResult::Code(code) = result else {
            panic!("wrong result kind");
        };
        assert_eq!(code.file_count, 3);
        assert_eq!(code.language_distribution.get("Python"), Some(&2));
        assert_eq!(code.language_distribution.get("Go"), Some(&1));
        assert_eq!(code.language_summaries.len(), 2);
        assert_eq!(
            code.file_summaries.keys().collect::<Vec<_>>(),
            vec!["app.py", "main.go", "util.py"]
        );
        assert_eq!(code.file_summaries["app.py"], "file summary");
        // two language prompts and three file prompts
        assert_eq!(provider.prompts().len(), 5);
    }

    #[tokio::test]
    async fn llm_failure_fails_the_stage() {
        let (_dir, source) = source_with(&[("app.py", "import os\n")]);
        let provider = Arc::new(ScriptedProvider::new().fail("expert code analyst", "down"));
        let llm = LlmService::new(provider, PromptCache::in_memory());

        assert!(CodeStage.run(&source, &llm).await.is_err());
    }
}
