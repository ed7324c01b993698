use super::{ProjectSource, Stage, SAMPLE_FILES};
use crate::error::Result;
use crate::prompts;
use async_trait::async_trait;
use lenscore::{AnalysisKind, DependencyAnalysis, StageResult};
use lensllm::LlmService;
use tracing::info;

/// Dependency analysis followed by a Mermaid graph.
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencyStage;

#[async_trait]
impl Stage for DependencyStage {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Dependencies
    }

    async fn run(&self, source: &ProjectSource, llm: &LlmService) -> Result<StageResult> {
        info!("Starting dependency analysis for project {}", source.project.id);

        let samples = source.sample_contents(SAMPLE_FILES);
        let dependencies = llm.analyze(&prompts::dependency_analysis(&samples)).await?;
        let dependency_graph = llm.analyze(&prompts::dependency_graph(&dependencies)).await?;

        Ok(StageResult::Dependencies(DependencyAnalysis {
            dependencies,
            dependency_graph,
            analyzed_files: samples.into_iter().map(|(path, _)| path).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::source_with;
    use lensllm::{PromptCache, ScriptedProvider};
    use std::sync::Arc;

    #[tokio::test]
    async fn graph_prompt_receives_the_analysis() {
        let (_dir, source) = source_with(&[
            ("a.py", "import b\n"),
            ("b.py", "X = 1\n"),
            ("empty.py", ""),
        ]);
        let provider = Arc::new(
            ScriptedProvider::new()
                .answer("visualizing code dependencies", "graph TD\n  A --> B")
                .answer("analyzing dependencies", "a.py imports b.py"),
        );
        let llm = LlmService::new(provider.clone(), PromptCache::in_memory());

        let result = DependencyStage.run(&source, &llm).await.expect("stage");
        let StageResult::Dependencies(deps) = result else {
            panic!("wrong result kind");
        };
        assert_eq!(deps.dependencies, "a.py imports b.py");
        assert_eq!(deps.dependency_graph, "graph TD\n  A --> B");
        assert_eq!(deps.analyzed_files, vec!["a.py", "b.py"]);

        let prompts = provider.prompts();
        assert!(prompts[1].contains("a.py imports b.py"));
    }
}
