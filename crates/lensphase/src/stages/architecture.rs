use super::{ProjectSource, Stage, SAMPLE_FILES};
use crate::error::Result;
use crate::prompts;
use async_trait::async_trait;
use lenscore::{AnalysisKind, ArchitectureAnalysis, StageResult};
use lensllm::LlmService;
use tracing::info;

/// Architecture analysis followed by a Mermaid diagram.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchitectureStage;

#[async_trait]
impl Stage for ArchitectureStage {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Architecture
    }

    async fn run(&self, source: &ProjectSource, llm: &LlmService) -> Result<StageResult> {
        info!("Starting architecture analysis for project {}", source.project.id);

        let samples = source.sample_contents(SAMPLE_FILES);
        let prompt = prompts::architecture_analysis(
            &source.project.name,
            &source.project.languages,
            &samples,
        );
        let architecture_analysis = llm.analyze(&prompt).await?;
        let architecture_diagram = llm
            .analyze(&prompts::architecture_diagram(&architecture_analysis))
            .await?;

        Ok(StageResult::Architecture(ArchitectureAnalysis {
            architecture_analysis,
            architecture_diagram,
            analyzed_files: samples.into_iter().map(|(path, _)| path).collect(),
        }))
    }
}
