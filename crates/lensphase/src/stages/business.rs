use super::{ProjectSource, Stage, SAMPLE_FILES};
use crate::error::Result;
use crate::prompts;
use async_trait::async_trait;
use lenscore::{AnalysisKind, BusinessAnalysis, StageResult};
use lensllm::LlmService;
use serde_json::Value;
use tracing::{debug, info};

/// Business functionality followed by an entity model.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusinessStage;

#[async_trait]
impl Stage for BusinessStage {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Business
    }

    async fn run(&self, source: &ProjectSource, llm: &LlmService) -> Result<StageResult> {
        info!(
            "Starting business functionality analysis for project {}",
            source.project.id
        );

        let samples = source.sample_contents(SAMPLE_FILES);
        let business_functionality = llm.analyze(&prompts::business_analysis(&samples)).await?;
        let entities = llm
            .analyze(&prompts::business_entities(&business_functionality))
            .await?;

        Ok(StageResult::Business(BusinessAnalysis {
            business_functionality,
            business_entities: parse_entities(&entities),
            analyzed_files: samples.into_iter().map(|(path, _)| path).collect(),
        }))
    }
}

/// Pull the JSON object out of an entity answer.
///
/// A fenced ```json block wins, then the outermost braces. Answers without
/// parseable JSON are kept verbatim as a string.
pub fn parse_entities(answer: &str) -> Value {
    let fenced = answer.find("```json").and_then(|start| {
        let body = &answer[start + "```json".len()..];
        body.find("```").map(|end| &body[..end])
    });
    if let Some(Ok(value)) = fenced.map(|body| serde_json::from_str::<Value>(body.trim())) {
        return value;
    }

    if let (Some(start), Some(end)) = (answer.find('{'), answer.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&answer[start..=end]) {
                return value;
            }
        }
    }

    debug!("Entity answer holds no JSON object, keeping text");
    Value::String(answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(
        "Entities:\n```json\n{\"entities\": [{\"name\": \"Order\"}]}\n```\nDone.",
        json!({"entities": [{"name": "Order"}]})
    )]
    #[case(
        "Here you go {\"entities\": []} thanks",
        json!({"entities": []})
    )]
    #[case("no json here", json!("no json here"))]
    #[case("broken {\"entities\": [}", json!("broken {\"entities\": [}"))]
    fn entity_answers(#[case] answer: &str, #[case] expected: Value) {
        assert_eq!(parse_entities(answer), expected);
    }

    #[tokio::test]
    async fn entities_are_parsed_into_json() {
        use crate::stages::testing::source_with;
        use lensllm::{PromptCache, ScriptedProvider};
        use std::sync::Arc;

        let (_dir, source) = source_with(&[("orders.py", "class Order:\n    pass\n")]);
        let provider = Arc::new(
            ScriptedProvider::new()
                .answer(
                    "deriving domain models",
                    "```json\n{\"entities\": [{\"name\": \"Order\"}]}\n```",
                )
                .answer("business analyst", "Handles customer orders."),
        );
        let llm = LlmService::new(provider, PromptCache::in_memory());

        let result = BusinessStage.run(&source, &llm).await.expect("stage");
        let StageResult::Business(business) = result else {
            panic!("wrong result kind");
        };
        assert_eq!(business.business_functionality, "Handles customer orders.");
        assert_eq!(business.business_entities["entities"][0]["name"], "Order");
        assert_eq!(business.analyzed_files, vec!["orders.py"]);
    }
}
