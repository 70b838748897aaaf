/// Turns a topic argument into a short system+user message pair steering an
/// LLM to ground its answer in the corpus via `search_knowledge` before
/// answering, rather than answering from its own training data.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::registry::{PromptArgument, PromptImpl, PromptMessage, PromptMeta, Registry};

struct ResearchSummary;

#[async_trait]
impl PromptImpl for ResearchSummary {
    async fn render(&self, args: HashMap<String, String>) -> anyhow::Result<Vec<PromptMessage>> {
        let topic = args
            .get("topic")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: topic"))?;

        Ok(vec![
            PromptMessage {
                role: "system".to_string(),
                content: json!({
                    "type": "text",
                    "text": "Answer using only information retrieved via search_knowledge. \
                             Cite the source title for every claim.",
                }),
            },
            PromptMessage {
                role: "user".to_string(),
                content: json!({
                    "type": "text",
                    "text": format!("Summarize what the corpus says about: {topic}"),
                }),
            },
        ])
    }
}

pub fn register(registry: &mut Registry) {
    let meta = PromptMeta {
        name: "research_summary".to_string(),
        description: "Steer an LLM to answer a topic grounded in the corpus via search_knowledge.".to_string(),
        arguments: vec![PromptArgument {
            name: "topic".to_string(),
            description: "The topic to summarize".to_string(),
            required: true,
        }],
    };
    registry.register_prompt(meta, Arc::new(ResearchSummary));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn renders_two_messages() {
        let mut args = HashMap::new();
        args.insert("topic".to_string(), "magnesium".to_string());
        let messages = ResearchSummary.render(args).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
    }

    #[tokio::test]
    async fn missing_topic_is_an_error() {
        let err = ResearchSummary.render(HashMap::new()).await.unwrap_err();
        assert!(err.to_string().contains("topic"));
    }
}
