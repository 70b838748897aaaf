/// Liveness tool: always succeeds, observes no state, keeps working even
/// when the knowledge index has failed to load (spec S5).
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::registry::{Registry, ToolContext, ToolImpl, ToolMeta};

struct Ping;

#[async_trait]
impl ToolImpl for Ping {
    async fn call(&self, _args: Value, _cx: ToolContext) -> anyhow::Result<Value> {
        Ok(json!("pong"))
    }
}

pub fn register(registry: &mut Registry) {
    let meta = ToolMeta {
        name: "ping".to_string(),
        description: "Liveness check; always returns \"pong\".".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "required": [],
        }),
    };
    registry.register(meta, Arc::new(Ping));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn pong() {
        let index = crate::index::IndexHandle::new(Box::new(|| Ok(Arc::new(crate::index::NullIndex) as Arc<dyn crate::index::KnowledgeIndex>)));
        let cx = ToolContext { index, cancel: CancellationToken::new() };
        let result = Ping.call(json!({}), cx).await.unwrap();
        assert_eq!(result, json!("pong"));
    }

    #[test]
    fn registers_with_empty_schema() {
        let mut registry = Registry::new();
        register(&mut registry);
        let tool = registry.get_tool("ping").expect("ping registered");
        assert_eq!(tool.meta.input_schema["properties"], json!({}));
    }
}
