/// Semantic search over the curated corpus. The corpus itself, the
/// embedding model, and the index builder are external collaborators
/// (spec §1); this tool only knows the [`crate::index::KnowledgeIndex`]
/// trait and the shared argument-clamping rules in the dispatcher.
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::index::IndexError;
use crate::registry::{Registry, ToolContext, ToolImpl, ToolMeta};
use crate::rpc::dispatcher::{clamp_k, filters_from_args, MAX_K};

struct SearchKnowledge;

#[async_trait]
impl ToolImpl for SearchKnowledge {
    async fn call(&self, args: Value, cx: ToolContext) -> anyhow::Result<Value> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("missing required parameter: query"))?;

        let requested_k = args.get("k").and_then(|v| v.as_u64());
        let (k, clamped) = clamp_k(requested_k).map_err(|e| anyhow::anyhow!(e))?;
        let filters = filters_from_args(&args);

        let index = cx.index.get_or_init().await;
        let hits = tokio::select! {
            result = index.search(query, k, filters) => result,
            _ = cx.cancel.cancelled() => anyhow::bail!("search cancelled"),
        };

        match hits {
            Ok(hits) => Ok(json!({
                "hits": hits,
                "clamped_to": if clamped { Some(MAX_K) } else { None },
            })),
            Err(IndexError::Unavailable) => anyhow::bail!("knowledge index unavailable"),
            Err(IndexError::InvalidParam(msg)) => anyhow::bail!(msg),
        }
    }
}

pub fn register(registry: &mut Registry) {
    let meta = ToolMeta {
        name: "search_knowledge".to_string(),
        description: "Semantic search over the curated knowledge corpus.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Natural language search query" },
                "k": { "type": "integer", "description": "Number of results to return (default 10, max 50)" },
                "filters": {
                    "type": "object",
                    "properties": {
                        "source": { "type": "array", "items": { "type": "string" } },
                        "date_from": { "type": "string" },
                        "date_to": { "type": "string" },
                    },
                },
            },
            "required": ["query"],
            "additionalProperties": false,
        }),
    };
    registry.register(meta, Arc::new(SearchKnowledge));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn null_index_context() -> ToolContext {
        let index = crate::index::IndexHandle::new(Box::new(|| Ok(Arc::new(crate::index::NullIndex) as Arc<dyn crate::index::KnowledgeIndex>)));
        ToolContext { index, cancel: CancellationToken::new() }
    }

    #[tokio::test]
    async fn degrades_when_index_unavailable() {
        let cx = null_index_context();
        let err = SearchKnowledge.call(json!({ "query": "vitamin d" }), cx).await.unwrap_err();
        assert_eq!(err.to_string(), "knowledge index unavailable");
    }

    #[tokio::test]
    async fn rejects_zero_k() {
        let cx = null_index_context();
        let err = SearchKnowledge.call(json!({ "query": "x", "k": 0 }), cx).await.unwrap_err();
        assert_eq!(err.to_string(), "k must be >= 1");
    }

    #[tokio::test]
    async fn missing_query_is_an_error() {
        let cx = null_index_context();
        let err = SearchKnowledge.call(json!({}), cx).await.unwrap_err();
        assert!(err.to_string().contains("query"));
    }
}
