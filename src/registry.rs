/// Tool & Prompt Registry (C2)
///
/// Map tool/prompt name to (schema, implementation). Registration happens
/// once at startup via [`Registry::register`] / [`Registry::register_prompt`];
/// after [`Registry::finish`] the registry is immutable and shared behind an
/// `Arc` for the process lifetime. This generalizes the teacher's
/// `ToolRegistry` (a `Vec<MCPTool>` plus a `HashMap` of boxed closures) to
/// also carry prompts and to validate each tool's schema against invariant
/// I5 (non-empty `properties`, or zero declared parameters) at registration
/// time rather than discovering the violation at `tools/list` time.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::index::SharedIndex;

/// An async callable invoked by the dispatcher for `tools/call`. Consumed,
/// not implemented by the protocol core (spec §6): each concrete tool in
/// `src/tools/` implements this against the `SharedIndex` handle it is
/// constructed with.
#[async_trait]
pub trait ToolImpl: Send + Sync {
    async fn call(&self, args: Value, cx: ToolContext) -> anyhow::Result<Value>;
}

/// Everything a tool invocation may need beyond its arguments: the index
/// handle and a cancellation signal it should observe if the operation is
/// long-running (§4.3 `ToolImpl`: "must be cancellation-aware where the
/// operation is long-running").
#[derive(Clone)]
pub struct ToolContext {
    pub index: SharedIndex,
    pub cancel: CancellationToken,
}

#[derive(Clone, Serialize)]
pub struct ToolMeta {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub struct Tool {
    pub meta: ToolMeta,
    pub implementation: Arc<dyn ToolImpl>,
}

#[derive(Clone, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Clone, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: Value,
}

#[async_trait]
pub trait PromptImpl: Send + Sync {
    async fn render(&self, args: HashMap<String, String>) -> anyhow::Result<Vec<PromptMessage>>;
}

#[derive(Clone, Serialize)]
pub struct PromptMeta {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

pub struct Prompt {
    pub meta: PromptMeta,
    pub implementation: Arc<dyn PromptImpl>,
}

/// Read-only-after-startup registry of tools and prompts. `IndexMap`
/// preserves insertion order for stable `list_tools`/`list_prompts`
/// orderings (§4.2, §8's "tools/list is idempotent and returns a stable
/// ordering") while still giving O(1) lookup by name.
#[derive(Default)]
pub struct Registry {
    tools: IndexMap<String, Tool>,
    prompts: IndexMap<String, Prompt>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Panics if `input_schema.properties` is empty and
    /// the schema does not also declare zero required parameters — this is
    /// invariant I5 from spec §8, and a registration-time contract
    /// violation belongs at startup, not discovered later by a client.
    pub fn register(&mut self, meta: ToolMeta, implementation: Arc<dyn ToolImpl>) {
        validate_schema(&meta);
        let name = meta.name.clone();
        self.tools.insert(name, Tool { meta, implementation });
    }

    pub fn register_prompt(&mut self, meta: PromptMeta, implementation: Arc<dyn PromptImpl>) {
        let name = meta.name.clone();
        self.prompts.insert(name, Prompt { meta, implementation });
    }

    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn get_prompt(&self, name: &str) -> Option<&Prompt> {
        self.prompts.get(name)
    }

    /// Stable, insertion-ordered snapshot. The snapshot is cheap to clone
    /// since the registry never mutates post-startup (§5: "tools/list
    /// response reflects the registry snapshot at the moment of dispatch,
    /// which is constant post-startup").
    pub fn list_tools(&self) -> Vec<ToolMeta> {
        self.tools.values().map(|t| t.meta.clone()).collect()
    }

    pub fn list_prompts(&self) -> Vec<PromptMeta> {
        self.prompts.values().map(|p| p.meta.clone()).collect()
    }
}

fn validate_schema(meta: &ToolMeta) {
    let properties_empty = meta
        .input_schema
        .get("properties")
        .map(|p| p.as_object().map(|o| o.is_empty()).unwrap_or(true))
        .unwrap_or(true);
    if !properties_empty {
        return;
    }
    let required_empty = meta
        .input_schema
        .get("required")
        .map(|r| r.as_array().map(|a| a.is_empty()).unwrap_or(true))
        .unwrap_or(true);
    if !required_empty {
        panic!(
            "tool '{}' declares required parameters but an empty input_schema.properties",
            meta.name
        );
    }
}
