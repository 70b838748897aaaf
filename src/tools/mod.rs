/// Tools Module
///
/// Each tool is a small struct implementing [`crate::registry::ToolImpl`],
/// plus a `meta()` describing its JSON Schema. `register_all` wires every
/// tool into the registry during startup; this is the "external tool pack"
/// the entrypoint imports per spec §4.9.
pub mod ping;
pub mod search_knowledge;

use crate::registry::Registry;

pub fn register_all(registry: &mut Registry) {
    ping::register(registry);
    search_knowledge::register(registry);
}
