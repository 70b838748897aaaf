/// Prompts Module
///
/// Prompts share the Tool lifecycle (registered once at startup, read-only
/// afterwards) but render a list of role-tagged messages instead of
/// invoking a callable (spec §3).
pub mod research_summary;

use crate::registry::Registry;

pub fn register_all(registry: &mut Registry) {
    research_summary::register(registry);
}
