/// Core Framework Module
///
/// Shared infrastructure used by every other module:
/// - config.rs: typed environment configuration (§6)
/// - error.rs: the server-wide error taxonomy (§7)
/// - utils.rs: small environment/YAML helpers tools may use

pub mod config;
pub mod error;
pub mod utils;
