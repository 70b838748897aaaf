/// Session Manager (C4)
///
/// Per-connection protocol state machine; correlates HTTP↔SSE for a session
/// id and hosts the single synthesized session for stdio. This is the only
/// place the FSM in spec §4.4 is implemented — both transports share it
/// unchanged.
pub mod manager;

pub use manager::{OutboundMessage, Session, SessionManager, SessionState};
