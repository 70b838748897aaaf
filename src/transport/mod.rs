/// Transport Selector (C9) support types shared by both transports.
///
/// Transports are thin adapters that frame bytes and manage connections;
/// the dispatcher operates on already-parsed envelopes (spec §9). This
/// module just holds the pieces common to stdio and HTTP/SSE.
pub mod http;
pub mod stdio;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::Config;
use crate::index::IndexHandle;
use crate::oauth::OAuthProvider;
use crate::registry::Registry;
use crate::session::SessionManager;

/// Everything a transport needs to construct sessions and dispatch
/// requests against. Built once by the entrypoint (C9) and shared behind
/// `Arc`s into whichever transport is selected. `oauth` is `None` for the
/// stdio transport, which has no bearer-token concept (spec §4.7: OAuth is
/// HTTP-only).
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub registry: Arc<Registry>,
    pub index: Arc<IndexHandle>,
    pub sessions: Arc<SessionManager>,
    pub oauth: Arc<OAuthProvider>,
    pub started_at: DateTime<Utc>,
}
