use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Session FSM states (spec §3, §4.4). Transitions only move forward
/// except into `Closed`, which is reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    New,
    Initializing,
    Ready,
    Closing,
    Closed,
}

/// A frame destined for the client: either a JSON-RPC response/notification
/// object to serialize, or a request to close the channel (EOF / SSE
/// stream ended).
pub enum OutboundMessage {
    Frame(Value),
    Close,
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// A logical MCP conversation (spec §3). Internally synchronized so the
/// session map can use a coarse lock (or, here, a sharded `DashMap`) while
/// individual sessions serialize their own state transitions (spec §5).
pub struct Session {
    pub id: String,
    state: Mutex<SessionState>,
    state_tx: watch::Sender<SessionState>,
    pub protocol_version: Mutex<Option<String>>,
    pub client_info: Mutex<Option<ClientInfo>>,
    pub auth_token_ref: Mutex<Option<String>>,
    pub created_at: DateTime<Utc>,
    last_seen_unix: AtomicI64,
    outbound: mpsc::Sender<OutboundMessage>,
    cancel_tokens: DashMap<String, CancellationToken>,
    /// Root token for this session; cancelling it propagates to every
    /// in-flight request (spec §4.4: "all pending tool invocations are
    /// cancelled cooperatively").
    pub cancel: CancellationToken,
    pub concurrency: Arc<Semaphore>,
}

impl Session {
    fn new(
        id: String,
        outbound: mpsc::Sender<OutboundMessage>,
        parent_cancel: &CancellationToken,
        per_session_concurrency: usize,
    ) -> Arc<Self> {
        let (state_tx, _rx) = watch::channel(SessionState::New);
        Arc::new(Self {
            id,
            state: Mutex::new(SessionState::New),
            state_tx,
            protocol_version: Mutex::new(None),
            client_info: Mutex::new(None),
            auth_token_ref: Mutex::new(None),
            created_at: Utc::now(),
            last_seen_unix: AtomicI64::new(Utc::now().timestamp()),
            outbound,
            cancel_tokens: DashMap::new(),
            cancel: parent_cancel.child_token(),
            concurrency: Arc::new(Semaphore::new(per_session_concurrency.max(1))),
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn touch(&self) {
        self.last_seen_unix.store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn idle_for(&self) -> Duration {
        let last = self.last_seen_unix.load(Ordering::Relaxed);
        let now = Utc::now().timestamp();
        Duration::from_secs((now - last).max(0) as u64)
    }

    /// Move the session forward in the FSM. No-op (with a warning) on an
    /// attempted backward transition other than into `Closed` (I2).
    pub fn transition(&self, next: SessionState) {
        let mut state = self.state.lock();
        let allowed = matches!(
            (*state, next),
            (SessionState::New, SessionState::Initializing)
                | (SessionState::Initializing, SessionState::Ready)
                | (SessionState::Ready, SessionState::Ready)
                | (SessionState::New, SessionState::Closing)
                | (SessionState::Initializing, SessionState::Closing)
                | (SessionState::Ready, SessionState::Closing)
                | (_, SessionState::Closed)
        );
        if !allowed {
            warn!(session = %self.id, from = ?*state, to = ?next, "ignoring invalid FSM transition");
            return;
        }
        debug!(session = %self.id, from = ?*state, to = ?next, "session transition");
        *state = next;
        let _ = self.state_tx.send(next);
    }

    /// Block the caller (a buffered non-initialize request arriving while
    /// the session is still `Initializing`) until the session reaches
    /// `Ready` or terminates. Returns `false` if the session closed first.
    pub async fn await_ready(&self) -> bool {
        if self.state() == SessionState::Ready {
            return true;
        }
        let mut rx = self.state_tx.subscribe();
        loop {
            match *rx.borrow() {
                SessionState::Ready => return true,
                SessionState::Closing | SessionState::Closed => return false,
                _ => {}
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    }

    /// Register a cancellation token for an in-flight request, keyed by the
    /// JSON-RPC `id`. The token is a child of the session's own so that a
    /// session-wide close also cancels every pending request (I5).
    pub fn begin_request(&self, id: &Value) -> CancellationToken {
        let token = self.cancel.child_token();
        self.cancel_tokens.insert(id_key(id), token.clone());
        token
    }

    pub fn end_request(&self, id: &Value) {
        self.cancel_tokens.remove(&id_key(id));
    }

    /// Fire the cancel signal for a specific in-flight request, per
    /// `$/cancelRequest` (spec §4.3, §4.4, S4). No-op if the id is unknown
    /// (already completed, or never existed).
    pub fn cancel_request(&self, id: &Value) {
        if let Some(entry) = self.cancel_tokens.get(&id_key(id)) {
            entry.cancel();
        }
    }

    /// Enqueue an outbound frame. Ordering within a session is preserved
    /// because `mpsc::Sender` is FIFO and there is exactly one receiver
    /// (the transport's write loop) — spec §5(a).
    pub async fn send(&self, message: Value) {
        let _ = self.outbound.send(OutboundMessage::Frame(message)).await;
    }

    pub async fn close(&self) {
        self.transition(SessionState::Closing);
        self.cancel.cancel();
        let _ = self.outbound.send(OutboundMessage::Close).await;
    }
}

fn id_key(id: &Value) -> String {
    serde_json::to_string(id).unwrap_or_default()
}

/// Owns the session map. Mutated by transports under the map's own
/// concurrency control (a sharded `DashMap`, avoiding the single coarse
/// lock spec §5 describes as the simplest correct implementation); each
/// `Session` then uses its own internal lock for state transitions.
pub struct SessionManager {
    sessions: DashMap<String, Arc<Session>>,
    shutdown: CancellationToken,
    idle_timeout: Duration,
    per_session_concurrency: usize,
}

impl SessionManager {
    pub fn new(shutdown: CancellationToken, idle_timeout: Duration, per_session_concurrency: usize) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            shutdown,
            idle_timeout,
            per_session_concurrency,
        })
    }

    pub fn create(&self, id: String, outbound: mpsc::Sender<OutboundMessage>) -> Arc<Session> {
        let session = Session::new(id.clone(), outbound, &self.shutdown, self.per_session_concurrency);
        self.sessions.insert(id.clone(), session.clone());
        info!(session = %id, "session created");
        session
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|e| e.clone())
    }

    pub async fn remove(&self, id: &str) {
        if let Some((_, session)) = self.sessions.remove(id) {
            session.close().await;
            info!(session = %id, "session removed");
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Background sweep: close any session idle for longer than
    /// `idle_timeout` (spec §4.4). Intended to run on a `tokio::time::interval`
    /// owned by the entrypoint.
    pub async fn sweep_idle(&self) {
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| e.idle_for() >= self.idle_timeout)
            .map(|e| e.key().clone())
            .collect();
        for id in stale {
            warn!(session = %id, "session idle timeout, closing");
            self.remove(&id).await;
        }
    }

    /// Fire the shutdown token, which cascades to every session's own
    /// token, then wait up to `grace` for pending work to observe it.
    pub async fn shutdown_all(&self, grace: Duration) {
        self.shutdown.cancel();
        tokio::time::sleep(grace).await;
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.remove(&id).await;
        }
    }
}
