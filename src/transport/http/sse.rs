/// HTTP/SSE Transport (C6)
///
/// Mounts one SSE endpoint and a paired POST endpoint forming the
/// bidirectional MCP channel (spec §4.6). The vendor-specific mount prefix
/// is a plain alias for the same handlers (wire format identical).
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpResponse, Responder};
use bytes::Bytes;
use futures_util::stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval};
use tracing::{info, warn};
use uuid::Uuid;

use crate::rpc::dispatcher;
use crate::rpc::envelope::Envelope;
use crate::session::manager::OutboundMessage;
use crate::session::SessionManager;
use crate::transport::AppContext;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Removes the session from the manager (which in turn fires its
/// cancellation token) when the SSE stream is dropped — covering both a
/// clean end-of-stream and an abrupt client disconnect, since actix drops
/// the response body stream in either case (spec §4.6 "Cancellation").
struct SessionGuard {
    session_id: String,
    sessions: Arc<SessionManager>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let sessions = self.sessions.clone();
        let id = self.session_id.clone();
        tokio::spawn(async move {
            sessions.remove(&id).await;
        });
    }
}

enum SseState {
    Endpoint { session_id: String, rx: mpsc::Receiver<OutboundMessage>, keepalive: Interval, guard: SessionGuard },
    Streaming { rx: mpsc::Receiver<OutboundMessage>, keepalive: Interval, guard: SessionGuard },
}

pub async fn sse_handler(ctx: web::Data<AppContext>) -> impl Responder {
    let session_id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel::<OutboundMessage>(256);
    ctx.sessions.create(session_id.clone(), tx);
    info!(session = %session_id, "SSE stream opened");

    let guard = SessionGuard { session_id: session_id.clone(), sessions: ctx.sessions.clone() };
    let state = SseState::Endpoint { session_id, rx, keepalive: interval(KEEPALIVE_INTERVAL), guard };

    let body = stream::unfold(state, move |state| async move {
        match state {
            SseState::Endpoint { session_id, rx, keepalive, guard } => {
                let data = format!("event: endpoint\ndata: /messages?session_id={session_id}\n\n");
                Some((Ok::<Bytes, actix_web::Error>(Bytes::from(data)), SseState::Streaming { rx, keepalive, guard }))
            }
            SseState::Streaming { mut rx, mut keepalive, guard } => loop {
                tokio::select! {
                    received = rx.recv() => {
                        return match received {
                            Some(OutboundMessage::Frame(value)) => {
                                let data = format!(
                                    "event: message\ndata: {}\n\n",
                                    serde_json::to_string(&value).unwrap_or_default()
                                );
                                Some((Ok(Bytes::from(data)), SseState::Streaming { rx, keepalive, guard }))
                            }
                            Some(OutboundMessage::Close) | None => None,
                        };
                    }
                    _ = keepalive.tick() => {
                        return Some((Ok(Bytes::from_static(b": ping\n\n")), SseState::Streaming { rx, keepalive, guard }));
                    }
                }
            },
        }
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .append_header(("Cache-Control", "no-cache"))
        .append_header(("X-Accel-Buffering", "no"))
        .streaming(body)
}

#[derive(Deserialize)]
pub struct MessagesQuery {
    pub session_id: String,
}

/// The client posts a JSON-RPC frame; the server looks up the session,
/// enqueues it for processing, and returns 202 immediately. Responses are
/// delivered on the SSE stream (spec §4.6).
pub async fn messages_handler(
    ctx: web::Data<AppContext>,
    query: web::Query<MessagesQuery>,
    body: web::Json<serde_json::Value>,
) -> impl Responder {
    let Some(session) = ctx.sessions.get(&query.session_id) else {
        warn!(session = %query.session_id, "POST /messages for unknown session");
        return HttpResponse::NotFound().json(serde_json::json!({ "error": "unknown session_id" }));
    };

    let envelope: Envelope = match serde_json::from_value(body.into_inner()) {
        Ok(envelope) => envelope,
        Err(err) => {
            return HttpResponse::BadRequest().json(serde_json::json!({ "error": format!("invalid JSON-RPC frame: {err}") }));
        }
    };

    let registry = ctx.registry.clone();
    let index = ctx.index.clone();
    let config = ctx.config.clone();
    tokio::spawn(async move {
        if let Some(response) = dispatcher::dispatch(&session, &registry, &index, &config, envelope).await {
            if let Ok(value) = serde_json::to_value(&response) {
                session.send(value).await;
            }
        }
    });

    HttpResponse::Accepted().finish()
}
