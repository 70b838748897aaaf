/// Health & Readiness (C8)
///
/// `GET /` must respond in under 100 ms and never block on the index
/// warming up. `GET /railway-health` is unconditional liveness for the
/// hosting platform's probe. Both accept HEAD and GET; root also accepts
/// POST (echoing the body) to absorb probes from clients that insist on
/// posting (spec §4.8).
use actix_web::{web, HttpResponse, Responder};

use crate::transport::AppContext;

pub async fn root(ctx: web::Data<AppContext>) -> impl Responder {
    // `status()` only awaits the already-completed `OnceCell` (or triggers
    // the one-shot load the very first time); it never re-runs the load,
    // so this stays fast regardless of warmup state.
    let index_status = ctx.index.status().await;
    let uptime = (chrono::Utc::now() - ctx.started_at).num_seconds().max(0);

    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": ctx.config.server_version,
        "protocol_version": crate::rpc::dispatcher::SUPPORTED_PROTOCOL_VERSIONS.last(),
        "uptime_seconds": uptime,
        "index": {
            "ready": index_status.ready,
            "document_count": index_status.document_count,
        },
        "oauth": {
            "enabled": !ctx.config.skip_oauth,
            "endpoints": [
                "/.well-known/oauth-authorization-server",
                "/.well-known/oauth-protected-resource",
                "/oauth/register",
                "/oauth/authorize",
                "/oauth/token",
                "/oauth/userinfo",
            ],
        },
    }))
}

pub async fn root_echo(body: web::Bytes) -> impl Responder {
    HttpResponse::Ok().content_type("application/octet-stream").body(body)
}

pub async fn railway_health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
