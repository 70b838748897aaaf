/// HTTP/SSE Transport (C6) entrypoint: wires the actix-web `App`, mirroring
/// the teacher's `run_server_http` (worker count, compression, security
/// headers, access log) but mounting the MCP SSE/messages routes, OAuth
/// provider routes, health/readiness routes, and the vendor-prefixed alias
/// in place of the teacher's single `/mcp` JSON-RPC handler.
pub mod health;
pub mod sse;

use actix_cors::Cors;
use actix_web::middleware::{Compress, DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::transport::AppContext;

/// Permissive CORS for OAuth discovery/token endpoints and health checks,
/// which must be reachable from arbitrary browser-based clients performing
/// the authorization code flow.
fn permissive_cors() -> Cors {
    Cors::permissive()
}

/// Restrictive CORS for the MCP channel itself: only the configured
/// `ALLOWED_ORIGINS` may open an SSE stream or post messages (spec §4.6).
/// With no configured origins, only same-origin / non-browser clients (no
/// `Origin` header) are allowed.
fn mcp_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default().allowed_methods(vec!["GET", "POST"]).allow_any_header();
    for origin in allowed_origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}

pub async fn run(ctx: AppContext) -> std::io::Result<()> {
    let host = ctx.config.host.clone();
    let port = ctx.config.port;
    let allowed_origins = ctx.config.allowed_origins.clone();
    let workers = num_cpus::get().clamp(1, 16);

    info!(%host, port, workers, "MCP server starting (http transport)");

    HttpServer::new(move || {
        let data = web::Data::new(ctx.clone());
        App::new()
            .app_data(data)
            .app_data(web::PayloadConfig::new(2 * 1024 * 1024))
            .wrap(Logger::default())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "no-referrer")),
            )
            .service(
                web::scope("")
                    .wrap(mcp_cors(&allowed_origins))
                    .route("/sse", web::get().to(sse::sse_handler))
                    .route("/messages", web::post().to(sse::messages_handler))
                    .route("/{prefix:.*}/sse", web::get().to(sse::sse_handler))
                    .route("/{prefix:.*}/messages", web::post().to(sse::messages_handler)),
            )
            .service(
                web::scope("")
                    .wrap(permissive_cors())
                    .route("/", web::get().to(health::root))
                    .route("/", web::head().to(health::root))
                    .route("/", web::post().to(health::root_echo))
                    .route("/railway-health", web::get().to(health::railway_health))
                    .configure(crate::oauth::configure),
            )
    })
    .workers(workers)
    .client_request_timeout(std::time::Duration::from_secs(60))
    .bind((host.as_str(), port))?
    .run()
    .await
}
