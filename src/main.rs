/// MCP Server Entry Point (C9, Transport Selector)
///
/// Builds the component graph in dependency order — index, registry,
/// session manager, OAuth provider — then hands off to whichever transport
/// `Config::transport` selects. Installs signal handling for graceful
/// shutdown and preloads the knowledge index in the background so the
/// first real query is fast.
mod core;
mod index;
mod oauth;
mod prompts;
mod registry;
mod rpc;
mod session;
mod tools;
mod transport;

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::config::{Config, Transport};
use crate::index::IndexHandle;
use crate::oauth::OAuthProvider;
use crate::registry::Registry;
use crate::session::SessionManager;
use crate::transport::AppContext;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fatal startup error: {err}");
            std::process::exit(1);
        }
    };
    let config = Arc::new(config);

    let mut registry = Registry::new();
    tools::register_all(&mut registry);
    prompts::register_all(&mut registry);
    let registry = Arc::new(registry);

    // No real index builder ships with this crate (spec §1: out of scope,
    // external collaborator); the factory always degrades to `NullIndex`
    // unless an on-disk index is ever wired in here.
    let index = IndexHandle::new(Box::new(|| {
        Err("no on-disk knowledge index configured".to_string())
    }));

    let shutdown = CancellationToken::new();
    let sessions = SessionManager::new(shutdown.clone(), config.session_idle(), config.per_session_concurrency);
    let oauth = OAuthProvider::new(&config);

    let ctx = AppContext {
        config: config.clone(),
        registry,
        index: index.clone(),
        sessions: sessions.clone(),
        oauth: oauth.clone(),
        started_at: Utc::now(),
    };

    {
        let index = index.clone();
        tokio::spawn(async move { index.preload().await });
    }
    {
        let sessions = sessions.clone();
        let idle_check = config.session_idle().max(std::time::Duration::from_secs(30));
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(idle_check);
            loop {
                tokio::select! {
                    _ = ticker.tick() => sessions.sweep_idle().await,
                    _ = shutdown.cancelled() => break,
                }
            }
        });
    }
    if config.transport == Transport::Http {
        let oauth = oauth.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { oauth.run_sweeper(shutdown).await });
    }

    // actix-web's `HttpServer` already installs its own ctrl-c/SIGTERM
    // handling and drains workers gracefully on its own; only stdio needs
    // this crate's own signal wiring, since its read loop has no server to
    // hand shutdown to.
    if config.transport == Transport::Stdio {
        tokio::spawn(shutdown_on_signal(shutdown.clone()));
    }

    let run_result = match config.transport {
        Transport::Stdio => transport::stdio::run(ctx).await,
        Transport::Http => transport::http::run(ctx).await,
    };

    let grace = config.cancel_grace();
    sessions.shutdown_all(grace).await;

    if let Err(err) = &run_result {
        error!(error = %err, "server exited with error");
    } else {
        info!("server shut down cleanly");
    }
    run_result
}

/// Waits for either ctrl-c or, on unix, SIGTERM, then fires the shutdown
/// token so every session's cancel token cascades (spec §4.9: "install a
/// signal handler to drain sessions on termination").
async fn shutdown_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received, draining sessions");
    shutdown.cancel();
}
