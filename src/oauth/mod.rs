/// OAuth Provider (C7)
///
/// Enough of OAuth 2.1 + PKCE + Dynamic Client Registration to satisfy a
/// hosted LLM's connector flow (spec §4.7). OAuth requests bypass the
/// dispatcher/session manager entirely and are served directly here, as
/// plain `actix-web` handlers against process-lifetime in-memory state.
pub mod authorize;
pub mod dcr;
pub mod discovery;
pub mod pkce;
pub mod rate_limit;
pub mod start_auth;
pub mod store;
pub mod token;
pub mod userinfo;

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use tracing::info;

use crate::core::config::Config;
use rate_limit::TokenBucket;
use store::OAuthStore;

pub struct OAuthProvider {
    pub store: OAuthStore,
    pub public_url: String,
    pub skip_oauth: bool,
    pub auto_approve_clients: Vec<String>,
    pub vendor_mount_prefix: String,
    pub token_rate_limiter: TokenBucket,
}

impl OAuthProvider {
    pub fn new(config: &Config) -> Arc<Self> {
        Arc::new(Self {
            store: OAuthStore::new(config.oauth_client_store_path.clone()),
            public_url: config.public_url.clone(),
            skip_oauth: config.skip_oauth,
            auto_approve_clients: config.auto_approve_clients.clone(),
            vendor_mount_prefix: config.vendor_mount_prefix.clone(),
            token_rate_limiter: TokenBucket::new(10.0, 1.0),
        })
    }

    /// Gate used by `/oauth/authorize`: skip the consent page when the
    /// registered `client_id` or `redirect_uri` matches a configured
    /// allow-list of hosted LLM domains (spec §4.7 "Auto-approval
    /// shortcut"). The decision is logged either way; the full code/PKCE/
    /// token/refresh flow still executes regardless (spec §9: "a policy,
    /// not a bypass").
    pub fn is_auto_approved(&self, client_id: &str, redirect_uri: &str) -> bool {
        self.auto_approve_clients
            .iter()
            .any(|pattern| client_id == pattern || redirect_uri.starts_with(pattern.as_str()))
    }

    /// Background sweep of expired codes/tokens, run on a
    /// `tokio::time::interval` owned by the entrypoint's lifetime.
    pub async fn run_sweeper(self: Arc<Self>, shutdown: tokio_util::sync::CancellationToken) {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            tokio::select! {
                _ = ticker.tick() => self.store.sweep_expired(),
                _ = shutdown.cancelled() => {
                    info!("oauth sweeper shutting down");
                    break;
                }
            }
        }
    }
}

/// Mount every OAuth endpoint named in spec §4.7, plus the vendor
/// start-auth shortcut, under the given scope configurator.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/.well-known/oauth-authorization-server",
        web::get().to(discovery::authorization_server_metadata),
    )
    .route(
        "/.well-known/oauth-protected-resource",
        web::get().to(discovery::protected_resource_metadata),
    )
    .route("/oauth/register", web::post().to(dcr::register))
    .route("/oauth/authorize", web::get().to(authorize::authorize))
    .route("/oauth/authorize", web::post().to(authorize::approve_consent))
    .route("/oauth/token", web::post().to(token::token))
    .route("/oauth/userinfo", web::get().to(userinfo::userinfo))
    .route(
        "/api/organizations/{org_id}/mcp/start-auth/{auth_id}",
        web::get().to(start_auth::start_auth),
    );
}
