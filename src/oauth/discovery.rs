/// RFC 8414 / RFC 9728 discovery documents, so hosted LLM clients can find
/// the rest of the flow without any out-of-band configuration (spec §4.7).
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::transport::AppContext;

pub async fn authorization_server_metadata(ctx: web::Data<AppContext>) -> HttpResponse {
    let base = &ctx.oauth.public_url;
    HttpResponse::Ok().json(json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/oauth/authorize"),
        "token_endpoint": format!("{base}/oauth/token"),
        "registration_endpoint": format!("{base}/oauth/register"),
        "userinfo_endpoint": format!("{base}/oauth/userinfo"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "code_challenge_methods_supported": ["S256", "plain"],
        "token_endpoint_auth_methods_supported": ["client_secret_post", "none"],
        "scopes_supported": ["mcp"],
    }))
}

pub async fn protected_resource_metadata(ctx: web::Data<AppContext>) -> HttpResponse {
    let base = &ctx.oauth.public_url;
    HttpResponse::Ok().json(json!({
        "resource": base,
        "authorization_servers": [base],
        "bearer_methods_supported": ["header"],
    }))
}
