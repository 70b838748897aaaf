/// Token endpoint: exchanges an authorization code (with PKCE verifier) or
/// a refresh token for an access token (spec §4.7). Rate limited per
/// client_id via a token bucket since this endpoint is reachable
/// pre-authentication.
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::transport::AppContext;

// `serde_urlencoded` (what actix's `web::Form` uses) can't deserialize an
// internally-tagged enum, so the grant is dispatched on manually instead.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    grant_type: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    code_verifier: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn error_response(status: actix_web::http::StatusCode, error: &str, description: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": error, "error_description": description }))
}

pub async fn token(
    ctx: web::Data<AppContext>,
    req: HttpRequest,
    form: web::Form<TokenRequest>,
) -> HttpResponse {
    let client_key = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    if !ctx.oauth.token_rate_limiter.try_acquire(&client_key) {
        return error_response(
            actix_web::http::StatusCode::TOO_MANY_REQUESTS,
            "slow_down",
            "too many token requests, retry later",
        );
    }

    let req = form.into_inner();
    match req.grant_type.as_str() {
        "authorization_code" => {
            let (Some(code), Some(redirect_uri), Some(client_id), Some(code_verifier)) =
                (req.code, req.redirect_uri, req.client_id, req.code_verifier)
            else {
                return error_response(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "invalid_request",
                    "code, redirect_uri, client_id, and code_verifier are required",
                );
            };
            let Some(record) = ctx.oauth.store.consume_auth_code(&code) else {
                return error_response(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "invalid_grant",
                    "authorization code is invalid, expired, or already used",
                );
            };
            if record.client_id != client_id || record.redirect_uri != redirect_uri {
                return error_response(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "invalid_grant",
                    "client_id or redirect_uri does not match the authorization request",
                );
            }
            if !super::pkce::verify(&record.code_challenge_method, &record.code_challenge, &code_verifier) {
                return error_response(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "invalid_grant",
                    "code_verifier does not match code_challenge",
                );
            }
            let access = ctx.oauth.store.issue_token_pair(client_id, record.scope.clone());
            HttpResponse::Ok().json(json!({
                "access_token": access.token,
                "token_type": "Bearer",
                "expires_in": super::store::ACCESS_TOKEN_TTL.as_secs(),
                "refresh_token": access.refresh_token,
                "scope": record.scope,
            }))
        }
        "refresh_token" => {
            let Some(refresh_token) = req.refresh_token else {
                return error_response(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "invalid_request",
                    "refresh_token is required",
                );
            };
            let Some(access) = ctx.oauth.store.redeem_refresh_token(&refresh_token) else {
                return error_response(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "invalid_grant",
                    "refresh token is invalid or expired",
                );
            };
            HttpResponse::Ok().json(json!({
                "access_token": access.token,
                "token_type": "Bearer",
                "expires_in": super::store::ACCESS_TOKEN_TTL.as_secs(),
                "refresh_token": access.refresh_token,
                "scope": access.scope,
            }))
        }
        other => error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            &format!("grant_type '{other}' is not supported"),
        ),
    }
}
