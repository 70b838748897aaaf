/// Dynamic Client Registration (RFC 7591), spec §4.7.
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;

use crate::transport::AppContext;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    client_name: String,
    redirect_uris: Vec<String>,
    #[serde(default)]
    grant_types: Vec<String>,
    #[serde(default = "default_auth_method")]
    token_endpoint_auth_method: String,
    #[serde(default)]
    software_id: Option<String>,
}

fn default_auth_method() -> String {
    "none".to_string()
}

pub async fn register(ctx: web::Data<AppContext>, body: web::Json<RegisterRequest>) -> HttpResponse {
    let req = body.into_inner();
    if req.redirect_uris.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "invalid_client_metadata",
            "error_description": "redirect_uris must not be empty",
        }));
    }
    let redirect_uris: HashSet<String> = req.redirect_uris.into_iter().collect();

    // DCR idempotence: repeated registration from the same software
    // identity with the same name/redirects returns the prior client_id
    // rather than minting a duplicate (spec §8).
    if let Some(software_id) = &req.software_id {
        if let Some(existing) =
            ctx.oauth.store.find_existing_registration(&req.client_name, &redirect_uris, software_id)
        {
            return HttpResponse::Ok().json(json!({
                "client_id": existing.client_id,
                "client_secret": existing.client_secret,
                "client_name": existing.client_name,
                "redirect_uris": existing.redirect_uris,
                "grant_types": existing.grant_types,
                "token_endpoint_auth_method": existing.token_endpoint_auth_method,
            }));
        }
    }

    let client_id = uuid::Uuid::new_v4().to_string();
    let client_secret = if req.token_endpoint_auth_method == "none" {
        None
    } else {
        Some(super::pkce::random_token(24))
    };
    let grant_types = if req.grant_types.is_empty() {
        vec!["authorization_code".to_string(), "refresh_token".to_string()]
    } else {
        req.grant_types
    };

    let client = super::store::OAuthClient {
        client_id: client_id.clone(),
        client_secret: client_secret.clone(),
        client_name: req.client_name.clone(),
        redirect_uris: redirect_uris.clone(),
        grant_types: grant_types.clone(),
        token_endpoint_auth_method: req.token_endpoint_auth_method.clone(),
        software_id: req.software_id,
        created_at: chrono::Utc::now().timestamp() as u64,
    };
    ctx.oauth.store.insert_client(client);

    HttpResponse::Created().json(json!({
        "client_id": client_id,
        "client_secret": client_secret,
        "client_name": req.client_name,
        "redirect_uris": redirect_uris,
        "grant_types": grant_types,
        "token_endpoint_auth_method": req.token_endpoint_auth_method,
    }))
}
