/// Minimal userinfo endpoint: validates the bearer token and returns a
/// stub subject identity, enough for clients that probe this endpoint as
/// part of their connector handshake (spec §4.7).
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::transport::AppContext;

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get(actix_web::http::header::AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|s| s.to_string())
}

pub async fn userinfo(ctx: web::Data<AppContext>, req: HttpRequest) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::Unauthorized()
            .append_header(("WWW-Authenticate", "Bearer"))
            .finish();
    };
    let Some(access) = ctx.oauth.store.lookup_access_token(&token) else {
        return HttpResponse::Unauthorized()
            .append_header(("WWW-Authenticate", "Bearer error=\"invalid_token\""))
            .finish();
    };
    HttpResponse::Ok().json(json!({
        "sub": access.client_id,
        "scope": access.scope,
    }))
}
