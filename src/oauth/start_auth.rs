/// Vendor-specific shortcut mounted at
/// `/api/organizations/{org_id}/mcp/start-auth/{auth_id}` (spec §4.7). The
/// hosted LLM platform hits this instead of constructing an
/// `/oauth/authorize` URL itself. Two modes only, both named directly in
/// the spec — when `skip_oauth` is set the server is running unauthenticated
/// and just reports that back; otherwise it redirects into the normal
/// authorize flow with the org/auth id folded into `state`.
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::transport::AppContext;

#[derive(Debug, Deserialize)]
pub struct StartAuthPath {
    pub org_id: String,
    pub auth_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StartAuthQuery {
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

pub async fn start_auth(
    ctx: web::Data<AppContext>,
    path: web::Path<StartAuthPath>,
    query: web::Query<StartAuthQuery>,
) -> HttpResponse {
    let path = path.into_inner();
    if ctx.oauth.skip_oauth {
        return HttpResponse::Ok().json(json!({
            "status": "success",
            "auth_not_required": true,
            "server_url": ctx.oauth.public_url,
        }));
    }

    let redirect_uri = query
        .into_inner()
        .redirect_uri
        .unwrap_or_else(|| format!("{}/oauth/callback", ctx.oauth.public_url));
    let state = format!("{}:{}", path.org_id, path.auth_id);
    let location = format!(
        "{base}/oauth/authorize?response_type=code&client_id={org_id}&redirect_uri={redirect}&state={state}",
        base = ctx.oauth.public_url,
        org_id = path.org_id,
        redirect = urlencoding_escape(&redirect_uri),
        state = urlencoding_escape(&state),
    );
    HttpResponse::Found().append_header(("Location", location)).finish()
}

fn urlencoding_escape(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
