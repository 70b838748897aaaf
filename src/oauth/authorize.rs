/// Authorization endpoint: validates the request, then either renders a
/// consent page or takes the auto-approval shortcut for allow-listed
/// clients (spec §4.7).
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use url::Url;

use crate::transport::AppContext;

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub state: Option<String>,
    pub code_challenge: String,
    #[serde(default = "default_challenge_method")]
    pub code_challenge_method: String,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_challenge_method() -> String {
    "S256".to_string()
}

fn validate_redirect(ctx: &AppContext, client_id: &str, redirect_uri: &str) -> Result<(), HttpResponse> {
    let Some(client) = ctx.oauth.store.clients.get(client_id) else {
        return Err(HttpResponse::BadRequest().body("unknown client_id"));
    };
    if !client.redirect_uris.contains(redirect_uri) {
        return Err(HttpResponse::BadRequest().body("redirect_uri not registered for this client"));
    }
    Ok(())
}

fn build_redirect(redirect_uri: &str, code: &str, state: Option<&str>) -> String {
    let mut url = Url::parse(redirect_uri).unwrap_or_else(|_| Url::parse("http://invalid/").unwrap());
    url.query_pairs_mut().append_pair("code", code);
    if let Some(state) = state {
        url.query_pairs_mut().append_pair("state", state);
    }
    url.to_string()
}

pub async fn authorize(ctx: web::Data<AppContext>, query: web::Query<AuthorizeQuery>) -> HttpResponse {
    let q = query.into_inner();
    if q.response_type != "code" {
        return HttpResponse::BadRequest().body("unsupported response_type");
    }
    if let Err(resp) = validate_redirect(&ctx, &q.client_id, &q.redirect_uri) {
        return resp;
    }

    if ctx.oauth.is_auto_approved(&q.client_id, &q.redirect_uri) {
        let code = ctx.oauth.store.new_auth_code(
            q.client_id.clone(),
            q.redirect_uri.clone(),
            q.scope.clone().unwrap_or_else(|| "mcp".to_string()),
            q.code_challenge.clone(),
            q.code_challenge_method.clone(),
        );
        let location = build_redirect(&q.redirect_uri, &code.code, q.state.as_deref());
        return HttpResponse::Found().append_header(("Location", location)).finish();
    }

    let html = format!(
        r#"<!doctype html><html><body>
<h1>Authorize access</h1>
<p>Client <code>{client_id}</code> is requesting access.</p>
<form method="post" action="/oauth/authorize">
<input type="hidden" name="client_id" value="{client_id}">
<input type="hidden" name="redirect_uri" value="{redirect_uri}">
<input type="hidden" name="state" value="{state}">
<input type="hidden" name="code_challenge" value="{code_challenge}">
<input type="hidden" name="code_challenge_method" value="{code_challenge_method}">
<input type="hidden" name="scope" value="{scope}">
<button type="submit">Approve</button>
</form>
</body></html>"#,
        client_id = q.client_id,
        redirect_uri = q.redirect_uri,
        state = q.state.clone().unwrap_or_default(),
        code_challenge = q.code_challenge,
        code_challenge_method = q.code_challenge_method,
        scope = q.scope.clone().unwrap_or_else(|| "mcp".to_string()),
    );
    HttpResponse::Ok().content_type("text/html").body(html)
}

pub async fn approve_consent(
    ctx: web::Data<AppContext>,
    form: web::Form<AuthorizeQuery>,
) -> HttpResponse {
    let q = form.into_inner();
    if let Err(resp) = validate_redirect(&ctx, &q.client_id, &q.redirect_uri) {
        return resp;
    }
    let code = ctx.oauth.store.new_auth_code(
        q.client_id.clone(),
        q.redirect_uri.clone(),
        q.scope.unwrap_or_else(|| "mcp".to_string()),
        q.code_challenge,
        q.code_challenge_method,
    );
    let location = build_redirect(&q.redirect_uri, &code.code, q.state.as_deref());
    HttpResponse::Found().append_header(("Location", location)).finish()
}
