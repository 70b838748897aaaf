/// In-memory OAuth state: registered clients, authorization codes, and
/// access/refresh tokens (spec §3, §5). Each map is a `DashMap` mutated
/// under its own per-map concurrency control; expired codes and tokens are
/// swept on a timer owned by [`super::OAuthProvider`].
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const AUTH_CODE_TTL: Duration = Duration::from_secs(10 * 60);
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub client_name: String,
    pub redirect_uris: HashSet<String>,
    pub grant_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub software_id: Option<String>,
    pub created_at: u64,
}

#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub expires_at: u64,
    pub consumed: bool,
}

impl AuthorizationCode {
    pub fn is_expired(&self) -> bool {
        now() >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    pub scope: String,
    pub issued_at: u64,
    pub expires_at: u64,
    pub refresh_token: String,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        now() >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct RefreshTokenEntry {
    pub refresh_token: String,
    pub client_id: String,
    pub scope: String,
    pub access_token: String,
    pub expires_at: u64,
}

/// Process-lifetime OAuth state. `clients` is optionally written through to
/// `oauth_clients.json` atomically (rewrite to a temp file then rename) per
/// spec §6 — never required for correctness, purely an operability nicety
/// for environments that restart the process often during development.
pub struct OAuthStore {
    pub clients: DashMap<String, OAuthClient>,
    pub codes: DashMap<String, AuthorizationCode>,
    pub access_tokens: DashMap<String, AccessToken>,
    pub refresh_tokens: DashMap<String, RefreshTokenEntry>,
    client_store_path: Option<String>,
}

impl OAuthStore {
    pub fn new(client_store_path: Option<String>) -> Self {
        let clients = DashMap::new();
        if let Some(path) = &client_store_path {
            load_clients_from_disk(path, &clients);
        }
        Self {
            clients,
            codes: DashMap::new(),
            access_tokens: DashMap::new(),
            refresh_tokens: DashMap::new(),
            client_store_path,
        }
    }

    /// DCR idempotence: repeated registration with the same
    /// `(client_name, redirect_uris)` under a supplied `software_id`
    /// returns the existing `client_id` rather than minting a new one
    /// (spec §8).
    pub fn find_existing_registration(
        &self,
        client_name: &str,
        redirect_uris: &HashSet<String>,
        software_id: &str,
    ) -> Option<OAuthClient> {
        self.clients.iter().find_map(|entry| {
            let client = entry.value();
            if client.client_name == client_name
                && &client.redirect_uris == redirect_uris
                && client.software_id.as_deref() == Some(software_id)
            {
                Some(client.clone())
            } else {
                None
            }
        })
    }

    pub fn insert_client(&self, client: OAuthClient) {
        self.clients.insert(client.client_id.clone(), client);
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.client_store_path else { return };
        let snapshot: Vec<OAuthClient> = self.clients.iter().map(|e| e.value().clone()).collect();
        let Ok(json) = serde_json::to_string_pretty(&snapshot) else { return };
        let tmp_path = format!("{path}.tmp");
        if std::fs::write(&tmp_path, json).and_then(|_| std::fs::rename(&tmp_path, path)).is_err() {
            warn!(path, "failed to persist oauth client store");
        }
    }

    pub fn new_auth_code(
        &self,
        client_id: String,
        redirect_uri: String,
        scope: String,
        code_challenge: String,
        code_challenge_method: String,
    ) -> AuthorizationCode {
        let code = crate::oauth::pkce::random_token(32);
        let record = AuthorizationCode {
            code: code.clone(),
            client_id,
            redirect_uri,
            scope,
            code_challenge,
            code_challenge_method,
            expires_at: now() + AUTH_CODE_TTL.as_secs(),
            consumed: false,
        };
        self.codes.insert(code, record.clone());
        record
    }

    /// Single-use redemption (I3): the second redemption attempt of the
    /// same code fails, whether because it was already consumed, is
    /// expired, or never existed.
    pub fn consume_auth_code(&self, code: &str) -> Option<AuthorizationCode> {
        let mut entry = self.codes.get_mut(code)?;
        if entry.consumed || entry.is_expired() {
            return None;
        }
        entry.consumed = true;
        Some(entry.clone())
    }

    pub fn issue_token_pair(&self, client_id: String, scope: String) -> AccessToken {
        let access = crate::oauth::pkce::random_token(32);
        let refresh = crate::oauth::pkce::random_token(32);
        let issued_at = now();
        let access_token = AccessToken {
            token: access.clone(),
            client_id: client_id.clone(),
            scope: scope.clone(),
            issued_at,
            expires_at: issued_at + ACCESS_TOKEN_TTL.as_secs(),
            refresh_token: refresh.clone(),
        };
        self.access_tokens.insert(access.clone(), access_token.clone());
        self.refresh_tokens.insert(
            refresh.clone(),
            RefreshTokenEntry {
                refresh_token: refresh,
                client_id,
                scope,
                access_token: access,
                expires_at: issued_at + REFRESH_TOKEN_TTL.as_secs(),
            },
        );
        access_token
    }

    /// Refresh tokens rotate on use: redeeming one invalidates it and
    /// issues a fresh access/refresh pair (spec §4.7).
    pub fn redeem_refresh_token(&self, refresh_token: &str) -> Option<AccessToken> {
        let (_, entry) = self.refresh_tokens.remove(refresh_token)?;
        if now() >= entry.expires_at {
            return None;
        }
        self.access_tokens.remove(&entry.access_token);
        Some(self.issue_token_pair(entry.client_id, entry.scope))
    }

    pub fn lookup_access_token(&self, token: &str) -> Option<AccessToken> {
        let entry = self.access_tokens.get(token)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.clone())
    }

    /// Swept on a timer by [`super::OAuthProvider`]; removes expired codes
    /// and tokens so the maps don't grow unbounded over a long-lived
    /// process (spec §5: "codes and tokens are sweeped on a timer").
    pub fn sweep_expired(&self) {
        let before = self.codes.len() + self.access_tokens.len() + self.refresh_tokens.len();
        self.codes.retain(|_, c| !c.is_expired());
        self.access_tokens.retain(|_, t| !t.is_expired());
        self.refresh_tokens.retain(|_, r| now() < r.expires_at);
        let after = self.codes.len() + self.access_tokens.len() + self.refresh_tokens.len();
        if before != after {
            info!(removed = before - after, "swept expired oauth state");
        }
    }
}

fn load_clients_from_disk(path: &str, clients: &DashMap<String, OAuthClient>) {
    if !Path::new(path).exists() {
        return;
    }
    let Ok(raw) = std::fs::read_to_string(path) else { return };
    let Ok(loaded) = serde_json::from_str::<Vec<OAuthClient>>(&raw) else {
        warn!(path, "failed to parse oauth client store, starting empty");
        return;
    };
    for client in loaded {
        clients.insert(client.client_id.clone(), client);
    }
}
