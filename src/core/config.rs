/// Server Configuration
///
/// Loads the environment surface described in the spec's `CLI / environment
/// surface` section into one typed, validated struct at startup. Replaces
/// the original template's ad-hoc `HashMap<String, Value>` lookups with a
/// single parse pass; nothing here is re-read after startup (§4.1: no
/// hot-reload).
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_name: String,
    pub server_version: String,
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub public_url: String,
    pub skip_oauth: bool,
    pub allowed_origins: Vec<String>,
    pub auto_approve_clients: Vec<String>,
    pub session_idle_seconds: u64,
    pub per_session_concurrency: usize,
    pub tool_timeout_seconds: u64,
    pub cancel_grace_seconds: u64,
    pub vendor_mount_prefix: String,
    pub oauth_client_store_path: Option<String>,
}

impl Config {
    /// Read every environment variable named in the spec, defaulting the
    /// ones the spec declares optional. Never panics on a missing variable;
    /// only a malformed value for a variable that IS set triggers a fatal
    /// startup error (the caller exits with code 1 per §6's exit codes).
    pub fn from_env() -> Result<Self, String> {
        let server_name = env_or("SERVER_NAME", "strunz-knowledge-mcp");
        let server_version = env_or("SERVER_VERSION", env!("CARGO_PKG_VERSION"));

        let transport = match env_or("TRANSPORT", default_transport()).as_str() {
            "stdio" => Transport::Stdio,
            "http" => Transport::Http,
            other => return Err(format!("invalid TRANSPORT '{other}': must be 'stdio' or 'http'")),
        };

        let host = env_or("HOST", "0.0.0.0");
        let port = env_or("PORT", "8000")
            .parse::<u16>()
            .map_err(|e| format!("invalid PORT: {e}"))?;
        let public_url = env_or("PUBLIC_URL", &format!("http://{host}:{port}"));
        let skip_oauth = parse_bool(&env_or("SKIP_OAUTH", "false"));

        let allowed_origins = split_csv(&env_or("ALLOWED_ORIGINS", ""));
        let auto_approve_clients = split_csv(&env_or("AUTO_APPROVE_CLIENTS", ""));

        let session_idle_seconds = env_or("SESSION_IDLE_SECONDS", "600")
            .parse::<u64>()
            .map_err(|e| format!("invalid SESSION_IDLE_SECONDS: {e}"))?;
        let per_session_concurrency = env_or("PER_SESSION_CONCURRENCY", "8")
            .parse::<usize>()
            .map_err(|e| format!("invalid PER_SESSION_CONCURRENCY: {e}"))?;
        let tool_timeout_seconds = env_or("TOOL_TIMEOUT_SECONDS", "30")
            .parse::<u64>()
            .map_err(|e| format!("invalid TOOL_TIMEOUT_SECONDS: {e}"))?;
        let cancel_grace_seconds = env_or("CANCEL_GRACE_SECONDS", "5")
            .parse::<u64>()
            .map_err(|e| format!("invalid CANCEL_GRACE_SECONDS: {e}"))?;

        let vendor_mount_prefix = env_or("VENDOR_MOUNT_PREFIX", "/api/mcp");
        let oauth_client_store_path = std::env::var("OAUTH_CLIENT_STORE_PATH").ok();

        Ok(Self {
            server_name,
            server_version,
            transport,
            host,
            port,
            public_url,
            skip_oauth,
            allowed_origins,
            auto_approve_clients,
            session_idle_seconds,
            per_session_concurrency,
            tool_timeout_seconds,
            cancel_grace_seconds,
            vendor_mount_prefix,
            oauth_client_store_path,
        })
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_seconds)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_seconds)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_seconds)
    }
}

/// Default transport: `stdio` unless the hosting platform's flag (Railway's
/// `RAILWAY_ENVIRONMENT`, the generic `PORT` presence) suggests an HTTP
/// deployment with no attached TTY. Spec §4.9: "default `stdio` when no TTY
/// is detected in a hosted environment flag, else `http`" — the flag is
/// `RAILWAY_ENVIRONMENT` here, since that is the hosting platform named in
/// §4.8's `/railway-health` endpoint.
fn default_transport() -> &'static str {
    if std::env::var("RAILWAY_ENVIRONMENT").is_ok() {
        "http"
    } else {
        "stdio"
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
