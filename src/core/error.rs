/// Error Taxonomy
///
/// Closed set of error kinds produced anywhere in the server. Transport- and
/// envelope-level variants map onto JSON-RPC 2.0 error codes; tool-level
/// failures never reach this type because the dispatcher downgrades them to
/// in-band `isError` tool results instead.
use serde_json::Value;
use thiserror::Error;

/// JSON-RPC 2.0 reserved/standard error codes, plus the server-defined range
/// used by this implementation.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const INDEX_UNAVAILABLE: i32 = -32001;
    pub const UNAUTHORIZED: i32 = -32002;
    pub const RATE_LIMITED: i32 = -32003;
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("knowledge index unavailable")]
    IndexUnavailable,

    #[error("rate limited")]
    RateLimited,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// The JSON-RPC error code this variant corresponds to. Tool-level
    /// errors never construct a `ServerError`, so there is no variant for
    /// them here (they are reported as `isError: true` tool results).
    pub fn code(&self) -> i32 {
        match self {
            ServerError::Parse(_) => codes::PARSE_ERROR,
            ServerError::InvalidRequest(_) => codes::INVALID_REQUEST,
            ServerError::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            ServerError::InvalidParams(_) => codes::INVALID_PARAMS,
            ServerError::Unauthorized(_) => codes::UNAUTHORIZED,
            ServerError::IndexUnavailable => codes::INDEX_UNAVAILABLE,
            ServerError::RateLimited => codes::RATE_LIMITED,
            ServerError::ProtocolViolation(_) => codes::UNAUTHORIZED,
            ServerError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Render as a JSON-RPC error object. Never includes paths, tokens, or
    /// stack traces — only the message text carried on the variant.
    pub fn to_jsonrpc(&self) -> Value {
        serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}

impl actix_web::ResponseError for ServerError {
    fn error_response(&self) -> actix_web::HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ServerError::Unauthorized(_) | ServerError::ProtocolViolation(_) => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidParams(_) | ServerError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::MethodNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ServerError::IndexUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut builder = actix_web::HttpResponse::build(status);
        if matches!(self, ServerError::Unauthorized(_)) {
            builder.insert_header(("WWW-Authenticate", "Bearer"));
        }
        builder.json(serde_json::json!({ "error": self.to_string() }))
    }
}
