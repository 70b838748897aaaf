/// JSON-RPC 2.0 envelope types shared by both transports.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed JSON-RPC frame before dispatch has decided whether it is a
/// request or a notification. `id.is_none()` distinguishes a notification
/// from a request per spec §3 ("id present for requests, absent for
/// notifications").
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Envelope {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl Response {
    pub fn ok(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    pub fn err(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
        }
    }

    pub fn from_server_error(id: Value, err: &crate::core::error::ServerError) -> Self {
        Self::err(id, err.code(), err.to_string())
    }
}
