/// Dispatcher (C3)
///
/// Validates a parsed [`Envelope`], applies the session FSM gate, and
/// routes to the MCP verb table (spec §4.3). Transport-agnostic: callers
/// pass already-parsed envelopes and receive already-structured responses.
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info_span, Instrument};

use crate::core::config::Config;
use crate::core::error::{codes, ServerError};
use crate::index::{IndexHandle, SearchFilters};
use crate::registry::{Registry, ToolContext};
use crate::rpc::envelope::{Envelope, Response};
use crate::session::{Session, SessionState};

/// Protocol versions this server understands, oldest first. `initialize`
/// echoes whichever the client offered if it is in this set, else the
/// highest (last) entry (spec §6, SPEC_FULL.md Open Question #1).
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26"];

fn negotiate_version(requested: Option<&str>) -> String {
    match requested {
        Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v) => v.to_string(),
        _ => SUPPORTED_PROTOCOL_VERSIONS.last().unwrap().to_string(),
    }
}

/// Dispatch one parsed frame. Returns `None` for notifications (no
/// response is ever sent) and `Some(Response)` for requests. The session
/// object is mutated for FSM transitions, cancel-token bookkeeping, and
/// idle tracking; the registry, index, and config are process-wide shared
/// state this call never mutates.
pub async fn dispatch(
    session: &Arc<Session>,
    registry: &Registry,
    index: &Arc<IndexHandle>,
    config: &Config,
    envelope: Envelope,
) -> Option<Response> {
    session.touch();

    if envelope.jsonrpc != "2.0" {
        let id = envelope.id.clone().unwrap_or(Value::Null);
        return Some(Response::err(id, codes::INVALID_REQUEST, "jsonrpc must be \"2.0\""));
    }

    // FSM gate. In `New`, only `initialize` passes; everything else closes
    // the session (spec §4.4). In `Initializing`, non-initialize requests
    // buffer until the initialize response has flushed.
    match session.state() {
        SessionState::New if envelope.method != "initialize" => {
            session.transition(SessionState::Closed);
            return respond_protocol_violation(&envelope, "session has not been initialized");
        }
        SessionState::Initializing if envelope.method != "initialize" => {
            if !session.await_ready().await {
                return respond_protocol_violation(&envelope, "session closed before becoming ready");
            }
        }
        SessionState::Closing | SessionState::Closed => {
            return respond_protocol_violation(&envelope, "session is closed");
        }
        _ => {}
    }

    let span = info_span!("dispatch", session = %session.id, method = %envelope.method);
    async move {
        match envelope.method.as_str() {
            "initialize" => Some(handle_initialize(session, config, &envelope)),
            "initialized" => {
                debug!("client acknowledged readiness");
                None
            }
            "ping" => envelope.id.clone().map(|id| Response::ok(id, json!({}))),
            "tools/list" => envelope.id.clone().map(|id| Response::ok(id, json!({ "tools": registry.list_tools() }))),
            "prompts/list" => {
                envelope.id.clone().map(|id| Response::ok(id, json!({ "prompts": registry.list_prompts() })))
            }
            "tools/call" => {
                let id = envelope.id.clone()?;
                Some(handle_tools_call(session, registry, index, config, id, envelope.params).await)
            }
            "prompts/get" => {
                let id = envelope.id.clone()?;
                Some(handle_prompts_get(registry, id, envelope.params).await)
            }
            "$/cancelRequest" => {
                if let Some(params) = &envelope.params {
                    if let Some(target) = params.get("id") {
                        session.cancel_request(target);
                    }
                }
                None
            }
            other => {
                envelope.id.clone().map(|id| Response::err(id, codes::METHOD_NOT_FOUND, format!("method not found: {other}")))
            }
        }
    }
    .instrument(span)
    .await
}

fn respond_protocol_violation(envelope: &Envelope, message: &str) -> Option<Response> {
    envelope.id.clone().map(|id| {
        Response::from_server_error(id, &ServerError::ProtocolViolation(message.to_string()))
    })
}

fn handle_initialize(session: &Arc<Session>, config: &Config, envelope: &Envelope) -> Response {
    session.transition(SessionState::Initializing);

    let requested = envelope
        .params
        .as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str());
    let negotiated = negotiate_version(requested);
    *session.protocol_version.lock() = Some(negotiated.clone());

    if let Some(client_info) = envelope.params.as_ref().and_then(|p| p.get("clientInfo")) {
        let name = client_info.get("name").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
        let version = client_info.get("version").and_then(|v| v.as_str()).unwrap_or("0").to_string();
        *session.client_info.lock() = Some(crate::session::manager::ClientInfo { name, version });
    }

    let id = envelope.id.clone().unwrap_or(Value::Null);
    let response = Response::ok(
        id,
        json!({
            "protocolVersion": negotiated,
            "capabilities": {
                "tools": { "listChanged": false },
                "prompts": { "listChanged": false },
            },
            "serverInfo": {
                "name": config.server_name,
                "version": config.server_version,
            }
        }),
    );

    // Per §5(c): "initialize blocks subsequent methods on the same session
    // from completing until its response has been written." The caller
    // (transport) sends this response before any buffered request is
    // processed; we flip to `Ready` here because by the time this function
    // returns, the transport is about to serialize and flush the response.
    session.transition(SessionState::Ready);
    response
}

async fn handle_tools_call(
    session: &Arc<Session>,
    registry: &Registry,
    index: &Arc<IndexHandle>,
    config: &Config,
    id: Value,
    params: Option<Value>,
) -> Response {
    let Some(params) = params else {
        return Response::err(id, codes::INVALID_PARAMS, "missing params for tools/call");
    };
    let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
        return Response::err(id, codes::INVALID_PARAMS, "missing tool name");
    };
    let Some(tool) = registry.get_tool(name) else {
        return Response::err(id, codes::METHOD_NOT_FOUND, format!("unknown tool: {name}"));
    };

    let raw_args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    let args = match sanitize_arguments(&tool.meta.input_schema, raw_args, name) {
        Ok(args) => args,
        Err(message) => return Response::err(id, codes::INVALID_PARAMS, message),
    };

    let _permit = match session.concurrency.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return Response::err(id, codes::INTERNAL_ERROR, "session closing"),
    };

    let cancel = session.begin_request(&id);
    let cx = ToolContext { index: index.clone(), cancel: cancel.clone() };
    let implementation = tool.implementation.clone();
    let args_for_call = args;

    let result = tokio::select! {
        outcome = tokio::time::timeout(config.tool_timeout(), implementation.call(args_for_call, cx)) => {
            match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(err.to_string()),
                Err(_) => Err("tool timed out".to_string()),
            }
        }
        _ = cancel.cancelled() => Err("tool call cancelled".to_string()),
    };

    session.end_request(&id);

    match result {
        Ok(value) => Response::ok(
            id,
            json!({
                "content": [{ "type": "text", "text": render_content(&value) }],
                "isError": false,
            }),
        ),
        Err(message) => Response::ok(
            id,
            json!({
                "content": [{ "type": "text", "text": message }],
                "isError": true,
            }),
        ),
    }
}

fn render_content(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Drop undeclared argument keys rather than rejecting the call (hosted
/// LLM clients inject extras such as a legacy `filter_source` alias);
/// reject only if a field the schema lists under `required` is absent.
fn sanitize_arguments(schema: &Value, args: Value, tool_name: &str) -> Result<Value, String> {
    let Value::Object(mut map) = args else {
        return Err("tool arguments must be a JSON object".to_string());
    };

    let declared: Vec<String> = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default();

    let stripped: Vec<String> = map.keys().filter(|k| !declared.contains(k)).cloned().collect();
    if !stripped.is_empty() {
        debug!(tool = tool_name, ?stripped, "stripped undeclared tool arguments");
        for key in &stripped {
            map.remove(key);
        }
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for field in required {
            let Some(field_name) = field.as_str() else { continue };
            if !map.contains_key(field_name) {
                return Err(format!("missing required parameter: {field_name}"));
            }
        }
    }

    Ok(Value::Object(map))
}

async fn handle_prompts_get(registry: &Registry, id: Value, params: Option<Value>) -> Response {
    let Some(params) = params else {
        return Response::err(id, codes::INVALID_PARAMS, "missing params for prompts/get");
    };
    let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
        return Response::err(id, codes::INVALID_PARAMS, "missing prompt name");
    };
    let Some(prompt) = registry.get_prompt(name) else {
        return Response::err(id, codes::METHOD_NOT_FOUND, format!("unknown prompt: {name}"));
    };

    let mut args = std::collections::HashMap::new();
    if let Some(obj) = params.get("arguments").and_then(|v| v.as_object()) {
        for (k, v) in obj {
            if let Some(s) = v.as_str() {
                args.insert(k.clone(), s.to_string());
            }
        }
    }

    match prompt.implementation.render(args).await {
        Ok(messages) => Response::ok(id, json!({ "messages": messages })),
        Err(err) => Response::err(id, codes::INTERNAL_ERROR, err.to_string()),
    }
}

/// Shared `search` argument extraction for tools built on [`SearchFilters`];
/// not part of the verb table itself, but every search-backed tool needs
/// it, so it lives alongside the dispatcher rather than being duplicated.
pub fn filters_from_args(args: &Value) -> SearchFilters {
    SearchFilters {
        source: args
            .get("filters")
            .and_then(|f| f.get("source"))
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()),
        date_from: args
            .get("filters")
            .and_then(|f| f.get("date_from"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
        date_to: args
            .get("filters")
            .and_then(|f| f.get("date_to"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
    }
}

pub const DEFAULT_K: usize = 10;
pub const MAX_K: usize = 50;

/// Boundary behaviour for `k` (spec §8): `0` is `InvalidParams`; values
/// above 50 are clamped with a warning rather than rejected (the
/// configured-strictness default per §8 is "clamp").
pub fn clamp_k(requested: Option<u64>) -> Result<(usize, bool), String> {
    match requested {
        None => Ok((DEFAULT_K, false)),
        Some(0) => Err("k must be >= 1".to_string()),
        Some(k) if k as usize > MAX_K => Ok((MAX_K, true)),
        Some(k) => Ok((k as usize, false)),
    }
}
