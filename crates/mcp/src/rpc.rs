//! Newline-delimited JSON-RPC 2.0 framing for the stdio transport.

use serde_json::{Value, json};

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const ERROR_PARSE: i64 = -32700;
pub const ERROR_INVALID_REQUEST: i64 = -32600;
pub const ERROR_METHOD_NOT_FOUND: i64 = -32601;
pub const ERROR_INVALID_PARAMS: i64 = -32602;

/// A parsed request frame.
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    pub id: Value,
    pub method: String,
    pub params: serde_json::Map<String, Value>,
}

/// A dispatch failure carrying the frame to answer with.
#[derive(Debug, Clone)]
pub struct DispatchError {
    pub id: Value,
    pub code: i64,
    pub message: String,
}

impl DispatchError {
    pub fn new(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            code,
            message: message.into(),
        }
    }
}

/// Parse a request frame. Returns `Ok(None)` for notifications (frames
/// without an `id`), which get no response.
pub fn parse_request(value: &Value) -> Result<Option<JsonRpcRequest>, DispatchError> {
    let Some(object) = value.as_object() else {
        return Err(DispatchError::new(
            Value::Null,
            ERROR_INVALID_REQUEST,
            "jsonrpc request must be an object",
        ));
    };

    let jsonrpc = object
        .get("jsonrpc")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if jsonrpc != JSONRPC_VERSION {
        return Err(DispatchError::new(
            object.get("id").cloned().unwrap_or(Value::Null),
            ERROR_INVALID_REQUEST,
            format!("jsonrpc must be '{JSONRPC_VERSION}'"),
        ));
    }

    let Some(id) = object.get("id").cloned() else {
        return Ok(None);
    };

    let method = object
        .get("method")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            DispatchError::new(
                id.clone(),
                ERROR_INVALID_REQUEST,
                "jsonrpc request must include non-empty method",
            )
        })?;

    let params = match object.get("params") {
        Some(Value::Object(params)) => params.clone(),
        Some(_) => {
            return Err(DispatchError::new(
                id,
                ERROR_INVALID_PARAMS,
                "jsonrpc request params must be an object",
            ));
        }
        None => serde_json::Map::new(),
    };

    Ok(Some(JsonRpcRequest {
        id,
        method: method.to_string(),
        params,
    }))
}

pub fn result_frame(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

pub fn error_frame(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": {
            "code": code,
            "message": message.into(),
        },
    })
}
