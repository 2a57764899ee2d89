//! The stdio serve loop and method dispatch.

use std::io::{BufRead, Write};

use serde_json::{Map, Value, json};
use tracing::info;

use crate::config::ServerConfig;
use crate::ops;
use crate::rpc::{
    self, DispatchError, JsonRpcRequest, error_frame, parse_request, result_frame,
};

/// State shared by every call: the immutable startup config and one HTTP
/// client. Calls are handled one at a time; nothing else is shared.
pub struct ServerState {
    pub config: ServerConfig,
    pub http: reqwest::blocking::Client,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            http: reqwest::blocking::Client::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServeReport {
    pub processed_frames: usize,
    pub error_count: usize,
}

/// Serve newline-delimited JSON-RPC until the reader closes. Notifications
/// (frames without an id) are consumed without a response.
pub fn serve<R, W>(reader: &mut R, writer: &mut W, state: &ServerState) -> std::io::Result<ServeReport>
where
    R: BufRead,
    W: Write,
{
    let mut processed_frames = 0usize;
    let mut error_count = 0usize;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        processed_frames += 1;

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(frame) => match parse_request(&frame) {
                Ok(Some(request)) => match dispatch(&request, state) {
                    Ok(result) => result_frame(request.id, result),
                    Err(e) => {
                        error_count += 1;
                        error_frame(e.id, e.code, e.message)
                    }
                },
                Ok(None) => continue,
                Err(e) => {
                    error_count += 1;
                    error_frame(e.id, e.code, e.message)
                }
            },
            Err(e) => {
                error_count += 1;
                error_frame(
                    Value::Null,
                    rpc::ERROR_PARSE,
                    format!("failed to parse frame: {e}"),
                )
            }
        };

        writeln!(writer, "{response}")?;
        writer.flush()?;
    }

    Ok(ServeReport {
        processed_frames,
        error_count,
    })
}

fn dispatch(request: &JsonRpcRequest, state: &ServerState) -> Result<Value, DispatchError> {
    match request.method.as_str() {
        "initialize" => Ok(handle_initialize()),
        "tools/list" => Ok(handle_tools_list()),
        "tools/call" => handle_tools_call(request, state),
        other => Err(DispatchError::new(
            request.id.clone(),
            rpc::ERROR_METHOD_NOT_FOUND,
            format!("unsupported method '{other}'"),
        )),
    }
}

fn handle_initialize() -> Value {
    json!({
        "protocolVersion": rpc::PROTOCOL_VERSION,
        "serverInfo": {
            "name": "Gitea API Operations Server",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": {
                "listChanged": false,
            },
        },
    })
}

fn handle_tools_list() -> Value {
    json!({
        "tools": ops::OPERATIONS
            .iter()
            .map(|operation| {
                json!({
                    "name": operation.name,
                    "description": operation.description,
                    "inputSchema": ops::input_schema(operation),
                })
            })
            .collect::<Vec<_>>(),
    })
}

fn handle_tools_call(
    request: &JsonRpcRequest,
    state: &ServerState,
) -> Result<Value, DispatchError> {
    let invalid = |message: String| {
        DispatchError::new(request.id.clone(), rpc::ERROR_INVALID_PARAMS, message)
    };

    let name = request
        .params
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid("tools/call requires non-empty field 'name'".into()))?;

    let arguments = match request.params.get("arguments") {
        Some(Value::Object(arguments)) => arguments.clone(),
        Some(_) => {
            return Err(invalid(
                "tools/call field 'arguments' must be an object when provided".into(),
            ));
        }
        None => Map::new(),
    };

    let operation = ops::find(name).ok_or_else(|| invalid(format!("unknown tool '{name}'")))?;
    ops::validate_args(operation, &arguments).map_err(invalid)?;

    info!(tool = operation.name, "Handling tool call");
    Ok(ops::execute(
        operation,
        &state.config,
        &state.http,
        &arguments,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn test_state() -> ServerState {
        ServerState::new(ServerConfig {
            owner: "owner".into(),
            repo: "repo".into(),
            branch: None,
            token: "secret".into(),
            api_url: "https://gitea.example.com/api/v1".into(),
            claude_comment_id: Some("100".into()),
        })
    }

    fn request(id: u64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            id: json!(id),
            method: method.into(),
            params: params.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_initialize_and_tools_list_roundtrip() {
        let input = format!(
            "{}\n{}\n{}\n",
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
        );
        let mut reader = Cursor::new(input.into_bytes());
        let mut output = Vec::new();

        let report = serve(&mut reader, &mut output, &test_state()).unwrap();
        assert_eq!(report.processed_frames, 3);
        assert_eq!(report.error_count, 0);

        let frames: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        // the notification got no response
        assert_eq!(frames.len(), 2);

        assert_eq!(frames[0]["result"]["protocolVersion"], rpc::PROTOCOL_VERSION);
        assert_eq!(
            frames[0]["result"]["serverInfo"]["name"],
            "Gitea API Operations Server"
        );

        let tools = frames[1]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), ops::OPERATIONS.len());
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert!(names.contains(&"get_issue"));
        assert!(names.contains(&"update_claude_comment"));
        assert!(names.contains(&"merge_pull_request"));
    }

    #[test]
    fn test_unknown_method_errors() {
        let err = dispatch(&request(1, "resources/list", json!({})), &test_state()).unwrap_err();
        assert_eq!(err.code, rpc::ERROR_METHOD_NOT_FOUND);
    }

    #[test]
    fn test_tools_call_requires_name() {
        let err = dispatch(&request(1, "tools/call", json!({})), &test_state()).unwrap_err();
        assert_eq!(err.code, rpc::ERROR_INVALID_PARAMS);
        assert!(err.message.contains("'name'"));
    }

    #[test]
    fn test_tools_call_unknown_tool() {
        let err = dispatch(
            &request(1, "tools/call", json!({ "name": "launch_rockets" })),
            &test_state(),
        )
        .unwrap_err();
        assert_eq!(err.code, rpc::ERROR_INVALID_PARAMS);
        assert!(err.message.contains("launch_rockets"));
    }

    #[test]
    fn test_tools_call_validates_arguments_before_network() {
        // an out-of-enumeration value fails fast as invalid params; nothing
        // is sent to the (unreachable) API host
        let err = dispatch(
            &request(
                1,
                "tools/call",
                json!({
                    "name": "merge_pull_request",
                    "arguments": { "pr_number": 1, "merge_style": "fast-forward" },
                }),
            ),
            &test_state(),
        )
        .unwrap_err();
        assert_eq!(err.code, rpc::ERROR_INVALID_PARAMS);
        assert!(err.message.contains("merge_style"));
    }

    #[test]
    fn test_malformed_frame_counts_as_error() {
        let mut reader = Cursor::new(b"this is not json\n".to_vec());
        let mut output = Vec::new();

        let report = serve(&mut reader, &mut output, &test_state()).unwrap();
        assert_eq!(report.error_count, 1);

        let frame: Value = serde_json::from_slice(output.trim_ascii_end()).unwrap();
        assert_eq!(frame["error"]["code"], json!(rpc::ERROR_PARSE));
    }
}
