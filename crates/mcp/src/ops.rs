//! The Gitea operation descriptor table and its generic executor.
//!
//! Every RPC tool is one row here: argument specs, HTTP verb, path template,
//! and response transform. One executor renders the path, partitions the
//! validated arguments into path/query/body, performs the request, and wraps
//! the outcome in the uniform tool envelope.

use base64::Engine as _;
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::config::ServerConfig;

#[derive(Debug, Clone)]
pub enum ArgType {
    Integer,
    Str,
    StrEnum(&'static [&'static str]),
    StrArray,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgPlace {
    /// Substituted into the path template, URL-encoded.
    Path,
    /// Appended as a query parameter when present.
    Query,
    /// Sent as a JSON body field when present.
    Body,
}

pub struct ArgSpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub required: bool,
    pub place: ArgPlace,
    /// Body field name when the API expects a different key than the
    /// argument name (Gitea's merge API wants `Do`/`MergeCommitMessage`).
    pub body_key: Option<&'static str>,
    /// Value sent when an optional body argument is absent.
    pub default: Option<&'static str>,
    pub description: &'static str,
}

const fn req(name: &'static str, ty: ArgType, place: ArgPlace, description: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        ty,
        required: true,
        place,
        body_key: None,
        default: None,
        description,
    }
}

const fn opt(name: &'static str, ty: ArgType, place: ArgPlace, description: &'static str) -> ArgSpec {
    ArgSpec {
        name,
        ty,
        required: false,
        place,
        body_key: None,
        default: None,
        description,
    }
}

/// How the API response becomes the envelope text.
pub enum ResponseKind {
    /// Pretty-printed JSON of the response.
    Json,
    /// Confirmation phrase, with the pretty JSON appended when the API
    /// returned a body.
    Confirmation(&'static str),
    /// File payload: decode base64 content into plain text when the API
    /// reports that encoding, else return the raw structured payload.
    FileContents,
}

pub struct Operation {
    pub name: &'static str,
    pub description: &'static str,
    pub method: &'static str,
    /// Path template; `{owner}`, `{repo}`, and `{claude_comment_id}` resolve
    /// from config, everything else from the call arguments.
    pub path: &'static str,
    pub args: &'static [ArgSpec],
    pub response: ResponseKind,
    pub error_prefix: &'static str,
    /// Whether a failure also flags the envelope with `isError`.
    pub flags_error: bool,
}

const fn op(
    name: &'static str,
    description: &'static str,
    method: &'static str,
    path: &'static str,
    args: &'static [ArgSpec],
    response: ResponseKind,
    error_prefix: &'static str,
) -> Operation {
    Operation {
        name,
        description,
        method,
        path,
        args,
        response,
        error_prefix,
        flags_error: false,
    }
}

pub static OPERATIONS: &[Operation] = &[
    op(
        "get_issue",
        "Get details of a specific issue",
        "GET",
        "/repos/{owner}/{repo}/issues/{issue_number}",
        &[req(
            "issue_number",
            ArgType::Integer,
            ArgPlace::Path,
            "The issue number to fetch",
        )],
        ResponseKind::Json,
        "Error getting issue",
    ),
    op(
        "get_issue_comments",
        "Get comments for a specific issue",
        "GET",
        "/repos/{owner}/{repo}/issues/{issue_number}/comments",
        &[req(
            "issue_number",
            ArgType::Integer,
            ArgPlace::Path,
            "The issue number to fetch comments for",
        )],
        ResponseKind::Json,
        "Error getting issue comments",
    ),
    op(
        "create_issue_comment",
        "Create a comment on an issue",
        "POST",
        "/repos/{owner}/{repo}/issues/{issue_number}/comments",
        &[
            req(
                "issue_number",
                ArgType::Integer,
                ArgPlace::Path,
                "The issue number to comment on",
            ),
            req("body", ArgType::Str, ArgPlace::Body, "The comment body"),
        ],
        ResponseKind::Confirmation("Comment created successfully"),
        "Error creating issue comment",
    ),
    op(
        "update_issue_comment",
        "Update an existing issue comment",
        "PATCH",
        "/repos/{owner}/{repo}/issues/comments/{comment_id}",
        &[
            req(
                "comment_id",
                ArgType::Integer,
                ArgPlace::Path,
                "The comment ID to update",
            ),
            req("body", ArgType::Str, ArgPlace::Body, "The new comment body"),
        ],
        ResponseKind::Confirmation("Comment updated successfully"),
        "Error updating issue comment",
    ),
    op(
        "delete_issue_comment",
        "Delete an issue comment",
        "DELETE",
        "/repos/{owner}/{repo}/issues/comments/{comment_id}",
        &[req(
            "comment_id",
            ArgType::Integer,
            ArgPlace::Path,
            "The comment ID to delete",
        )],
        ResponseKind::Confirmation("Comment deleted successfully"),
        "Error deleting issue comment",
    ),
    op(
        "list_issues",
        "List issues in the repository",
        "GET",
        "/repos/{owner}/{repo}/issues",
        &[
            opt(
                "state",
                ArgType::StrEnum(&["open", "closed", "all"]),
                ArgPlace::Query,
                "Filter by state (open, closed, all)",
            ),
            opt(
                "labels",
                ArgType::Str,
                ArgPlace::Query,
                "Comma-separated list of label names",
            ),
            opt("page", ArgType::Integer, ArgPlace::Query, "Page number"),
            opt(
                "limit",
                ArgType::Integer,
                ArgPlace::Query,
                "Number of items per page",
            ),
        ],
        ResponseKind::Json,
        "Error listing issues",
    ),
    op(
        "create_issue",
        "Create a new issue in the repository",
        "POST",
        "/repos/{owner}/{repo}/issues",
        &[
            req("title", ArgType::Str, ArgPlace::Body, "The issue title"),
            opt("body", ArgType::Str, ArgPlace::Body, "The issue body"),
            opt(
                "labels",
                ArgType::StrArray,
                ArgPlace::Body,
                "Array of label names to add",
            ),
            opt(
                "assignees",
                ArgType::StrArray,
                ArgPlace::Body,
                "Array of usernames to assign",
            ),
        ],
        ResponseKind::Confirmation("Issue created successfully"),
        "Error creating issue",
    ),
    op(
        "update_issue",
        "Update an existing issue",
        "PATCH",
        "/repos/{owner}/{repo}/issues/{issue_number}",
        &[
            req(
                "issue_number",
                ArgType::Integer,
                ArgPlace::Path,
                "The issue number to update",
            ),
            opt("title", ArgType::Str, ArgPlace::Body, "New title"),
            opt("body", ArgType::Str, ArgPlace::Body, "New body"),
            opt(
                "state",
                ArgType::StrEnum(&["open", "closed"]),
                ArgPlace::Body,
                "New state",
            ),
            opt(
                "labels",
                ArgType::StrArray,
                ArgPlace::Body,
                "New labels (replaces existing)",
            ),
        ],
        ResponseKind::Confirmation("Issue updated successfully"),
        "Error updating issue",
    ),
    op(
        "get_repository",
        "Get repository information",
        "GET",
        "/repos/{owner}/{repo}",
        &[],
        ResponseKind::Json,
        "Error getting repository",
    ),
    op(
        "get_pull_request",
        "Get details of a specific pull request",
        "GET",
        "/repos/{owner}/{repo}/pulls/{pr_number}",
        &[req(
            "pr_number",
            ArgType::Integer,
            ArgPlace::Path,
            "The pull request number to fetch",
        )],
        ResponseKind::Json,
        "Error getting pull request",
    ),
    op(
        "get_pull_request_files",
        "Get files changed in a pull request",
        "GET",
        "/repos/{owner}/{repo}/pulls/{pr_number}/files",
        &[req(
            "pr_number",
            ArgType::Integer,
            ArgPlace::Path,
            "The pull request number to fetch files for",
        )],
        ResponseKind::Json,
        "Error getting pull request files",
    ),
    op(
        "list_pull_requests",
        "List pull requests in the repository",
        "GET",
        "/repos/{owner}/{repo}/pulls",
        &[
            opt(
                "state",
                ArgType::StrEnum(&["open", "closed", "all"]),
                ArgPlace::Query,
                "Filter by state",
            ),
            opt("page", ArgType::Integer, ArgPlace::Query, "Page number"),
            opt(
                "limit",
                ArgType::Integer,
                ArgPlace::Query,
                "Number of items per page",
            ),
        ],
        ResponseKind::Json,
        "Error listing pull requests",
    ),
    op(
        "create_pull_request",
        "Create a new pull request",
        "POST",
        "/repos/{owner}/{repo}/pulls",
        &[
            req("title", ArgType::Str, ArgPlace::Body, "The pull request title"),
            opt("body", ArgType::Str, ArgPlace::Body, "The pull request body"),
            req(
                "head",
                ArgType::Str,
                ArgPlace::Body,
                "The branch containing changes",
            ),
            req("base", ArgType::Str, ArgPlace::Body, "The branch to merge into"),
        ],
        ResponseKind::Confirmation("Pull request created successfully"),
        "Error creating pull request",
    ),
    op(
        "update_pull_request",
        "Update an existing pull request",
        "PATCH",
        "/repos/{owner}/{repo}/pulls/{pr_number}",
        &[
            req(
                "pr_number",
                ArgType::Integer,
                ArgPlace::Path,
                "The pull request number",
            ),
            opt("title", ArgType::Str, ArgPlace::Body, "New title"),
            opt("body", ArgType::Str, ArgPlace::Body, "New body"),
            opt(
                "state",
                ArgType::StrEnum(&["open", "closed"]),
                ArgPlace::Body,
                "New state",
            ),
        ],
        ResponseKind::Confirmation("Pull request updated successfully"),
        "Error updating pull request",
    ),
    op(
        "merge_pull_request",
        "Merge a pull request",
        "POST",
        "/repos/{owner}/{repo}/pulls/{pr_number}/merge",
        &[
            req(
                "pr_number",
                ArgType::Integer,
                ArgPlace::Path,
                "The pull request number to merge",
            ),
            ArgSpec {
                name: "merge_style",
                ty: ArgType::StrEnum(&["merge", "rebase", "squash"]),
                required: false,
                place: ArgPlace::Body,
                body_key: Some("Do"),
                default: Some("merge"),
                description: "Merge method",
            },
            ArgSpec {
                name: "merge_commit_message",
                ty: ArgType::Str,
                required: false,
                place: ArgPlace::Body,
                body_key: Some("MergeCommitMessage"),
                default: None,
                description: "Custom merge commit message",
            },
        ],
        ResponseKind::Confirmation("Pull request merged successfully"),
        "Error merging pull request",
    ),
    op(
        "list_branches",
        "List all branches in the repository",
        "GET",
        "/repos/{owner}/{repo}/branches",
        &[],
        ResponseKind::Json,
        "Error listing branches",
    ),
    op(
        "get_branch",
        "Get details of a specific branch",
        "GET",
        "/repos/{owner}/{repo}/branches/{branch}",
        &[req("branch", ArgType::Str, ArgPlace::Path, "The branch name")],
        ResponseKind::Json,
        "Error getting branch",
    ),
    op(
        "create_branch",
        "Create a new branch in the repository",
        "POST",
        "/repos/{owner}/{repo}/branches",
        &[
            req(
                "new_branch_name",
                ArgType::Str,
                ArgPlace::Body,
                "Name of the new branch to create",
            ),
            req(
                "old_branch_name",
                ArgType::Str,
                ArgPlace::Body,
                "Name of the source branch",
            ),
        ],
        ResponseKind::Confirmation("Branch created successfully"),
        "Error creating branch",
    ),
    op(
        "get_file_contents",
        "Get the contents of a file from the repository",
        "GET",
        "/repos/{owner}/{repo}/contents/{path}",
        &[
            req("path", ArgType::Str, ArgPlace::Path, "The file path to fetch"),
            opt(
                "ref",
                ArgType::Str,
                ArgPlace::Query,
                "The branch or commit ref (optional)",
            ),
        ],
        ResponseKind::FileContents,
        "Error getting file contents",
    ),
    op(
        "delete_file",
        "Delete a file from the repository",
        "DELETE",
        "/repos/{owner}/{repo}/contents/{path}",
        &[
            req("path", ArgType::Str, ArgPlace::Path, "The file path to delete"),
            req("message", ArgType::Str, ArgPlace::Body, "Commit message"),
            req(
                "sha",
                ArgType::Str,
                ArgPlace::Body,
                "SHA of the file being deleted",
            ),
            opt("branch", ArgType::Str, ArgPlace::Body, "Branch to delete from"),
        ],
        ResponseKind::Confirmation("File deleted successfully"),
        "Error deleting file",
    ),
    Operation {
        name: "update_claude_comment",
        description: "Update the Claude comment with progress and results (automatically uses the Claude comment ID)",
        method: "PATCH",
        path: "/repos/{owner}/{repo}/issues/comments/{claude_comment_id}",
        args: &[req(
            "body",
            ArgType::Str,
            ArgPlace::Body,
            "The updated comment content",
        )],
        response: ResponseKind::Confirmation("Claude comment updated successfully"),
        error_prefix: "Error updating Claude comment",
        flags_error: true,
    },
];

pub fn find(name: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| op.name == name)
}

/// JSON schema for the operation's arguments, served via `tools/list`.
pub fn input_schema(operation: &Operation) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for spec in operation.args {
        let mut property = match &spec.ty {
            ArgType::Integer => json!({ "type": "integer" }),
            ArgType::Str => json!({ "type": "string" }),
            ArgType::StrEnum(values) => json!({ "type": "string", "enum": values }),
            ArgType::StrArray => json!({ "type": "array", "items": { "type": "string" } }),
        };
        property["description"] = Value::String(spec.description.to_string());
        properties.insert(spec.name.to_string(), property);
        if spec.required {
            required.push(Value::String(spec.name.to_string()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Check every declared argument before any network call is made.
pub fn validate_args(operation: &Operation, args: &Map<String, Value>) -> Result<(), String> {
    for spec in operation.args {
        match args.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(format!(
                        "missing required argument '{}' for tool '{}'",
                        spec.name, operation.name
                    ));
                }
            }
            Some(value) => check_type(spec, value)?,
        }
    }
    Ok(())
}

fn check_type(spec: &ArgSpec, value: &Value) -> Result<(), String> {
    match &spec.ty {
        ArgType::Integer => {
            if value.is_i64() || value.is_u64() {
                Ok(())
            } else {
                Err(format!("argument '{}' must be an integer", spec.name))
            }
        }
        ArgType::Str => {
            if value.is_string() {
                Ok(())
            } else {
                Err(format!("argument '{}' must be a string", spec.name))
            }
        }
        ArgType::StrEnum(allowed) => match value.as_str() {
            Some(v) if allowed.contains(&v) => Ok(()),
            Some(_) => Err(format!(
                "argument '{}' must be one of: {}",
                spec.name,
                allowed.join(", ")
            )),
            None => Err(format!("argument '{}' must be a string", spec.name)),
        },
        ArgType::StrArray => match value.as_array() {
            Some(items) if items.iter().all(Value::is_string) => Ok(()),
            _ => Err(format!(
                "argument '{}' must be an array of strings",
                spec.name
            )),
        },
    }
}

/// Render the path template and append query parameters.
pub fn render_path(
    operation: &Operation,
    config: &ServerConfig,
    args: &Map<String, Value>,
) -> Result<String, String> {
    let mut path = String::new();
    let mut rest = operation.path;

    while let Some(start) = rest.find('{') {
        path.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| format!("malformed path template for tool '{}'", operation.name))?;
        let name = &after[..end];
        let segment = match name {
            "owner" => config.owner.clone(),
            "repo" => config.repo.clone(),
            "claude_comment_id" => config.claude_comment_id.clone().ok_or_else(|| {
                "CLAUDE_COMMENT_ID environment variable is required".to_string()
            })?,
            arg => path_segment(operation, arg, args)?,
        };
        path.push_str(&segment);
        rest = &after[end + 1..];
    }
    path.push_str(rest);

    let mut query = Vec::new();
    for spec in operation
        .args
        .iter()
        .filter(|s| s.place == ArgPlace::Query)
    {
        if let Some(value) = args.get(spec.name).filter(|v| !v.is_null()) {
            let rendered = match value {
                Value::String(v) => urlencoding::encode(v).into_owned(),
                other => other.to_string(),
            };
            query.push(format!("{}={rendered}", spec.name));
        }
    }
    if !query.is_empty() {
        path.push('?');
        path.push_str(&query.join("&"));
    }

    Ok(path)
}

fn path_segment(
    operation: &Operation,
    name: &str,
    args: &Map<String, Value>,
) -> Result<String, String> {
    let spec = operation
        .args
        .iter()
        .find(|s| s.name == name && s.place == ArgPlace::Path)
        .ok_or_else(|| format!("unknown path parameter '{name}'"))?;
    let value = args.get(spec.name).ok_or_else(|| {
        format!(
            "missing required argument '{}' for tool '{}'",
            spec.name, operation.name
        )
    })?;
    match value {
        Value::String(v) => Ok(urlencoding::encode(v).into_owned()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(format!("argument '{name}' must be a string or integer")),
    }
}

/// Collect body-placed arguments into the request body, applying defaults
/// and body-key mappings. Returns `None` when the operation declares none.
pub fn build_body(operation: &Operation, args: &Map<String, Value>) -> Option<Value> {
    let specs: Vec<&ArgSpec> = operation
        .args
        .iter()
        .filter(|s| s.place == ArgPlace::Body)
        .collect();
    if specs.is_empty() {
        return None;
    }

    let mut body = Map::new();
    for spec in specs {
        let key = spec.body_key.unwrap_or(spec.name);
        match args.get(spec.name).filter(|v| !v.is_null()) {
            Some(value) => {
                body.insert(key.to_string(), value.clone());
            }
            None => {
                if let Some(default) = spec.default {
                    body.insert(key.to_string(), Value::String(default.to_string()));
                }
            }
        }
    }
    Some(Value::Object(body))
}

/// File payload transform: decode base64 content into plain text when the
/// API reports that encoding, else return the raw structured payload.
pub fn file_contents_text(path: &str, response: &Value) -> String {
    let content = response.get("content").and_then(Value::as_str);
    let encoding = response.get("encoding").and_then(Value::as_str);

    if let (Some(content), Some("base64")) = (content, encoding) {
        let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(cleaned.as_bytes()) {
            return format!("File: {path}\n\n{}", String::from_utf8_lossy(&bytes));
        }
    }

    pretty(response)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn gitea_request(
    http: &reqwest::blocking::Client,
    config: &ServerConfig,
    method: &str,
    path: &str,
    body: Option<&Value>,
) -> Result<Value, String> {
    let url = format!("{}{path}", config.api_url);
    debug!(method, url = %url, "Gitea API request");

    let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| e.to_string())?;
    let mut request = http
        .request(method, &url)
        .header("Authorization", format!("token {}", config.token))
        .header("Accept", "application/json");
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().map_err(|e| e.to_string())?;
    let status = response.status();
    let text = response.text().map_err(|e| e.to_string())?;

    if !status.is_success() {
        return Err(format!(
            "Gitea API request failed: {} {text}",
            status.as_u16()
        ));
    }

    if text.is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    }
}

/// Run one validated tool call and wrap the outcome in the tool envelope.
/// API failures become envelope text, never an RPC-level error; only
/// `update_claude_comment` additionally flags the envelope.
pub fn execute(
    operation: &Operation,
    config: &ServerConfig,
    http: &reqwest::blocking::Client,
    args: &Map<String, Value>,
) -> Value {
    match perform(operation, config, http, args) {
        Ok(text) => json!({ "content": [{ "type": "text", "text": text }] }),
        Err(message) => {
            error!(tool = operation.name, error = %message, "Tool call failed");
            let text = format!("{}: {message}", operation.error_prefix);
            if operation.flags_error {
                json!({
                    "content": [{ "type": "text", "text": text }],
                    "error": message,
                    "isError": true,
                })
            } else {
                json!({ "content": [{ "type": "text", "text": text }] })
            }
        }
    }
}

fn perform(
    operation: &Operation,
    config: &ServerConfig,
    http: &reqwest::blocking::Client,
    args: &Map<String, Value>,
) -> Result<String, String> {
    let path = render_path(operation, config, args)?;
    let body = build_body(operation, args);
    let response = gitea_request(http, config, operation.method, &path, body.as_ref())?;

    Ok(match &operation.response {
        ResponseKind::Json => pretty(&response),
        ResponseKind::Confirmation(phrase) => {
            if response.is_null() {
                (*phrase).to_string()
            } else {
                format!("{phrase}: {}", pretty(&response))
            }
        }
        ResponseKind::FileContents => {
            let path_arg = args.get("path").and_then(Value::as_str).unwrap_or_default();
            file_contents_text(path_arg, &response)
        }
    })
}
