//! Allowed/disallowed tool list construction for the assistant invocation.

use crate::context::EventData;

/// Tools every invocation gets: file ops, local git ops, and the Gitea
/// read/write operations. The two comment-update tools are not listed here;
/// exactly one of them is appended per event kind.
const BASE_ALLOWED_TOOLS: &[&str] = &[
    "Edit",
    "Glob",
    "Grep",
    "LS",
    "Read",
    "Write",
    "mcp__local_git_ops__commit_files",
    "mcp__local_git_ops__delete_files",
    "mcp__local_git_ops__push_branch",
    "mcp__local_git_ops__create_pull_request",
    "mcp__local_git_ops__checkout_branch",
    "mcp__local_git_ops__create_branch",
    "mcp__local_git_ops__git_status",
    "mcp__gitea__get_issue",
    "mcp__gitea__get_issue_comments",
    "mcp__gitea__add_issue_comment",
    "mcp__gitea__delete_issue_comment",
    "mcp__gitea__get_comment",
    "mcp__gitea__list_issues",
    "mcp__gitea__create_issue",
    "mcp__gitea__update_issue",
    "mcp__gitea__get_repository",
    "mcp__gitea__list_pull_requests",
    "mcp__gitea__get_pull_request",
    "mcp__gitea__create_pull_request",
    "mcp__gitea__update_pull_request",
    "mcp__gitea__merge_pull_request",
    "mcp__gitea__update_pull_request_branch",
    "mcp__gitea__check_pull_request_merged",
    "mcp__gitea__set_issue_branch",
    "mcp__gitea__list_branches",
    "mcp__gitea__get_branch",
    "mcp__gitea__delete_file",
];

/// Tools withheld unless the user explicitly allows them.
const DISALLOWED_TOOLS: &[&str] = &["WebSearch", "WebFetch"];

/// The comma-joined allowed list: base set, the event's comment-update tool,
/// then any custom tools verbatim.
pub fn build_allowed_tools_string(event_data: &EventData, custom_allowed: Option<&str>) -> String {
    let mut tools: Vec<&str> = BASE_ALLOWED_TOOLS.to_vec();
    tools.push(event_data.comment_tool());

    let mut all = tools.join(",");
    if let Some(custom) = custom_allowed.filter(|c| !c.is_empty()) {
        all.push(',');
        all.push_str(custom);
    }
    all
}

/// The comma-joined disallowed list: the base set minus anything the user
/// explicitly allowed (trimmed-name comparison), then custom disallowed
/// tools verbatim.
pub fn build_disallowed_tools_string(
    custom_disallowed: Option<&str>,
    allowed_tools: Option<&str>,
) -> String {
    let mut disallowed: Vec<&str> = DISALLOWED_TOOLS.to_vec();

    if let Some(allowed) = allowed_tools {
        let allowed: Vec<&str> = allowed.split(',').map(str::trim).collect();
        disallowed.retain(|tool| !allowed.contains(tool));
    }

    let mut all = disallowed.join(",");
    if let Some(custom) = custom_disallowed.filter(|c| !c.is_empty()) {
        if all.is_empty() {
            all = custom.to_string();
        } else {
            all.push(',');
            all.push_str(custom);
        }
    }
    all
}
