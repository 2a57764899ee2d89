//! Tracking-comment updates.
//!
//! The bot edits one comment in place to report progress. After a working
//! branch is created the comment gains a branch link, so this runs once,
//! out of band, right after branch creation.

use claude_gitea_core::{Error, GiteaContext};
use tracing::{error, info};

use crate::client::GiteaClient;

/// Spinner shown while work is in progress.
pub const SPINNER_HTML: &str = r#"<img src="https://raw.githubusercontent.com/markwylde/claude-code-gitea-action/refs/heads/gitea/assets/spinner.gif" width="14px" height="14px" style="vertical-align: middle; margin-left: 4px;" />"#;

pub fn create_job_run_link(server_url: &str, owner: &str, repo: &str, run_id: &str) -> String {
    format!("[View job run]({server_url}/{owner}/{repo}/actions/runs/{run_id})")
}

pub fn create_branch_link(server_url: &str, owner: &str, repo: &str, branch: &str) -> String {
    let encoded = urlencoding::encode(branch);
    format!("\n[View branch]({server_url}/{owner}/{repo}/src/branch/{encoded})")
}

pub fn create_comment_body(job_run_link: &str, branch_link: &str) -> String {
    format!("Claude Code is working{SPINNER_HTML}\n\n{job_run_link}{branch_link}")
}

/// The updated comment body for this invocation. The branch link is only
/// surfaced for non-PR events: a PR already shows its branch in the UI.
pub fn tracking_comment_body(
    context: &GiteaContext,
    branch: Option<&str>,
    server_url: &str,
) -> String {
    let owner = &context.repository.owner;
    let repo = &context.repository.repo;

    let job_run_link = create_job_run_link(server_url, owner, repo, &context.run_id);

    let branch_link = match branch {
        Some(branch) if !context.is_pr => create_branch_link(server_url, owner, repo, branch),
        _ => String::new(),
    };

    create_comment_body(&job_run_link, &branch_link)
}

/// Patch the tracking comment with the job-run link and, for issues, the
/// branch link. Inline review comments live under the pulls endpoint family;
/// everything else is an issue comment. Errors propagate to the caller
/// unchanged; no retry here.
pub async fn update_tracking_comment(
    client: &GiteaClient,
    context: &GiteaContext,
    comment_id: u64,
    branch: Option<&str>,
) -> Result<(), Error> {
    let body = tracking_comment_body(context, branch, client.server_url());
    let owner = &context.repository.owner;
    let repo = &context.repository.repo;

    let result = if context.is_review_comment_event() {
        client
            .update_pull_request_comment(owner, repo, comment_id, &body)
            .await
    } else {
        client
            .update_issue_comment(owner, repo, comment_id, &body)
            .await
    };

    match result {
        Ok(_) => {
            info!(comment_id, "Updated tracking comment");
            Ok(())
        }
        Err(e) => {
            error!(comment_id, error = %e, "Failed to update tracking comment");
            Err(e)
        }
    }
}
