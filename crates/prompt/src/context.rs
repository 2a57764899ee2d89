//! Event context normalization.
//!
//! Converts the raw invocation context into the [`EventData`] tagged union,
//! validating the required fields of each event kind up front. Absence of a
//! required field is a fatal input error here, never a silent default later.

use claude_gitea_core::{Error, GiteaContext, WebhookPayload};

/// What an `issues` event did. Only `opened` and `assigned` are supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueAction {
    Opened,
    Assigned { assignee_trigger: String },
}

/// Where an `issue_comment` landed. PR comments already have a branch;
/// comments on a plain issue need a base branch to create one from.
#[derive(Debug, Clone)]
pub enum CommentTarget {
    PullRequest {
        pr_number: String,
        claude_branch: Option<String>,
        base_branch: Option<String>,
    },
    Issue {
        issue_number: String,
        base_branch: String,
        claude_branch: Option<String>,
    },
}

/// Event-specific fields, tagged by the webhook event name.
#[derive(Debug, Clone)]
pub enum EventData {
    PullRequestReviewComment {
        pr_number: String,
        comment_id: Option<String>,
        comment_body: String,
        claude_branch: Option<String>,
        base_branch: Option<String>,
    },
    PullRequestReview {
        pr_number: String,
        comment_body: String,
        claude_branch: Option<String>,
        base_branch: Option<String>,
    },
    IssueComment {
        comment_id: String,
        comment_body: String,
        target: CommentTarget,
    },
    Issues {
        action: IssueAction,
        issue_number: String,
        base_branch: String,
        claude_branch: Option<String>,
    },
    PullRequest {
        event_action: Option<String>,
        pr_number: String,
        claude_branch: Option<String>,
        base_branch: Option<String>,
    },
}

impl EventData {
    pub fn event_name(&self) -> &'static str {
        match self {
            EventData::PullRequestReviewComment { .. } => "pull_request_review_comment",
            EventData::PullRequestReview { .. } => "pull_request_review",
            EventData::IssueComment { .. } => "issue_comment",
            EventData::Issues { .. } => "issues",
            EventData::PullRequest { .. } => "pull_request",
        }
    }

    pub fn is_pr(&self) -> bool {
        match self {
            EventData::PullRequestReviewComment { .. }
            | EventData::PullRequestReview { .. }
            | EventData::PullRequest { .. } => true,
            EventData::IssueComment { target, .. } => {
                matches!(target, CommentTarget::PullRequest { .. })
            }
            EventData::Issues { .. } => false,
        }
    }

    pub fn pr_number(&self) -> Option<&str> {
        match self {
            EventData::PullRequestReviewComment { pr_number, .. }
            | EventData::PullRequestReview { pr_number, .. }
            | EventData::PullRequest { pr_number, .. } => Some(pr_number),
            EventData::IssueComment {
                target: CommentTarget::PullRequest { pr_number, .. },
                ..
            } => Some(pr_number),
            _ => None,
        }
    }

    pub fn issue_number(&self) -> Option<&str> {
        match self {
            EventData::Issues { issue_number, .. } => Some(issue_number),
            EventData::IssueComment {
                target: CommentTarget::Issue { issue_number, .. },
                ..
            } => Some(issue_number),
            _ => None,
        }
    }

    pub fn claude_branch(&self) -> Option<&str> {
        match self {
            EventData::PullRequestReviewComment { claude_branch, .. }
            | EventData::PullRequestReview { claude_branch, .. }
            | EventData::PullRequest { claude_branch, .. }
            | EventData::Issues { claude_branch, .. } => claude_branch.as_deref(),
            EventData::IssueComment { target, .. } => match target {
                CommentTarget::PullRequest { claude_branch, .. }
                | CommentTarget::Issue { claude_branch, .. } => claude_branch.as_deref(),
            },
        }
    }

    /// The triggering comment or review text, where the event has one.
    pub fn comment_body(&self) -> Option<&str> {
        match self {
            EventData::PullRequestReviewComment { comment_body, .. }
            | EventData::PullRequestReview { comment_body, .. }
            | EventData::IssueComment { comment_body, .. } => Some(comment_body),
            EventData::Issues { .. } | EventData::PullRequest { .. } => None,
        }
    }

    /// Id of the triggering inline review comment, if any.
    pub fn comment_id(&self) -> Option<&str> {
        match self {
            EventData::PullRequestReviewComment { comment_id, .. } => comment_id.as_deref(),
            EventData::IssueComment { comment_id, .. } => Some(comment_id),
            _ => None,
        }
    }

    /// The single comment-update tool the assistant gets for this event.
    /// Inline review comments are updated through the pulls endpoint family;
    /// everything else goes through the issues one.
    pub fn comment_tool(&self) -> &'static str {
        match self {
            EventData::PullRequestReviewComment { .. } => "mcp__gitea__update_pull_request_comment",
            _ => "mcp__gitea__update_issue_comment",
        }
    }
}

/// Invocation context after normalization; read-only from here on.
#[derive(Debug, Clone)]
pub struct PreparedContext {
    pub repository: String,
    pub claude_comment_id: String,
    pub trigger_phrase: String,
    pub trigger_username: Option<String>,
    pub custom_instructions: Option<String>,
    pub allowed_tools: Option<String>,
    pub disallowed_tools: Option<String>,
    pub direct_prompt: Option<String>,
    pub claude_branch: Option<String>,
    pub event_data: EventData,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Normalize the raw context into a [`PreparedContext`].
///
/// PR-vs-issue status and the entity number come pre-resolved on the raw
/// context; this function only validates and reshapes, it does not re-derive
/// them.
pub fn prepare_context(
    context: &GiteaContext,
    claude_comment_id: &str,
    base_branch: Option<&str>,
    claude_branch: Option<&str>,
) -> Result<PreparedContext, Error> {
    let entity_number = context.entity_number.to_string();
    let comment_body = context.payload.comment_body().unwrap_or("");
    let comment_id = context.payload.comment_id().map(|id| id.to_string());
    let claude_branch = non_empty(claude_branch);
    let base_branch = non_empty(base_branch);

    let event_data = match &context.payload {
        WebhookPayload::PullRequestReviewComment(_) => {
            if comment_body.is_empty() {
                return Err(Error::InvalidEvent(
                    "comment body is required for pull_request_review_comment event".into(),
                ));
            }
            EventData::PullRequestReviewComment {
                pr_number: entity_number,
                comment_id,
                comment_body: comment_body.to_string(),
                claude_branch: claude_branch.clone(),
                base_branch,
            }
        }

        WebhookPayload::PullRequestReview(_) => {
            if comment_body.is_empty() {
                return Err(Error::InvalidEvent(
                    "comment body is required for pull_request_review event".into(),
                ));
            }
            EventData::PullRequestReview {
                pr_number: entity_number,
                comment_body: comment_body.to_string(),
                claude_branch: claude_branch.clone(),
                base_branch,
            }
        }

        WebhookPayload::IssueComment(_) => {
            let Some(comment_id) = comment_id else {
                return Err(Error::InvalidEvent(
                    "comment id is required for issue_comment event".into(),
                ));
            };
            if comment_body.is_empty() {
                return Err(Error::InvalidEvent(
                    "comment body is required for issue_comment event".into(),
                ));
            }
            let target = if context.is_pr {
                CommentTarget::PullRequest {
                    pr_number: entity_number,
                    claude_branch: claude_branch.clone(),
                    base_branch,
                }
            } else {
                let Some(base_branch) = base_branch else {
                    return Err(Error::InvalidEvent(
                        "base branch is required for issue_comment event on an issue".into(),
                    ));
                };
                CommentTarget::Issue {
                    issue_number: entity_number,
                    base_branch,
                    claude_branch: claude_branch.clone(),
                }
            };
            EventData::IssueComment {
                comment_id,
                comment_body: comment_body.to_string(),
                target,
            }
        }

        WebhookPayload::Issues(payload) => {
            if context.is_pr {
                return Err(Error::InvalidEvent(
                    "is_pr must be false for issues event".into(),
                ));
            }
            let Some(base_branch) = base_branch else {
                return Err(Error::InvalidEvent(
                    "base branch is required for issues event".into(),
                ));
            };
            let action = match payload.action.as_str() {
                "opened" => IssueAction::Opened,
                "assigned" => {
                    let Some(assignee_trigger) = context
                        .inputs
                        .assignee_trigger
                        .as_deref()
                        .filter(|t| !t.is_empty())
                    else {
                        return Err(Error::InvalidEvent(
                            "assignee trigger is required for issue assigned event".into(),
                        ));
                    };
                    IssueAction::Assigned {
                        assignee_trigger: assignee_trigger.to_string(),
                    }
                }
                other => {
                    return Err(Error::InvalidEvent(format!(
                        "unsupported issue action: {other}"
                    )));
                }
            };
            EventData::Issues {
                action,
                issue_number: entity_number,
                base_branch,
                claude_branch: claude_branch.clone(),
            }
        }

        WebhookPayload::PullRequest(payload) => EventData::PullRequest {
            event_action: payload.action.clone(),
            pr_number: entity_number,
            claude_branch: claude_branch.clone(),
            base_branch,
        },
    };

    Ok(PreparedContext {
        repository: context.repository.full_name(),
        claude_comment_id: claude_comment_id.to_string(),
        trigger_phrase: context.inputs.trigger_phrase().to_string(),
        trigger_username: context.payload.trigger_username().map(str::to_string),
        custom_instructions: non_empty(context.inputs.custom_instructions.as_deref()),
        allowed_tools: non_empty(context.inputs.allowed_tools.as_deref()),
        disallowed_tools: non_empty(context.inputs.disallowed_tools.as_deref()),
        direct_prompt: non_empty(context.inputs.direct_prompt.as_deref()),
        claude_branch,
        event_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use claude_gitea_core::ActionInputs;
    use serde_json::json;

    fn issue_json(number: u64, is_pr: bool) -> serde_json::Value {
        let mut issue = json!({
            "number": number,
            "title": "Test",
            "body": "body",
            "user": { "login": "alice" },
        });
        if is_pr {
            issue["pull_request"] = json!({});
        }
        issue
    }

    fn pr_json(number: u64) -> serde_json::Value {
        json!({
            "number": number,
            "title": "Test PR",
            "body": "body",
            "user": { "login": "alice" },
        })
    }

    fn make_context(
        event_name: &str,
        payload: serde_json::Value,
        inputs: ActionInputs,
    ) -> GiteaContext {
        GiteaContext::from_payload(event_name, "owner/repo", "1", payload, inputs).unwrap()
    }

    #[test]
    fn test_issues_opened() {
        let ctx = make_context(
            "issues",
            json!({ "action": "opened", "issue": issue_json(42, false) }),
            ActionInputs::default(),
        );
        let prepared = prepare_context(&ctx, "100", Some("main"), None).unwrap();

        match &prepared.event_data {
            EventData::Issues {
                action,
                issue_number,
                base_branch,
                claude_branch,
            } => {
                assert_eq!(*action, IssueAction::Opened);
                assert_eq!(issue_number, "42");
                assert_eq!(base_branch, "main");
                assert!(claude_branch.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert!(!prepared.event_data.is_pr());
        assert_eq!(prepared.trigger_username.as_deref(), Some("alice"));
        assert_eq!(prepared.trigger_phrase, "@claude");
    }

    #[test]
    fn test_issues_assigned_requires_trigger() {
        let payload = json!({ "action": "assigned", "issue": issue_json(42, false) });
        let ctx = make_context("issues", payload.clone(), ActionInputs::default());
        let err = prepare_context(&ctx, "100", Some("main"), None).unwrap_err();
        assert!(err.to_string().contains("assignee trigger"));

        let inputs = ActionInputs {
            assignee_trigger: Some("claude-bot".into()),
            ..ActionInputs::default()
        };
        let ctx = make_context("issues", payload, inputs);
        let prepared = prepare_context(&ctx, "100", Some("main"), None).unwrap();
        assert!(matches!(
            prepared.event_data,
            EventData::Issues {
                action: IssueAction::Assigned { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_issues_unsupported_action() {
        let ctx = make_context(
            "issues",
            json!({ "action": "closed", "issue": issue_json(42, false) }),
            ActionInputs::default(),
        );
        let err = prepare_context(&ctx, "100", Some("main"), None).unwrap_err();
        assert!(err.to_string().contains("unsupported issue action: closed"));
    }

    #[test]
    fn test_issues_requires_base_branch() {
        let ctx = make_context(
            "issues",
            json!({ "action": "opened", "issue": issue_json(42, false) }),
            ActionInputs::default(),
        );
        let err = prepare_context(&ctx, "100", None, None).unwrap_err();
        assert!(err.to_string().contains("base branch"));
    }

    #[test]
    fn test_issue_comment_on_pr_needs_no_base_branch() {
        let ctx = make_context(
            "issue_comment",
            json!({
                "action": "created",
                "issue": issue_json(7, true),
                "comment": { "id": 99, "body": "@claude go", "user": { "login": "bob" } },
            }),
            ActionInputs::default(),
        );
        let prepared = prepare_context(&ctx, "100", None, None).unwrap();

        match &prepared.event_data {
            EventData::IssueComment {
                comment_id, target, ..
            } => {
                assert_eq!(comment_id, "99");
                assert!(matches!(
                    target,
                    CommentTarget::PullRequest { pr_number, .. } if pr_number == "7"
                ));
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert!(prepared.event_data.is_pr());
    }

    #[test]
    fn test_issue_comment_on_issue_requires_base_branch() {
        let payload = json!({
            "action": "created",
            "issue": issue_json(7, false),
            "comment": { "id": 99, "body": "@claude go", "user": { "login": "bob" } },
        });
        let ctx = make_context("issue_comment", payload.clone(), ActionInputs::default());
        let err = prepare_context(&ctx, "100", None, None).unwrap_err();
        assert!(err.to_string().contains("base branch"));

        let ctx = make_context("issue_comment", payload, ActionInputs::default());
        let prepared = prepare_context(&ctx, "100", Some("main"), None).unwrap();
        assert!(matches!(
            prepared.event_data,
            EventData::IssueComment {
                target: CommentTarget::Issue { .. },
                ..
            }
        ));
        assert!(!prepared.event_data.is_pr());
    }

    #[test]
    fn test_issue_comment_requires_body() {
        let ctx = make_context(
            "issue_comment",
            json!({
                "action": "created",
                "issue": issue_json(7, true),
                "comment": { "id": 99, "body": "", "user": { "login": "bob" } },
            }),
            ActionInputs::default(),
        );
        let err = prepare_context(&ctx, "100", None, None).unwrap_err();
        assert!(err.to_string().contains("comment body"));
    }

    #[test]
    fn test_review_comment_event() {
        let ctx = make_context(
            "pull_request_review_comment",
            json!({
                "action": "created",
                "pull_request": pr_json(3),
                "comment": { "id": 5, "body": "fix this", "user": { "login": "dave" } },
            }),
            ActionInputs::default(),
        );
        let prepared = prepare_context(&ctx, "100", None, Some("claude/pr-3-fix")).unwrap();

        match &prepared.event_data {
            EventData::PullRequestReviewComment {
                pr_number,
                comment_id,
                comment_body,
                claude_branch,
                ..
            } => {
                assert_eq!(pr_number, "3");
                assert_eq!(comment_id.as_deref(), Some("5"));
                assert_eq!(comment_body, "fix this");
                assert_eq!(claude_branch.as_deref(), Some("claude/pr-3-fix"));
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert_eq!(
            prepared.event_data.comment_tool(),
            "mcp__gitea__update_pull_request_comment"
        );
    }

    #[test]
    fn test_review_requires_body() {
        let ctx = make_context(
            "pull_request_review",
            json!({
                "action": "submitted",
                "pull_request": pr_json(3),
                "review": { "id": 5, "body": null, "user": { "login": "dave" } },
            }),
            ActionInputs::default(),
        );
        let err = prepare_context(&ctx, "100", None, None).unwrap_err();
        assert!(err.to_string().contains("comment body"));
    }

    #[test]
    fn test_pull_request_event() {
        let ctx = make_context(
            "pull_request",
            json!({ "action": "opened", "pull_request": pr_json(12) }),
            ActionInputs::default(),
        );
        let prepared = prepare_context(&ctx, "100", None, None).unwrap();

        match &prepared.event_data {
            EventData::PullRequest {
                event_action,
                pr_number,
                ..
            } => {
                assert_eq!(event_action.as_deref(), Some("opened"));
                assert_eq!(pr_number, "12");
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert_eq!(
            prepared.event_data.comment_tool(),
            "mcp__gitea__update_issue_comment"
        );
    }

    #[test]
    fn test_issues_event_with_pr_flag_rejected() {
        let ctx = make_context(
            "issues",
            json!({ "action": "opened", "issue": issue_json(42, true) }),
            ActionInputs::default(),
        );
        let err = prepare_context(&ctx, "100", Some("main"), None).unwrap_err();
        assert!(err.to_string().contains("is_pr must be false"));
    }
}
