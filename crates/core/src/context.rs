//! Parsed invocation context built from the Gitea webhook payload.
//!
//! The runner hands us the event name and the payload JSON; this module turns
//! them into typed structs and resolves `entity_number`/`is_pr` once, so
//! downstream code never re-derives PR-vs-issue status from payload shape.

use serde::Deserialize;

use crate::Error;

/// A user referenced in a webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

/// An issue as it appears in `issues` and `issue_comment` payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user: User,
    /// Present when the "issue" is actually the issue-side of a pull request.
    pub pull_request: Option<serde_json::Value>,
}

/// An issue or review comment.
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub body: Option<String>,
    pub user: User,
}

/// A pull request review.
#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub id: u64,
    pub body: Option<String>,
    pub user: User,
}

/// A pull request as it appears in PR-family payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuesPayload {
    pub action: String,
    pub issue: Issue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentPayload {
    pub action: String,
    pub issue: Issue,
    pub comment: Comment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub action: Option<String>,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestReviewPayload {
    pub action: Option<String>,
    pub pull_request: PullRequest,
    pub review: Review,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestReviewCommentPayload {
    pub action: Option<String>,
    pub pull_request: PullRequest,
    pub comment: Comment,
}

/// The event payload, tagged by the webhook event name.
#[derive(Debug, Clone)]
pub enum WebhookPayload {
    Issues(IssuesPayload),
    IssueComment(IssueCommentPayload),
    PullRequest(PullRequestPayload),
    PullRequestReview(PullRequestReviewPayload),
    PullRequestReviewComment(PullRequestReviewCommentPayload),
}

impl WebhookPayload {
    /// The comment or review body that triggered this event, if any.
    /// Issue and bare PR events have no triggering comment.
    pub fn comment_body(&self) -> Option<&str> {
        match self {
            WebhookPayload::IssueComment(p) => p.comment.body.as_deref(),
            WebhookPayload::PullRequestReview(p) => p.review.body.as_deref(),
            WebhookPayload::PullRequestReviewComment(p) => p.comment.body.as_deref(),
            WebhookPayload::Issues(_) | WebhookPayload::PullRequest(_) => None,
        }
    }

    /// The id of the triggering comment, where one exists.
    /// Reviews are not comments, so `pull_request_review` has none.
    pub fn comment_id(&self) -> Option<u64> {
        match self {
            WebhookPayload::IssueComment(p) => Some(p.comment.id),
            WebhookPayload::PullRequestReviewComment(p) => Some(p.comment.id),
            _ => None,
        }
    }

    /// The user whose comment, review, or issue triggered the event.
    pub fn trigger_username(&self) -> Option<&str> {
        match self {
            WebhookPayload::IssueComment(p) => Some(&p.comment.user.login),
            WebhookPayload::PullRequestReview(p) => Some(&p.review.user.login),
            WebhookPayload::PullRequestReviewComment(p) => Some(&p.comment.user.login),
            WebhookPayload::Issues(p) => Some(&p.issue.user.login),
            WebhookPayload::PullRequest(_) => None,
        }
    }
}

/// Repository identity split into owner and name.
#[derive(Debug, Clone)]
pub struct RepositoryRef {
    pub owner: String,
    pub repo: String,
}

impl RepositoryRef {
    /// Parse an `owner/repo` string.
    pub fn parse(full_name: &str) -> Result<Self, Error> {
        match full_name.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => Ok(Self {
                owner: owner.to_string(),
                repo: repo.to_string(),
            }),
            _ => Err(Error::Config(format!(
                "repository must be 'owner/repo', got '{full_name}'"
            ))),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// User-configurable inputs of a bot invocation.
#[derive(Debug, Clone, Default)]
pub struct ActionInputs {
    /// Textual marker that authorizes the bot to act. Defaults to `@claude`.
    pub trigger_phrase: Option<String>,
    /// Assignee login that triggers on `issues.assigned`.
    pub assignee_trigger: Option<String>,
    pub custom_instructions: Option<String>,
    pub allowed_tools: Option<String>,
    pub disallowed_tools: Option<String>,
    /// Instruction supplied directly instead of via a comment.
    pub direct_prompt: Option<String>,
}

impl ActionInputs {
    pub fn trigger_phrase(&self) -> &str {
        self.trigger_phrase.as_deref().unwrap_or("@claude")
    }
}

/// Everything known about the current bot invocation.
#[derive(Debug, Clone)]
pub struct GiteaContext {
    pub event_name: String,
    pub event_action: Option<String>,
    pub repository: RepositoryRef,
    pub run_id: String,
    /// Issue or PR number, disambiguated by `is_pr`.
    pub entity_number: u64,
    pub is_pr: bool,
    pub inputs: ActionInputs,
    pub payload: WebhookPayload,
}

impl GiteaContext {
    /// Parse the raw payload for `event_name` and resolve the entity number
    /// and PR flag. Unknown event names are rejected here, before any of the
    /// per-kind validation in the prompt builder runs.
    pub fn from_payload(
        event_name: &str,
        repository_full_name: &str,
        run_id: impl Into<String>,
        payload_json: serde_json::Value,
        inputs: ActionInputs,
    ) -> Result<Self, Error> {
        let payload = match event_name {
            "issues" => WebhookPayload::Issues(serde_json::from_value(payload_json)?),
            "issue_comment" => WebhookPayload::IssueComment(serde_json::from_value(payload_json)?),
            "pull_request" => WebhookPayload::PullRequest(serde_json::from_value(payload_json)?),
            "pull_request_review" => {
                WebhookPayload::PullRequestReview(serde_json::from_value(payload_json)?)
            }
            "pull_request_review_comment" => {
                WebhookPayload::PullRequestReviewComment(serde_json::from_value(payload_json)?)
            }
            other => {
                return Err(Error::InvalidEvent(format!(
                    "unsupported event type: {other}"
                )));
            }
        };

        let (entity_number, is_pr, event_action) = match &payload {
            WebhookPayload::Issues(p) => (
                p.issue.number,
                p.issue.pull_request.is_some(),
                Some(p.action.clone()),
            ),
            WebhookPayload::IssueComment(p) => (
                p.issue.number,
                p.issue.pull_request.is_some(),
                Some(p.action.clone()),
            ),
            WebhookPayload::PullRequest(p) => (p.pull_request.number, true, p.action.clone()),
            WebhookPayload::PullRequestReview(p) => (p.pull_request.number, true, p.action.clone()),
            WebhookPayload::PullRequestReviewComment(p) => {
                (p.pull_request.number, true, p.action.clone())
            }
        };

        Ok(Self {
            event_name: event_name.to_string(),
            event_action,
            repository: RepositoryRef::parse(repository_full_name)?,
            run_id: run_id.into(),
            entity_number,
            is_pr,
            inputs,
            payload,
        })
    }

    /// Whether the triggering comment was an inline PR review comment.
    /// These live in a different REST endpoint family than issue comments.
    pub fn is_review_comment_event(&self) -> bool {
        matches!(self.payload, WebhookPayload::PullRequestReviewComment(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs() -> ActionInputs {
        ActionInputs::default()
    }

    fn issue_json(number: u64, pull_request: bool) -> serde_json::Value {
        let mut issue = json!({
            "number": number,
            "title": "Test issue",
            "body": "Please fix @claude",
            "user": { "login": "alice" },
        });
        if pull_request {
            issue["pull_request"] = json!({ "url": "..." });
        }
        issue
    }

    #[test]
    fn test_parse_issues_opened() {
        let ctx = GiteaContext::from_payload(
            "issues",
            "owner/repo",
            "1",
            json!({ "action": "opened", "issue": issue_json(42, false) }),
            inputs(),
        )
        .unwrap();

        assert_eq!(ctx.entity_number, 42);
        assert!(!ctx.is_pr);
        assert_eq!(ctx.event_action.as_deref(), Some("opened"));
        assert_eq!(ctx.payload.trigger_username(), Some("alice"));
        assert_eq!(ctx.payload.comment_body(), None);
    }

    #[test]
    fn test_issue_comment_on_pr_sets_is_pr() {
        let ctx = GiteaContext::from_payload(
            "issue_comment",
            "owner/repo",
            "1",
            json!({
                "action": "created",
                "issue": issue_json(7, true),
                "comment": { "id": 99, "body": "@claude fix this", "user": { "login": "bob" } },
            }),
            inputs(),
        )
        .unwrap();

        assert!(ctx.is_pr);
        assert_eq!(ctx.entity_number, 7);
        assert_eq!(ctx.payload.comment_id(), Some(99));
        assert_eq!(ctx.payload.comment_body(), Some("@claude fix this"));
    }

    #[test]
    fn test_review_comment_event() {
        let ctx = GiteaContext::from_payload(
            "pull_request_review_comment",
            "owner/repo",
            "1",
            json!({
                "action": "created",
                "pull_request": {
                    "number": 3,
                    "title": "A PR",
                    "body": null,
                    "user": { "login": "carol" },
                },
                "comment": { "id": 5, "body": "@claude explain", "user": { "login": "dave" } },
            }),
            inputs(),
        )
        .unwrap();

        assert!(ctx.is_pr);
        assert!(ctx.is_review_comment_event());
        assert_eq!(ctx.payload.trigger_username(), Some("dave"));
    }

    #[test]
    fn test_review_has_no_comment_id() {
        let ctx = GiteaContext::from_payload(
            "pull_request_review",
            "owner/repo",
            "1",
            json!({
                "action": "submitted",
                "pull_request": {
                    "number": 3,
                    "title": "A PR",
                    "body": "desc",
                    "user": { "login": "carol" },
                },
                "review": { "id": 11, "body": "@claude check", "user": { "login": "erin" } },
            }),
            inputs(),
        )
        .unwrap();

        assert_eq!(ctx.payload.comment_id(), None);
        assert_eq!(ctx.payload.comment_body(), Some("@claude check"));
    }

    #[test]
    fn test_unsupported_event_name() {
        let err = GiteaContext::from_payload(
            "workflow_run",
            "owner/repo",
            "1",
            json!({}),
            inputs(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidEvent(_)));
    }

    #[test]
    fn test_repository_ref_parse() {
        let repo = RepositoryRef::parse("owner/repo").unwrap();
        assert_eq!(repo.owner, "owner");
        assert_eq!(repo.repo, "repo");
        assert_eq!(repo.full_name(), "owner/repo");

        assert!(RepositoryRef::parse("not-a-repo").is_err());
    }

    #[test]
    fn test_trigger_phrase_default() {
        assert_eq!(ActionInputs::default().trigger_phrase(), "@claude");

        let custom = ActionInputs {
            trigger_phrase: Some("@bot".into()),
            ..ActionInputs::default()
        };
        assert_eq!(custom.trigger_phrase(), "@bot");
    }
}
