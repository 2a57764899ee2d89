//! Shared types and errors for the Gitea Claude bot.

pub mod context;

pub use context::{
    ActionInputs, Comment, GiteaContext, Issue, PullRequest, RepositoryRef, Review, User,
    WebhookPayload,
};

/// Error types shared across the workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field for the detected event kind is missing or contradictory.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Non-2xx response from the Gitea API.
    #[error("Gitea API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure before a status was received.
    #[error("network error: {0}")]
    Network(String),

    /// Missing or malformed startup configuration.
    #[error("missing configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
