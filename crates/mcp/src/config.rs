//! Startup configuration for the tool server, read once from the environment.

use std::env;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Immutable configuration shared by every tool call.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
    pub token: String,
    pub api_url: String,
    /// The bot's own tracking comment, targeted by `update_claude_comment`.
    pub claude_comment_id: Option<String>,
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{name} environment variable is required"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            owner: required("REPO_OWNER")?,
            repo: required("REPO_NAME")?,
            branch: optional("BRANCH_NAME"),
            token: required("GITHUB_TOKEN")?,
            api_url: optional("GITEA_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            claude_comment_id: optional("CLAUDE_COMMENT_ID"),
        })
    }
}
