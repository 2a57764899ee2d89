//! Thin authenticated wrapper over the Gitea REST API.

use claude_gitea_core::Error;
use serde_json::Value;
use tracing::debug;

/// Authenticated Gitea API client bound to one repository host.
pub struct GiteaClient {
    http: reqwest::Client,
    api_url: String,
    server_url: String,
    token: String,
}

impl GiteaClient {
    /// Create a client for an API base such as `https://gitea.example.com/api/v1`.
    /// The web server URL used for links is derived by stripping the API
    /// suffix; override it with [`GiteaClient::with_server_url`] if the host
    /// serves the UI elsewhere.
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        let api_url = api_url.trim_end_matches('/').to_string();
        let server_url = api_url
            .strip_suffix("/api/v1")
            .unwrap_or(&api_url)
            .to_string();
        Self {
            http: reqwest::Client::new(),
            api_url,
            server_url,
            token: token.into(),
        }
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        self.server_url = server_url.trim_end_matches('/').to_string();
        self
    }

    /// Web root of the hosting instance, for user-facing links.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let url = format!("{}{path}", self.api_url);
        debug!(method = %method, url = %url, "Gitea API request");

        let mut req = self
            .http
            .request(method, &url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        if text.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value, Error> {
        self.request(reqwest::Method::GET, path, None).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.request(reqwest::Method::PATCH, path, Some(body)).await
    }

    /// Update a general issue or PR conversation comment.
    pub async fn update_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<Value, Error> {
        self.patch(
            &format!("/repos/{owner}/{repo}/issues/comments/{comment_id}"),
            &serde_json::json!({ "body": body }),
        )
        .await
    }

    /// Update an inline PR review comment. These live under the pulls
    /// endpoint family, not issues.
    pub async fn update_pull_request_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<Value, Error> {
        self.patch(
            &format!("/repos/{owner}/{repo}/pulls/comments/{comment_id}"),
            &serde_json::json!({ "body": body }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_url_derived_from_api_url() {
        let client = GiteaClient::new("https://gitea.example.com/api/v1", "t");
        assert_eq!(client.server_url(), "https://gitea.example.com");
    }

    #[test]
    fn test_server_url_fallback_without_suffix() {
        let client = GiteaClient::new("https://api.github.com/", "t");
        assert_eq!(client.server_url(), "https://api.github.com");
    }

    #[test]
    fn test_server_url_override() {
        let client = GiteaClient::new("https://internal:3000/api/v1", "t")
            .with_server_url("https://git.example.com/");
        assert_eq!(client.server_url(), "https://git.example.com");
    }
}
