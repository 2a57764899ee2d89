//! Pre-fetched repository data consumed by the prompt renderer.

use std::collections::HashMap;

use claude_gitea_core::Error;
use serde::Deserialize;
use tracing::info;

use crate::client::GiteaClient;

/// The issue or PR the event concerns.
#[derive(Debug, Clone)]
pub struct EntityData {
    pub title: String,
    pub body: Option<String>,
    pub author: String,
    pub state: String,
    /// PR only: target branch of the merge.
    pub base_branch: Option<String>,
    /// PR only: branch holding the changes.
    pub head_branch: Option<String>,
}

/// A conversation comment on the issue or PR.
#[derive(Debug, Clone)]
pub struct CommentData {
    pub id: u64,
    pub author: String,
    pub body: String,
}

/// A review on the PR, with its verdict where the API reports one.
#[derive(Debug, Clone)]
pub struct ReviewData {
    pub id: u64,
    pub author: String,
    pub body: String,
    pub state: Option<String>,
}

/// One changed file of the PR with the SHA of its head-side blob.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub filename: String,
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    pub sha: String,
}

/// Everything the prompt renderer needs, fetched up front in one pass.
#[derive(Debug, Clone, Default)]
pub struct FetchDataResult {
    pub context_data: Option<EntityData>,
    pub comments: Vec<CommentData>,
    pub review_data: Vec<ReviewData>,
    pub changed_files_with_sha: Vec<ChangedFile>,
    /// Remote image URL to local file path, for bodies that embed screenshots.
    pub image_url_map: HashMap<String, String>,
}

/// Fetch the entity, its comment thread, and (for PRs) reviews and changed
/// files. Review data and changed files are left empty for plain issues.
pub async fn fetch_gitea_data(
    client: &GiteaClient,
    owner: &str,
    repo: &str,
    entity_number: u64,
    is_pr: bool,
) -> Result<FetchDataResult, Error> {
    info!(owner, repo, entity_number, is_pr, "Fetching Gitea data");

    #[derive(Deserialize)]
    struct ApiUser {
        login: String,
    }
    #[derive(Deserialize)]
    struct ApiBranchRef {
        #[serde(rename = "ref")]
        ref_name: String,
    }
    #[derive(Deserialize)]
    struct ApiEntity {
        title: String,
        body: Option<String>,
        user: ApiUser,
        state: String,
        base: Option<ApiBranchRef>,
        head: Option<ApiBranchRef>,
    }
    #[derive(Deserialize)]
    struct ApiComment {
        id: u64,
        body: Option<String>,
        user: ApiUser,
    }
    #[derive(Deserialize)]
    struct ApiReview {
        id: u64,
        body: Option<String>,
        user: ApiUser,
        state: Option<String>,
    }
    #[derive(Deserialize)]
    struct ApiChangedFile {
        filename: String,
        status: Option<String>,
        #[serde(default)]
        additions: u64,
        #[serde(default)]
        deletions: u64,
        #[serde(default)]
        sha: String,
    }

    let entity_path = if is_pr {
        format!("/repos/{owner}/{repo}/pulls/{entity_number}")
    } else {
        format!("/repos/{owner}/{repo}/issues/{entity_number}")
    };
    let entity: ApiEntity = serde_json::from_value(client.get(&entity_path).await?)?;

    let comments: Vec<ApiComment> = serde_json::from_value(
        client
            .get(&format!(
                "/repos/{owner}/{repo}/issues/{entity_number}/comments"
            ))
            .await?,
    )?;

    let (review_data, changed_files) = if is_pr {
        let reviews: Vec<ApiReview> = serde_json::from_value(
            client
                .get(&format!(
                    "/repos/{owner}/{repo}/pulls/{entity_number}/reviews"
                ))
                .await?,
        )?;
        let files: Vec<ApiChangedFile> = serde_json::from_value(
            client
                .get(&format!(
                    "/repos/{owner}/{repo}/pulls/{entity_number}/files"
                ))
                .await?,
        )?;
        (reviews, files)
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(FetchDataResult {
        context_data: Some(EntityData {
            title: entity.title,
            body: entity.body,
            author: entity.user.login,
            state: entity.state,
            base_branch: entity.base.map(|b| b.ref_name),
            head_branch: entity.head.map(|b| b.ref_name),
        }),
        comments: comments
            .into_iter()
            .map(|c| CommentData {
                id: c.id,
                author: c.user.login,
                body: c.body.unwrap_or_default(),
            })
            .collect(),
        review_data: review_data
            .into_iter()
            .map(|r| ReviewData {
                id: r.id,
                author: r.user.login,
                body: r.body.unwrap_or_default(),
                state: r.state,
            })
            .collect(),
        changed_files_with_sha: changed_files
            .into_iter()
            .map(|f| ChangedFile {
                filename: f.filename,
                status: f.status.unwrap_or_else(|| "changed".into()),
                additions: f.additions,
                deletions: f.deletions,
                sha: f.sha,
            })
            .collect(),
        image_url_map: HashMap::new(),
    })
}
