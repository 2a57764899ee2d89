//! Plain-text formatting of fetched data for the prompt document.

use std::collections::HashMap;

use crate::data::{ChangedFile, CommentData, EntityData, ReviewData};

/// Replace remote image URLs with the local paths they were downloaded to.
fn map_images(text: &str, image_url_map: &HashMap<String, String>) -> String {
    let mut mapped = text.to_string();
    for (url, path) in image_url_map {
        mapped = mapped.replace(url.as_str(), path.as_str());
    }
    mapped
}

/// Summarize the issue or PR the event concerns.
pub fn format_context(context_data: Option<&EntityData>, is_pr: bool) -> String {
    let Some(data) = context_data else {
        return "No context data available".into();
    };

    let mut out = String::new();
    let label = if is_pr { "PR" } else { "Issue" };
    out.push_str(&format!("{label} Title: {}\n", data.title));
    out.push_str(&format!("{label} Author: {}\n", data.author));
    out.push_str(&format!("{label} State: {}", data.state));
    if is_pr
        && let (Some(head), Some(base)) = (&data.head_branch, &data.base_branch)
    {
        out.push_str(&format!("\nPR Branch: {head} -> {base}"));
    }
    out
}

/// The entity body with image URLs rewritten to local paths.
pub fn format_body(body: &str, image_url_map: &HashMap<String, String>) -> String {
    map_images(body, image_url_map)
}

/// The conversation thread, one block per comment.
pub fn format_comments(
    comments: &[CommentData],
    image_url_map: &HashMap<String, String>,
) -> String {
    comments
        .iter()
        .map(|c| format!("[{}]: {}", c.author, map_images(&c.body, image_url_map)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The review thread of a PR, including each review's verdict.
pub fn format_review_comments(
    reviews: &[ReviewData],
    image_url_map: &HashMap<String, String>,
) -> String {
    reviews
        .iter()
        .map(|r| {
            let verdict = r.state.as_deref().unwrap_or("COMMENT");
            format!(
                "[{} - {verdict}]: {}",
                r.author,
                map_images(&r.body, image_url_map)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Changed files of a PR with their head-side blob SHAs.
pub fn format_changed_files_with_sha(files: &[ChangedFile]) -> String {
    files
        .iter()
        .map(|f| {
            format!(
                "- {} ({}) +{}/-{} SHA: {}",
                f.filename, f.status, f.additions, f.deletions, f.sha
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
