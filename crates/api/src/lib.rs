//! Gitea REST API surface: client, data fetcher, formatters, and the
//! tracking-comment updater.

pub mod client;
pub mod comments;
pub mod data;
pub mod formatter;

pub use client::GiteaClient;
pub use comments::{SPINNER_HTML, update_tracking_comment};
pub use data::{ChangedFile, CommentData, EntityData, FetchDataResult, ReviewData, fetch_gitea_data};
