//! Prompt builder: event normalization, rendering, and tool list assembly.
//!
//! One invocation per webhook trigger: normalize the context, render the
//! instruction document to its well-known path, and export the tool lists
//! for the assistant invocation.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use claude_gitea_api::FetchDataResult;
use claude_gitea_core::{Error, GiteaContext};

pub mod context;
pub mod render;
pub mod sanitizer;
pub mod tools;

pub use context::{CommentTarget, EventData, IssueAction, PreparedContext, prepare_context};
pub use render::{EventType, event_type_and_context, generate_prompt};
pub use sanitizer::sanitize_content;
pub use tools::{build_allowed_tools_string, build_disallowed_tools_string};

/// Where the assistant process reads the prompt from.
pub const PROMPT_DIR: &str = "/tmp/claude-prompts";
pub const PROMPT_PATH: &str = "/tmp/claude-prompts/claude-prompt.txt";

/// Result of a successful prompt build.
#[derive(Debug, Clone)]
pub struct CreatedPrompt {
    pub allowed_tools: String,
    pub disallowed_tools: String,
}

/// Normalize the context, render the prompt to [`PROMPT_PATH`], and export
/// `ALLOWED_TOOLS`/`DISALLOWED_TOOLS` through the `GITHUB_ENV` file. Any
/// validation failure aborts before the prompt file is written.
pub fn create_prompt(
    context: &GiteaContext,
    claude_comment_id: &str,
    base_branch: Option<&str>,
    claude_branch: Option<&str>,
    data: &FetchDataResult,
) -> Result<CreatedPrompt, Error> {
    let prepared = prepare_context(context, claude_comment_id, base_branch, claude_branch)?;

    let prompt = generate_prompt(&prepared, data);

    fs::create_dir_all(PROMPT_DIR)?;
    fs::write(PROMPT_PATH, &prompt)?;
    info!(path = PROMPT_PATH, bytes = prompt.len(), "Wrote prompt file");

    let allowed_tools =
        build_allowed_tools_string(&prepared.event_data, prepared.allowed_tools.as_deref());
    let disallowed_tools =
        build_disallowed_tools_string(prepared.disallowed_tools.as_deref(), Some(&allowed_tools));

    export_variable("ALLOWED_TOOLS", &allowed_tools)?;
    export_variable("DISALLOWED_TOOLS", &disallowed_tools)?;

    Ok(CreatedPrompt {
        allowed_tools,
        disallowed_tools,
    })
}

/// Export a variable to subsequent CI steps by appending to the file named
/// by `GITHUB_ENV`. Outside a runner the value is only logged.
fn export_variable(name: &str, value: &str) -> Result<(), Error> {
    match std::env::var_os("GITHUB_ENV") {
        Some(env_file) => {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(Path::new(&env_file))?;
            writeln!(file, "{name}={value}")?;
        }
        None => {
            info!(name, value, "GITHUB_ENV not set; variable not exported");
        }
    }
    Ok(())
}
