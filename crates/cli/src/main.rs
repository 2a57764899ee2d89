//! Gitea Claude bot entrypoint.
//!
//! Runs inside the CI job: builds the prompt for the assistant, updates the
//! tracking comment after branch creation, and prepares Claude Code settings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use claude_gitea_api::{GiteaClient, fetch_gitea_data, update_tracking_comment};
use claude_gitea_core::{ActionInputs, GiteaContext};
use claude_gitea_prompt::{PROMPT_PATH, create_prompt};

mod settings;

#[derive(Parser)]
#[command(name = "claude-gitea")]
#[command(about = "Gitea Claude bot for issue and PR automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by the commands that read the webhook event.
#[derive(Args)]
struct EventArgs {
    /// Webhook event name (issues, issue_comment, pull_request, ...)
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: String,

    /// Path to the event payload JSON written by the runner
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: PathBuf,

    /// Repository in owner/repo form
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: String,

    /// Workflow run id, used for the job run link
    #[arg(long, env = "GITHUB_RUN_ID", default_value = "0")]
    run_id: String,

    /// Gitea API base, e.g. https://gitea.example.com/api/v1
    #[arg(long, env = "GITEA_API_URL", default_value = "https://api.github.com")]
    api_url: String,

    /// Web root for links, when it differs from the API host
    #[arg(long, env = "GITEA_SERVER_URL")]
    server_url: Option<String>,

    /// Gitea token
    #[arg(long, env = "GITHUB_TOKEN")]
    token: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the prompt file and export the assistant tool lists
    CreatePrompt {
        #[command(flatten)]
        event: EventArgs,

        /// Id of the tracking comment created earlier in the workflow
        #[arg(long, env = "CLAUDE_COMMENT_ID")]
        claude_comment_id: String,

        /// Base branch to create a working branch from (issues)
        #[arg(long, env = "BASE_BRANCH")]
        base_branch: Option<String>,

        /// Assistant working branch, when one is already assigned
        #[arg(long, env = "CLAUDE_BRANCH")]
        claude_branch: Option<String>,

        /// Trigger phrase that authorizes the bot (defaults to @claude)
        #[arg(long, env = "INPUT_TRIGGER_PHRASE")]
        trigger_phrase: Option<String>,

        /// Assignee login that triggers on issue assignment
        #[arg(long, env = "INPUT_ASSIGNEE_TRIGGER")]
        assignee_trigger: Option<String>,

        /// Extra instructions appended to the prompt
        #[arg(long, env = "INPUT_CUSTOM_INSTRUCTIONS")]
        custom_instructions: Option<String>,

        /// Extra tools to allow, comma-separated
        #[arg(long, env = "INPUT_ALLOWED_TOOLS")]
        allowed_tools: Option<String>,

        /// Extra tools to disallow, comma-separated
        #[arg(long, env = "INPUT_DISALLOWED_TOOLS")]
        disallowed_tools: Option<String>,

        /// Direct instruction, bypassing comment triggers
        #[arg(long, env = "INPUT_DIRECT_PROMPT")]
        direct_prompt: Option<String>,
    },

    /// Patch the tracking comment with the job run and branch links
    UpdateComment {
        #[command(flatten)]
        event: EventArgs,

        /// Id of the tracking comment to patch
        #[arg(long, env = "CLAUDE_COMMENT_ID")]
        comment_id: u64,

        /// Newly created working branch, if any
        #[arg(long)]
        branch: Option<String>,
    },

    /// Merge settings into ~/.claude/settings.json
    SetupSettings {
        /// Inline JSON or a path to a settings file to merge
        #[arg(long, env = "INPUT_SETTINGS")]
        settings: Option<String>,
    },
}

fn parse_event(event: &EventArgs, inputs: ActionInputs) -> Result<GiteaContext> {
    let payload = std::fs::read_to_string(&event.event_path)
        .with_context(|| format!("failed to read event payload {}", event.event_path.display()))?;
    let payload = serde_json::from_str(&payload)
        .with_context(|| format!("failed to parse event payload {}", event.event_path.display()))?;

    GiteaContext::from_payload(
        &event.event_name,
        &event.repository,
        event.run_id.clone(),
        payload,
        inputs,
    )
    .context("failed to build event context")
}

fn make_client(event: &EventArgs) -> GiteaClient {
    let client = GiteaClient::new(&event.api_url, &event.token);
    match &event.server_url {
        Some(server_url) => client.with_server_url(server_url),
        None => client,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::CreatePrompt {
            event,
            claude_comment_id,
            base_branch,
            claude_branch,
            trigger_phrase,
            assignee_trigger,
            custom_instructions,
            allowed_tools,
            disallowed_tools,
            direct_prompt,
        } => {
            let inputs = ActionInputs {
                trigger_phrase,
                assignee_trigger,
                custom_instructions,
                allowed_tools,
                disallowed_tools,
                direct_prompt,
            };

            let result = run_create_prompt(
                &event,
                &claude_comment_id,
                base_branch.as_deref(),
                claude_branch.as_deref(),
                inputs,
            )
            .await;

            if let Err(e) = result {
                // CI failure marker; the runner shows it on the job summary
                println!("::error::Create prompt failed with error: {e:#}");
                std::process::exit(1);
            }
        }

        Commands::UpdateComment {
            event,
            comment_id,
            branch,
        } => {
            let context = parse_event(&event, ActionInputs::default())?;
            let client = make_client(&event);
            update_tracking_comment(&client, &context, comment_id, branch.as_deref()).await?;
        }

        Commands::SetupSettings { settings } => {
            settings::setup_claude_code_settings(settings.as_deref(), None)?;
        }
    }

    Ok(())
}

async fn run_create_prompt(
    event: &EventArgs,
    claude_comment_id: &str,
    base_branch: Option<&str>,
    claude_branch: Option<&str>,
    inputs: ActionInputs,
) -> Result<()> {
    let context = parse_event(event, inputs)?;
    let client = make_client(event);

    let data = fetch_gitea_data(
        &client,
        &context.repository.owner,
        &context.repository.repo,
        context.entity_number,
        context.is_pr,
    )
    .await
    .context("failed to fetch repository data")?;

    let created = create_prompt(&context, claude_comment_id, base_branch, claude_branch, &data)
        .context("failed to create prompt")?;

    info!(
        path = PROMPT_PATH,
        allowed_tools = %created.allowed_tools,
        disallowed_tools = %created.disallowed_tools,
        "Prompt created"
    );

    Ok(())
}
