//! Gitea API Operations tool server.
//!
//! Long-lived stdio JSON-RPC process the assistant calls Gitea through.
//! Configuration is read once at startup; a missing token or repository
//! identity is fatal.

use std::io::{self, BufReader};

use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod config;
mod ops;
mod rpc;
mod server;

use config::ServerConfig;
use server::{ServerState, serve};

fn main() -> Result<()> {
    // stdout is the RPC channel, so all logging goes to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gitea-mcp-server: {e}");
            std::process::exit(1);
        }
    };

    info!(
        owner = %config.owner,
        repo = %config.repo,
        branch = config.branch.as_deref().unwrap_or("-"),
        api_url = %config.api_url,
        "Starting Gitea API Operations server"
    );

    let state = ServerState::new(config);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let report = serve(&mut reader, &mut writer, &state)?;
    info!(
        frames = report.processed_frames,
        errors = report.error_count,
        "Server shutting down"
    );

    Ok(())
}
