//! offline-shell server entry point.
//!
//! Loads configuration, installs the configured version and serves the MCP
//! tools on stdio transport. Logging goes to stderr to avoid interfering with
//! the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shell_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod handler;
mod registration;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.version_tag, origin = %config.origin, db = %config.db_path.display(), "Starting offline-shell server on stdio transport");

    let state = state::AppState::open(config).await?;
    match state.install_configured().await {
        Ok(outcome) => tracing::info!(version = %outcome.version_tag, purged = ?outcome.purged, "configured version installed"),
        Err(e) => tracing::warn!(error = %e, "configured version not installed; requests pass through to the network"),
    }

    let handler = handler::ShellServer::new(Arc::new(state));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
