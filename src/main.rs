/// Flowkeep: workflow entity lifecycle manager
///
/// Main entry point for the Flowkeep server. Initializes configuration and
/// starts the HTTP server with workflow management endpoints.

use flowkeep::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Workflow management API at /api/workflows/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (environment variables, falling back to defaults)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
