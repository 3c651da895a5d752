/// workgraph: minimal stateful graph workflow engine
///
/// Main entry point. Loads configuration from the environment and starts
/// the HTTP server exposing graph registration, runs and inspection.

use workgraph::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Graph API at /graph/*
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Defaults to 0.0.0.0:8000 with the code review graph registered
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
