/// Server setup and initialization
///
/// Wires together the tool registry, node library, engine and HTTP routes.
/// Provides the main application factory function for creating the Axum app.

use crate::{
    api::graphs::{create_graph_routes, AppState},
    config::Config,
    runtime::GraphEngine,
    workflow::tools::ToolRegistry,
    workflows::code_review,
};
use anyhow::Result;
use axum::{routing::get, Router};
use tokio::net::TcpListener;

/// Build the engine with the bundled node library and tools
///
/// Registers the default code review graph when bootstrapping is enabled.
pub async fn create_engine(config: &Config) -> Result<GraphEngine> {
    tracing::info!("🧰 Initializing tool registry");
    let tools = ToolRegistry::new();
    code_review::register_tools(&tools);

    tracing::info!("🚀 Initializing graph engine");
    let engine = GraphEngine::new(code_review::node_library(), tools);

    if config.engine.bootstrap_default_graph {
        let graph_id = code_review::ensure_default_graph(&engine)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to register default graph: {}", e))?;
        tracing::info!("✅ Default code review graph available: {}", graph_id);
    }

    Ok(engine)
}

/// Create the main Axum application with all routes
pub fn create_app(engine: GraphEngine) -> Router {
    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Graph management and execution routes
        .merge(create_graph_routes().with_state(AppState { engine }))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting workgraph server...");

    let engine = create_engine(&config).await?;
    let app = create_app(engine);

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}
