/// Graph management REST API endpoints
///
/// Thin translation layer over the engine: request bodies become engine
/// calls, engine errors become status codes with a `detail` message.

use crate::{
    runtime::GraphEngine,
    workflow::{
        error::EngineError,
        types::{EdgeTarget, LogEntry, RunRecord, State},
    },
};
use axum::{
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Engine owning graphs and runs
    pub engine: GraphEngine,
}

/// Request body for graph creation
#[derive(Debug, Deserialize)]
pub struct CreateGraphRequest {
    /// Names of nodes to include, must exist in the node library
    pub nodes: Vec<String>,
    /// Node → next node(s); branching nodes choose via `next_node`
    pub edges: HashMap<String, EdgeTarget>,
    pub start_node: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGraphResponse {
    pub graph_id: String,
}

/// Request body for running a graph
#[derive(Debug, Deserialize)]
pub struct RunGraphRequest {
    pub graph_id: String,
    #[serde(default)]
    pub initial_state: State,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunGraphResponse {
    pub run_id: String,
    pub final_state: State,
    pub logs: Vec<LogEntry>,
}

type ApiError = (StatusCode, Json<Value>);

/// Create graph management routes
///
/// POST /graph/create, POST /graph/run, GET /graph/state/{run_id},
/// GET /graph/nodes, GET /graph/list
pub fn create_graph_routes() -> Router<AppState> {
    Router::new()
        .route("/graph/create", post(create_graph))
        .route("/graph/run", post(run_graph))
        .route("/graph/state/{run_id}", get(get_state))
        .route("/graph/nodes", get(list_nodes))
        .route("/graph/list", get(list_graphs))
}

/// Register a new graph
///
/// POST /graph/create
/// Body: { "nodes": [...], "edges": { "a": "b" | ["b", "c"] }, "start_node": "a" }
async fn create_graph(
    AxumState(state): AxumState<AppState>,
    Json(payload): Json<CreateGraphRequest>,
) -> Result<Json<CreateGraphResponse>, ApiError> {
    let graph_id = state
        .engine
        .register_graph(
            payload.nodes,
            payload.edges,
            payload.start_node,
            payload.description,
        )
        .await
        .map_err(error_response)?;

    Ok(Json(CreateGraphResponse { graph_id }))
}

/// Run a graph to completion
///
/// POST /graph/run
/// Body: { "graph_id": "...", "initial_state": { ... } }
async fn run_graph(
    AxumState(state): AxumState<AppState>,
    Json(payload): Json<RunGraphRequest>,
) -> Result<Json<RunGraphResponse>, ApiError> {
    tracing::info!("Run requested for graph {}", payload.graph_id);

    let run = state
        .engine
        .run_graph(&payload.graph_id, payload.initial_state)
        .await
        .map_err(error_response)?;

    Ok(Json(RunGraphResponse {
        run_id: run.run_id,
        final_state: run.current_state,
        logs: run.logs,
    }))
}

/// Inspect a run
///
/// GET /graph/state/{run_id}
async fn get_state(
    AxumState(state): AxumState<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunRecord>, ApiError> {
    state
        .engine
        .get_run(&run_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /graph/nodes
async fn list_nodes(AxumState(state): AxumState<AppState>) -> Json<Value> {
    Json(json!({
        "available_nodes": state.engine.list_nodes(),
        "tools": state.engine.tools().list_tools(),
    }))
}

/// GET /graph/list
async fn list_graphs(AxumState(state): AxumState<AppState>) -> Json<Value> {
    let graphs = state.engine.describe_graphs().await;
    Json(json!({ "graphs": graphs }))
}

fn error_response(err: EngineError) -> ApiError {
    let status = match &err {
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Graph execution failed: {}", err);
    } else {
        tracing::warn!("Request rejected ({}): {}", status, err);
    }

    (status, Json(json!({ "detail": err.to_string() })))
}
