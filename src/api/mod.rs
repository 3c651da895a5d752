/// HTTP API Layer
///
/// This module exposes the engine over REST. It handles:
/// - Graph registration and listing
/// - Synchronous graph runs
/// - Run inspection

// Graph management and execution endpoints
pub mod graphs;

// Re-export router builder and shared state
pub use graphs::{create_graph_routes, AppState};
