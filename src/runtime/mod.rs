/// Runtime Execution Engine
///
/// This module provides the in-memory graph engine. It handles:
/// - Graph registration against the node library
/// - Run record bookkeeping behind a single lock
/// - The node-by-node step loop, one tokio task per run

// Graph and run tables, registration and run lifecycle
pub mod engine;

// Step loop for a single run
pub mod executor;

// Re-export main types
pub use engine::GraphEngine;
pub use executor::{ExecutionResult, GraphExecutor};
