/// Graph Definition Layer
///
/// This module holds everything a graph is made of:
/// - Type definitions (state, node results, graph definitions, run records)
/// - The node function contract and its adapters
/// - The lock-free tool registry nodes call into
/// - The error taxonomy shared with the runtime

// Core type definitions
pub mod types;

// Node function contract, adapters and node library
pub mod node;

// Tool registry using ArcSwap
pub mod tools;

// Registration and execution errors
pub mod error;

// Re-export commonly used types
pub use error::{EngineError, ToolError, ValidationError};
pub use node::{async_node_fn, node_fn, NodeFunction, NodeLibrary, NodeOutput};
pub use tools::{Tool, ToolRegistry};
pub use types::{
    EdgeTarget, GraphDefinition, GraphSummary, LogEntry, NodeResult, RunRecord, RunStatus, State,
};
