/// workgraph: minimal stateful graph workflow engine
///
/// Named node functions are wired into directed graphs; each run threads a
/// state mapping through the nodes until no successor is left. Nodes either
/// follow static edges or redirect execution themselves.

// Core configuration and setup
pub mod config;

// Graph definition layer - state, node contract, tool registry, errors
pub mod workflow;

// Runtime execution engine - graph/run tables and the step loop
pub mod runtime;

// Bundled node libraries
pub mod workflows;

// HTTP API layer - REST endpoints for graph registration, runs and inspection
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use runtime::GraphEngine;
pub use server::start_server;
pub use workflow::{
    async_node_fn, node_fn, EdgeTarget, EngineError, NodeFunction, NodeLibrary, NodeOutput,
    NodeResult, RunRecord, RunStatus, State, ToolRegistry, ValidationError,
};
