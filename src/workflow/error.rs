/// Error taxonomy for graph registration and execution
///
/// Registration failures are `ValidationError`s and never leave a partially
/// registered graph behind. Execution failures are reported twice: the run
/// record is marked failed with the message, and the same error is returned
/// to the caller of `run_graph`.

use thiserror::Error;

/// Registration-time validation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A requested node name does not resolve in the node library
    #[error("Unknown node '{name}'. Available: {available:?}")]
    UnknownNode { name: String, available: Vec<String> },

    /// The start node is not among the graph's nodes
    #[error("Start node '{start_node}' must be in nodes list")]
    StartNodeMissing { start_node: String },
}

/// Tool registry lookup failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool '{0}' is not registered")]
    NotFound(String),
}

/// Errors surfaced by the graph engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Graph '{0}' not found")]
    GraphNotFound(String),

    #[error("Run '{0}' not found")]
    RunNotFound(String),

    /// A node with several static successors finished without choosing one
    #[error("Node '{node}' has multiple edges but no next_node provided by the node logic")]
    AmbiguousEdge { node: String },

    /// A node returned something that is neither a NodeResult nor a state mapping
    #[error("Node '{node}' must return a NodeResult or a state mapping, got {found}")]
    ContractViolation { node: String, found: &'static str },

    /// Execution was routed to a name that is not part of the graph
    #[error("Node '{node}' is not part of graph '{graph_id}'")]
    NodeNotInGraph { node: String, graph_id: String },

    /// Failure raised by a node body, passed through untouched
    #[error("{0}")]
    Node(#[source] anyhow::Error),

    #[error("Node execution panicked: {0}")]
    Panicked(String),
}

impl EngineError {
    /// True for errors raised before any graph was stored
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    /// True for unknown graph or run identifiers
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::GraphNotFound(_) | EngineError::RunNotFound(_))
    }
}
