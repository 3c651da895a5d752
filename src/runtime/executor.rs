/// Step loop for a single run
///
/// Walks a graph node by node, threading the state through each node and
/// deciding the successor from the node's own routing or the static edges.
/// The loop owns its state; it never touches the engine's shared tables.

use crate::workflow::{
    error::EngineError,
    tools::ToolRegistry,
    types::{GraphDefinition, LogEntry, NodeResult, State},
};

/// Final state and per-step logs of a finished run
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub state: State,
    pub logs: Vec<LogEntry>,
}

/// Executes graphs against the shared tool registry
#[derive(Debug, Clone)]
pub struct GraphExecutor {
    tools: ToolRegistry,
}

impl GraphExecutor {
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    /// Run `graph` from its start node until no successor is determined
    ///
    /// There is no iteration bound: a graph whose nodes keep redirecting
    /// runs forever. Termination belongs to node logic.
    pub async fn execute(
        &self,
        graph: &GraphDefinition,
        initial_state: State,
    ) -> Result<ExecutionResult, EngineError> {
        let mut logs = Vec::new();
        let mut current_state = initial_state;
        let mut current_node = Some(graph.start_node.clone());

        while let Some(node_name) = current_node.take() {
            let result = self.run_node(graph, &node_name, current_state).await?;

            tracing::debug!(
                "📍 Step {}: node '{}' -> {}",
                logs.len() + 1,
                node_name,
                result.log.as_deref().unwrap_or("(no log)")
            );

            logs.push(LogEntry {
                node: node_name.clone(),
                log: result.log.clone(),
                state_snapshot: result.state.clone(),
            });
            current_state = result.state;

            current_node = match result.next_node {
                Some(next) => Some(next),
                None => next_static(graph, &node_name)?,
            };
        }

        Ok(ExecutionResult {
            state: current_state,
            logs,
        })
    }

    /// Invoke one node and normalise its output
    async fn run_node(
        &self,
        graph: &GraphDefinition,
        node_name: &str,
        state: State,
    ) -> Result<NodeResult, EngineError> {
        let node = graph
            .nodes
            .get(node_name)
            .ok_or_else(|| EngineError::NodeNotInGraph {
                node: node_name.to_string(),
                graph_id: graph.graph_id.clone(),
            })?;

        let output = node.call(state, &self.tools).await.map_err(|e| {
            tracing::warn!("⚠️ Node '{}' failed: {}", node_name, e);
            EngineError::Node(e)
        })?;

        output.into_result(node_name)
    }
}

/// Successor from the static edge list, used when the node chose none
fn next_static(graph: &GraphDefinition, node_name: &str) -> Result<Option<String>, EngineError> {
    match graph.edges.get(node_name).map(Vec::as_slice) {
        None | Some([]) => Ok(None),
        Some([next]) => Ok(Some(next.clone())),
        Some(_) => Err(EngineError::AmbiguousEdge {
            node: node_name.to_string(),
        }),
    }
}
