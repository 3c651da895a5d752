/// Core graph type definitions
///
/// Defines the state mapping threaded through nodes, node results, graph
/// definitions and the run records the engine keeps for every invocation.
/// Records are serialised as JSON by the API layer.

use crate::workflow::node::NodeFunction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::HashMap, fmt, sync::Arc};

/// The mutable state threaded through a run (string keys, arbitrary JSON values)
pub type State = Map<String, Value>;

/// Output of a single node execution
///
/// `state` is the full successor state, not a diff. `next_node`, when set,
/// overrides the static edges of the node that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub state: State,
    pub next_node: Option<String>,
    pub log: Option<String>,
}

impl NodeResult {
    pub fn new(state: State) -> Self {
        Self {
            state,
            next_node: None,
            log: None,
        }
    }

    /// Route execution to `node` regardless of static edges
    pub fn goto(mut self, node: impl Into<String>) -> Self {
        self.next_node = Some(node.into());
        self
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = Some(log.into());
        self
    }
}

/// Static successor(s) of a node as supplied at registration
///
/// A single name is accepted for convenience and normalised to a one-element list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeTarget {
    One(String),
    Many(Vec<String>),
}

impl EdgeTarget {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            EdgeTarget::One(name) => vec![name],
            EdgeTarget::Many(names) => names,
        }
    }
}

impl From<&str> for EdgeTarget {
    fn from(name: &str) -> Self {
        EdgeTarget::One(name.to_string())
    }
}

impl From<String> for EdgeTarget {
    fn from(name: String) -> Self {
        EdgeTarget::One(name)
    }
}

impl From<Vec<String>> for EdgeTarget {
    fn from(names: Vec<String>) -> Self {
        EdgeTarget::Many(names)
    }
}

impl From<Vec<&str>> for EdgeTarget {
    fn from(names: Vec<&str>) -> Self {
        EdgeTarget::Many(names.into_iter().map(str::to_string).collect())
    }
}

/// An immutable, registered graph
///
/// Node functions are resolved from the node library at registration time,
/// so a definition never references a name the library lacks.
#[derive(Clone)]
pub struct GraphDefinition {
    pub graph_id: String,
    /// Key: node name, Value: node function
    pub nodes: HashMap<String, Arc<dyn NodeFunction>>,
    /// Node names in the order they were supplied
    pub node_names: Vec<String>,
    /// Normalised static edges: node name → ordered successors
    pub edges: HashMap<String, Vec<String>>,
    pub start_node: String,
    pub description: Option<String>,
}

impl GraphDefinition {
    /// Point-in-time summary used by listing endpoints
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            graph_id: self.graph_id.clone(),
            nodes: self.node_names.clone(),
            start_node: self.start_node.clone(),
            description: self.description.clone(),
        }
    }
}

impl fmt::Debug for GraphDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphDefinition")
            .field("graph_id", &self.graph_id)
            .field("nodes", &self.node_names)
            .field("edges", &self.edges)
            .field("start_node", &self.start_node)
            .field("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub graph_id: String,
    pub nodes: Vec<String>,
    pub start_node: String,
    pub description: Option<String>,
}

/// Lifecycle of a run: `Running` transitions exactly once to a terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// One entry per node execution, in execution order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub node: String,
    pub log: Option<String>,
    /// Full state after the node ran
    pub state_snapshot: State,
}

/// Execution record for one invocation of a graph
///
/// Owned by the engine; callers always receive copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub graph_id: String,
    pub current_state: State,
    pub status: RunStatus,
    pub logs: Vec<LogEntry>,
    pub current_node: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    /// Fresh record in `Running` status
    pub fn start(run_id: String, graph_id: String, initial_state: State) -> Self {
        Self {
            run_id,
            graph_id,
            current_state: initial_state,
            status: RunStatus::Running,
            logs: Vec::new(),
            current_node: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Successor record with final state and logs
    pub fn completed(&self, final_state: State, logs: Vec<LogEntry>) -> Self {
        Self {
            current_state: final_state,
            status: RunStatus::Completed,
            logs,
            current_node: None,
            finished_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    /// Successor record carrying the error; state stays at the last published snapshot
    pub fn failed(&self, error: String) -> Self {
        Self {
            status: RunStatus::Failed,
            error: Some(error),
            finished_at: Some(Utc::now()),
            ..self.clone()
        }
    }
}
