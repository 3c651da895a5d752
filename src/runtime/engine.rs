/// In-memory graph engine
///
/// Owns every registered graph and every run record. A single mutex guards
/// both tables and is held only for registration, run creation and the final
/// publish of a run's outcome. The step loop itself runs in its own tokio task
/// outside the lock, so a slow run never blocks registration or inspection.

use crate::runtime::executor::{ExecutionResult, GraphExecutor};
use crate::workflow::{
    error::{EngineError, ValidationError},
    node::NodeLibrary,
    tools::ToolRegistry,
    types::{EdgeTarget, GraphDefinition, GraphSummary, RunRecord, State},
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

/// Shared tables guarded by the engine lock
#[derive(Debug, Default)]
struct Tables {
    /// Key: graph_id, Value: immutable definition shared with running tasks
    graphs: HashMap<String, Arc<GraphDefinition>>,
    /// Graph ids in registration order
    graph_order: Vec<String>,
    /// Key: run_id, Value: latest published record
    runs: HashMap<String, RunRecord>,
}

/// Registration, execution and inspection of graphs
///
/// Cloning is cheap; all clones share the same tables, node library and tools.
#[derive(Debug, Clone)]
pub struct GraphEngine {
    tables: Arc<Mutex<Tables>>,
    node_library: Arc<NodeLibrary>,
    tools: ToolRegistry,
    executor: GraphExecutor,
}

impl GraphEngine {
    /// Create an engine over an injected node library and tool registry
    pub fn new(node_library: NodeLibrary, tools: ToolRegistry) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            node_library: Arc::new(node_library),
            executor: GraphExecutor::new(tools.clone()),
            tools,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Validate and store a new graph, returning its fresh id
    ///
    /// Every node name must resolve in the node library and the start node
    /// must be one of them. Nothing is stored when validation fails.
    pub async fn register_graph<N, E, K, V>(
        &self,
        nodes: N,
        edges: E,
        start_node: impl Into<String>,
        description: Option<String>,
    ) -> Result<String, EngineError>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        E: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<EdgeTarget>,
    {
        let requested: Vec<String> = nodes.into_iter().map(Into::into).collect();
        let start_node = start_node.into();

        let mut tables = self.tables.lock().await;

        let mut node_map = HashMap::new();
        let mut node_names = Vec::new();
        for name in requested {
            let node = self.node_library.get(&name).ok_or_else(|| {
                ValidationError::UnknownNode {
                    name: name.clone(),
                    available: self.node_library.names(),
                }
            })?;
            if node_map.insert(name.clone(), node).is_none() {
                node_names.push(name);
            }
        }

        if !node_map.contains_key(&start_node) {
            return Err(ValidationError::StartNodeMissing { start_node }.into());
        }

        let edges = edges
            .into_iter()
            .map(|(from, to)| {
                let target: EdgeTarget = to.into();
                (from.into(), target.into_vec())
            })
            .collect();

        let graph_id = Uuid::new_v4().to_string();
        let graph = GraphDefinition {
            graph_id: graph_id.clone(),
            nodes: node_map,
            node_names,
            edges,
            start_node,
            description,
        };

        tracing::info!(
            "📊 Registered graph {} with {} nodes (start: {})",
            graph_id,
            graph.node_names.len(),
            graph.start_node
        );

        tables.graphs.insert(graph_id.clone(), Arc::new(graph));
        tables.graph_order.push(graph_id.clone());

        Ok(graph_id)
    }

    /// Execute a registered graph against `initial_state`
    ///
    /// The record is published as `running` before the first node executes and
    /// is finalised exactly once. On failure the record keeps the error and the
    /// same error is returned here. Execution continues to completion even if
    /// the caller stops awaiting this future.
    pub async fn run_graph(&self, graph_id: &str, initial_state: State) -> Result<RunRecord, EngineError> {
        let (graph, run) = {
            let mut tables = self.tables.lock().await;
            let graph = tables
                .graphs
                .get(graph_id)
                .cloned()
                .ok_or_else(|| EngineError::GraphNotFound(graph_id.to_string()))?;

            let run = RunRecord::start(
                Uuid::new_v4().to_string(),
                graph_id.to_string(),
                initial_state.clone(),
            );
            tables.runs.insert(run.run_id.clone(), run.clone());
            (graph, run)
        };

        let span = tracing::info_span!("run", run_id = %run.run_id, graph_id = %graph.graph_id);
        let run_id = run.run_id.clone();
        let engine = self.clone();

        let task = tokio::spawn(
            async move {
                tracing::info!("🚀 Starting run from node '{}'", graph.start_node);
                let started = std::time::Instant::now();

                let executor = engine.executor.clone();
                let step_loop = tokio::spawn(
                    async move { executor.execute(&graph, initial_state).await }.in_current_span(),
                );
                let outcome = match step_loop.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(EngineError::Panicked(join_error_message(e))),
                };

                match &outcome {
                    Ok(result) => tracing::info!(
                        "🎉 Run completed after {} steps in {:?}",
                        result.logs.len(),
                        started.elapsed()
                    ),
                    Err(e) => tracing::error!("❌ Run failed after {:?}: {}", started.elapsed(), e),
                }

                engine.finalize(run, outcome).await
            }
            .instrument(span),
        );

        match task.await {
            Ok(result) => result,
            Err(e) => {
                let err = EngineError::Panicked(join_error_message(e));
                self.mark_failed(&run_id, &err).await;
                Err(err)
            }
        }
    }

    /// Publish the terminal record for a run
    async fn finalize(
        &self,
        run: RunRecord,
        outcome: Result<ExecutionResult, EngineError>,
    ) -> Result<RunRecord, EngineError> {
        let (record, result) = match outcome {
            Ok(execution) => {
                let record = run.completed(execution.state, execution.logs);
                (record.clone(), Ok(record))
            }
            Err(e) => (run.failed(e.to_string()), Err(e)),
        };

        let mut tables = self.tables.lock().await;
        tables.runs.insert(record.run_id.clone(), record);
        result
    }

    /// Fallback used when the finalising task itself was lost
    async fn mark_failed(&self, run_id: &str, err: &EngineError) {
        let mut tables = self.tables.lock().await;
        if let Some(run) = tables.runs.get(run_id) {
            if !run.status.is_terminal() {
                let failed = run.failed(err.to_string());
                tables.runs.insert(run_id.to_string(), failed);
            }
        }
    }

    /// Current snapshot of a run (may still be running)
    pub async fn get_run(&self, run_id: &str) -> Result<RunRecord, EngineError> {
        self.tables
            .lock()
            .await
            .runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))
    }

    /// Graph ids in registration order
    pub async fn list_graphs(&self) -> Vec<String> {
        self.tables.lock().await.graph_order.clone()
    }

    /// Sorted node library names
    pub fn list_nodes(&self) -> Vec<String> {
        self.node_library.names()
    }

    /// Summaries of every registered graph, in registration order
    pub async fn describe_graphs(&self) -> Vec<GraphSummary> {
        let tables = self.tables.lock().await;
        tables
            .graph_order
            .iter()
            .filter_map(|id| tables.graphs.get(id))
            .map(|graph| graph.summary())
            .collect()
    }

    /// Ids of every run the engine has seen
    pub async fn list_runs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tables.lock().await.runs.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{
        node::{async_node_fn, node_fn},
        types::{NodeResult, RunStatus},
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn passthrough() -> impl crate::workflow::NodeFunction {
        node_fn(|state: State, _: &ToolRegistry| Ok(state))
    }

    fn library() -> NodeLibrary {
        NodeLibrary::new().with("a", passthrough()).with("b", passthrough())
    }

    fn no_edges() -> Vec<(String, EdgeTarget)> {
        Vec::new()
    }

    #[tokio::test]
    async fn test_unknown_node_is_rejected_without_storing() {
        let engine = GraphEngine::new(library(), ToolRegistry::new());

        let err = engine
            .register_graph(["a", "zzz"], no_edges(), "a", None)
            .await
            .unwrap_err();

        match err {
            EngineError::Validation(ValidationError::UnknownNode { name, available }) => {
                assert_eq!(name, "zzz");
                assert_eq!(available, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(engine.list_graphs().await.is_empty());
    }

    #[tokio::test]
    async fn test_start_node_must_be_in_nodes() {
        let engine = GraphEngine::new(library(), ToolRegistry::new());

        let err = engine
            .register_graph(["a"], no_edges(), "b", None)
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(engine.describe_graphs().await.is_empty());
    }

    #[tokio::test]
    async fn test_describe_graphs_keeps_registration_order() {
        let engine = GraphEngine::new(library(), ToolRegistry::new());
        let first = engine
            .register_graph(["a", "b"], [("a", "b")], "a", Some("first".to_string()))
            .await
            .unwrap();
        let second = engine
            .register_graph(["b"], no_edges(), "b", None)
            .await
            .unwrap();

        assert_eq!(engine.list_graphs().await, vec![first.clone(), second]);
        let described = engine.describe_graphs().await;
        assert_eq!(described[0].graph_id, first);
        assert_eq!(described[0].nodes, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(described[0].description.as_deref(), Some("first"));
        assert_eq!(engine.list_nodes(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_graph_and_run() {
        let engine = GraphEngine::new(library(), ToolRegistry::new());

        let err = engine.run_graph("missing", State::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::GraphNotFound(ref id) if id == "missing"));
        assert!(engine.get_run("missing").await.unwrap_err().is_not_found());
        assert!(engine.list_runs().await.is_empty());
    }

    #[tokio::test]
    async fn test_completed_run_is_published() {
        let engine = GraphEngine::new(library(), ToolRegistry::new());
        let graph_id = engine
            .register_graph(["a", "b"], [("a", "b")], "a", None)
            .await
            .unwrap();

        let mut initial = State::new();
        initial.insert("x".to_string(), json!(1));
        let run = engine.run_graph(&graph_id, initial.clone()).await.unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.current_state, initial);
        assert_eq!(run.logs.len(), 2);
        assert!(run.finished_at.is_some());
        assert_eq!(engine.get_run(&run.run_id).await.unwrap(), run);
    }

    #[tokio::test]
    async fn test_running_record_is_opaque_until_finished() {
        let gate = Arc::new(Notify::new());
        let waiting = Arc::clone(&gate);
        let library = NodeLibrary::new().with(
            "wait",
            async_node_fn(move |mut state: State, _: ToolRegistry| {
                let gate = Arc::clone(&waiting);
                async move {
                    gate.notified().await;
                    state.insert("done".to_string(), json!(true));
                    Ok::<_, anyhow::Error>(NodeResult::new(state).with_log("released"))
                }
            }),
        );
        let engine = GraphEngine::new(library, ToolRegistry::new());
        let graph_id = engine
            .register_graph(["wait"], no_edges(), "wait", None)
            .await
            .unwrap();

        let runner = engine.clone();
        let handle = tokio::spawn(async move { runner.run_graph(&graph_id, State::new()).await });

        let run_id = loop {
            if let Some(id) = engine.list_runs().await.pop() {
                break id;
            }
            tokio::task::yield_now().await;
        };

        let running = engine.get_run(&run_id).await.unwrap();
        assert_eq!(running.status, RunStatus::Running);
        assert!(running.logs.is_empty());
        assert!(running.current_state.is_empty());
        assert_eq!(running.current_node, None);

        gate.notify_one();
        let finished = handle.await.unwrap().unwrap();
        assert_eq!(finished.status, RunStatus::Completed);
        assert_eq!(finished.current_state["done"], json!(true));
        assert_eq!(engine.get_run(&run_id).await.unwrap().status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_run_finishes_after_caller_gives_up() {
        let library = NodeLibrary::new().with(
            "slow",
            async_node_fn(|state: State, _: ToolRegistry| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, anyhow::Error>(state)
            }),
        );
        let engine = GraphEngine::new(library, ToolRegistry::new());
        let graph_id = engine
            .register_graph(["slow"], no_edges(), "slow", None)
            .await
            .unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(5), engine.run_graph(&graph_id, State::new()))
                .await;
        assert!(timed_out.is_err());

        let run_id = engine.list_runs().await.pop().unwrap();
        let mut status = engine.get_run(&run_id).await.unwrap().status;
        for _ in 0..100 {
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = engine.get_run(&run_id).await.unwrap().status;
        }
        assert_eq!(status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_panicking_node_fails_the_run() {
        let library = NodeLibrary::new().with(
            "explode",
            node_fn(|_: State, _: &ToolRegistry| -> anyhow::Result<Value> {
                panic!("kaboom")
            }),
        );
        let engine = GraphEngine::new(library, ToolRegistry::new());
        let graph_id = engine
            .register_graph(["explode"], no_edges(), "explode", None)
            .await
            .unwrap();

        let err = engine.run_graph(&graph_id, State::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Panicked(ref msg) if msg == "kaboom"));

        let run_id = engine.list_runs().await.pop().unwrap();
        let run = engine.get_run(&run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("Node execution panicked: kaboom"));
    }
}
