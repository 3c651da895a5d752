/// Node function contract and adapters
///
/// A node receives the current state and the tool registry and produces the
/// successor state plus optional routing. Nodes may return a full `NodeResult`
/// or just a raw JSON value; raw values are normalised once, at the invocation
/// boundary, so the step loop only ever deals with `NodeResult`.

use crate::workflow::{
    error::EngineError,
    tools::ToolRegistry,
    types::{NodeResult, State},
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, fmt, future::Future, marker::PhantomData, sync::Arc};

/// What a node function hands back before normalisation
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    /// Full result with optional routing and log line
    Result(NodeResult),
    /// Bare value; must be a JSON object to be accepted as the successor state
    Raw(Value),
}

impl NodeOutput {
    /// Normalise into a `NodeResult` or report a contract violation for `node`
    pub fn into_result(self, node: &str) -> Result<NodeResult, EngineError> {
        match self {
            NodeOutput::Result(result) => Ok(result),
            NodeOutput::Raw(Value::Object(state)) => Ok(NodeResult::new(state)),
            NodeOutput::Raw(other) => Err(EngineError::ContractViolation {
                node: node.to_string(),
                found: json_kind(&other),
            }),
        }
    }
}

impl From<NodeResult> for NodeOutput {
    fn from(result: NodeResult) -> Self {
        NodeOutput::Result(result)
    }
}

impl From<State> for NodeOutput {
    fn from(state: State) -> Self {
        NodeOutput::Raw(Value::Object(state))
    }
}

impl From<Value> for NodeOutput {
    fn from(value: Value) -> Self {
        NodeOutput::Raw(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A unit of work the engine can invoke by name
///
/// Implementations may suspend; the engine awaits each call before moving on,
/// so steps of one run are strictly sequential.
#[async_trait]
pub trait NodeFunction: Send + Sync {
    async fn call(&self, state: State, tools: &ToolRegistry) -> Result<NodeOutput>;
}

/// Adapter for synchronous node functions
pub struct FnNode<F, O> {
    f: F,
    _output: PhantomData<fn() -> O>,
}

#[async_trait]
impl<F, O> NodeFunction for FnNode<F, O>
where
    F: Fn(State, &ToolRegistry) -> Result<O> + Send + Sync,
    O: Into<NodeOutput>,
{
    async fn call(&self, state: State, tools: &ToolRegistry) -> Result<NodeOutput> {
        (self.f)(state, tools).map(Into::into)
    }
}

/// Wrap a plain function `(state, &tools) -> Result<impl Into<NodeOutput>>`
pub fn node_fn<F, O>(f: F) -> FnNode<F, O>
where
    F: Fn(State, &ToolRegistry) -> Result<O> + Send + Sync,
    O: Into<NodeOutput>,
{
    FnNode {
        f,
        _output: PhantomData,
    }
}

/// Adapter for node functions that return a future
pub struct AsyncFnNode<F, Fut> {
    f: F,
    _future: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut, O> NodeFunction for AsyncFnNode<F, Fut>
where
    F: Fn(State, ToolRegistry) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send,
    O: Into<NodeOutput>,
{
    async fn call(&self, state: State, tools: &ToolRegistry) -> Result<NodeOutput> {
        (self.f)(state, tools.clone()).await.map(Into::into)
    }
}

/// Wrap an async function `(state, tools) -> impl Future<Output = Result<impl Into<NodeOutput>>>`
///
/// The registry handle is cloned into the call so the future can own it.
pub fn async_node_fn<F, Fut, O>(f: F) -> AsyncFnNode<F, Fut>
where
    F: Fn(State, ToolRegistry) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send,
    O: Into<NodeOutput>,
{
    AsyncFnNode {
        f,
        _future: PhantomData,
    }
}

/// Immutable name → node function mapping supplied to the engine at construction
#[derive(Clone, Default)]
pub struct NodeLibrary {
    nodes: HashMap<String, Arc<dyn NodeFunction>>,
}

impl NodeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion; a repeated name replaces the earlier node
    pub fn with(mut self, name: impl Into<String>, node: impl NodeFunction + 'static) -> Self {
        self.nodes.insert(name.into(), Arc::new(node));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn NodeFunction>> {
        self.nodes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Sorted node names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Debug for NodeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeLibrary")
            .field("nodes", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state_with(key: &str, value: Value) -> State {
        let mut state = State::new();
        state.insert(key.to_string(), value);
        state
    }

    #[tokio::test]
    async fn test_raw_object_becomes_node_result() {
        let node = node_fn(|mut state: State, _: &ToolRegistry| {
            state.insert("seen".to_string(), json!(true));
            Ok(state)
        });

        let output = node.call(State::new(), &ToolRegistry::new()).await.unwrap();
        let result = output.into_result("n").unwrap();
        assert_eq!(result.state, state_with("seen", json!(true)));
        assert_eq!(result.next_node, None);
        assert_eq!(result.log, None);
    }

    #[tokio::test]
    async fn test_non_object_is_contract_violation() {
        let node = node_fn(|_: State, _: &ToolRegistry| Ok(json!(7)));

        let output = node.call(State::new(), &ToolRegistry::new()).await.unwrap();
        let err = output.into_result("bad").unwrap_err();
        assert!(matches!(
            err,
            EngineError::ContractViolation { ref node, found: "a number" } if node == "bad"
        ));
    }

    #[tokio::test]
    async fn test_async_node_can_use_tools() {
        let tools = ToolRegistry::new();
        tools.register("echo", |v| Ok(v));

        let node = async_node_fn(|_state: State, tools: ToolRegistry| async move {
            tokio::task::yield_now().await;
            let echoed = tools.call("echo", json!("hi"))?;
            Ok::<_, anyhow::Error>(NodeResult::new(state_with("echo", echoed)).with_log("echoed"))
        });

        let result = node
            .call(State::new(), &tools)
            .await
            .unwrap()
            .into_result("echo")
            .unwrap();
        assert_eq!(result.state, state_with("echo", json!("hi")));
        assert_eq!(result.log.as_deref(), Some("echoed"));
    }

    #[tokio::test]
    async fn test_node_body_error_propagates() {
        let node = node_fn(|_: State, tools: &ToolRegistry| {
            tools.call("missing", Value::Null)?;
            Ok(State::new())
        });

        let err = node.call(State::new(), &ToolRegistry::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool 'missing' is not registered");
    }

    #[test]
    fn test_library_names_are_sorted() {
        let library = NodeLibrary::new()
            .with("b", node_fn(|s: State, _: &ToolRegistry| Ok(s)))
            .with("a", node_fn(|s: State, _: &ToolRegistry| Ok(s)));

        assert_eq!(library.names(), vec!["a".to_string(), "b".to_string()]);
        assert!(library.contains("a"));
        assert!(!library.contains("c"));
        assert_eq!(library.len(), 2);
    }
}
