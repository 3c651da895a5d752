/// Tool registry using ArcSwap
///
/// Name → callable lookup that node functions use to reach side capabilities.
/// Registration clones the current map and swaps the pointer atomically, so
/// lookups from running nodes never take a lock and never see a half-written map.

use crate::workflow::error::ToolError;
use anyhow::Result;
use arc_swap::ArcSwap;
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

/// A registered tool: one JSON argument in, one JSON value out
pub type Tool = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Lock-free tool registry shared by every run
///
/// Cloning is cheap and all clones observe the same tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    /// Key: tool name, Value: callable
    tools: Arc<ArcSwap<HashMap<String, Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the tool for `name` (last write wins)
    pub fn register<F>(&self, name: impl Into<String>, tool: F)
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let tool: Tool = Arc::new(tool);
        self.tools.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(name.clone(), Arc::clone(&tool));
            next
        });
        tracing::debug!("Registered tool: {}", name);
    }

    /// Look up a tool by exact name
    pub fn get(&self, name: &str) -> Result<Tool, ToolError> {
        self.tools
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Look up and invoke a tool in one step
    pub fn call(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self.get(name)?;
        tool(args)
    }

    /// Sorted snapshot of registered tool names
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.load().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list_tools())
            .finish()
    }
}
