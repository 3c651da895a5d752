/// Code review workflow
///
/// A small node library that scores a piece of source code:
/// extract function names, estimate complexity, detect smells through the
/// `detect_smells` tool, suggest improvements and gate on a quality score.
/// `check_quality` loops back to `suggest_improvements` until the score
/// reaches the threshold or the iteration cap is hit.

use crate::runtime::GraphEngine;
use crate::workflow::{
    error::EngineError,
    node::{node_fn, NodeLibrary},
    tools::ToolRegistry,
    types::{NodeResult, State},
};
use anyhow::Result;
use regex::Regex;
use serde_json::{json, Value};

/// Name of the smell detection tool the `detect_issues` node calls
pub const DETECT_SMELLS: &str = "detect_smells";

const FUNCTION_PATTERN: &str = r"def\s+([a-zA-Z_][a-zA-Z0-9_]*)";
const LONG_LINE: usize = 120;
const DEFAULT_THRESHOLD: f64 = 0.7;
const DEFAULT_MAX_ITERATIONS: i64 = 3;

/// Node library for the code review workflow
pub fn node_library() -> NodeLibrary {
    NodeLibrary::new()
        .with("extract_functions", node_fn(extract_functions))
        .with("check_complexity", node_fn(check_complexity))
        .with("detect_issues", node_fn(detect_issues))
        .with("suggest_improvements", node_fn(suggest_improvements))
        .with("check_quality", node_fn(check_quality))
}

/// Register the tools the code review nodes depend on
pub fn register_tools(tools: &ToolRegistry) {
    tools.register(DETECT_SMELLS, detect_smells);
}

/// Return the first registered graph, registering the default review loop if none exist
pub async fn ensure_default_graph(engine: &GraphEngine) -> Result<String, EngineError> {
    if let Some(graph_id) = engine.list_graphs().await.into_iter().next() {
        return Ok(graph_id);
    }

    let nodes = [
        "extract_functions",
        "check_complexity",
        "detect_issues",
        "suggest_improvements",
        "check_quality",
    ];
    let edges: [(&str, Vec<&str>); 5] = [
        ("extract_functions", vec!["check_complexity"]),
        ("check_complexity", vec!["detect_issues"]),
        ("detect_issues", vec!["suggest_improvements"]),
        ("suggest_improvements", vec!["check_quality"]),
        ("check_quality", vec![]),
    ];

    engine
        .register_graph(
            nodes,
            edges,
            "extract_functions",
            Some("Code review loop".to_string()),
        )
        .await
}

/// Heuristic smell detector: counts over-long lines and TODO markers
pub fn detect_smells(code: Value) -> Result<Value> {
    let Some(code) = code.as_str() else {
        anyhow::bail!("{} expects a string argument", DETECT_SMELLS);
    };

    let long_lines = code.lines().filter(|line| line.chars().count() > LONG_LINE).count();
    let todos = code.lines().filter(|line| line.contains("TODO")).count();

    Ok(json!({
        "issues": long_lines + todos,
        "long_lines": long_lines,
        "todos": todos,
    }))
}

fn extract_functions(mut state: State, _tools: &ToolRegistry) -> Result<NodeResult> {
    let pattern = Regex::new(FUNCTION_PATTERN)?;
    let code = state.get("code").and_then(Value::as_str).unwrap_or_default();

    let functions: Vec<String> = pattern
        .captures_iter(code)
        .map(|caps| caps[1].to_string())
        .collect();
    let count = functions.len();

    state.insert("functions".to_string(), json!(functions));
    state.insert("function_count".to_string(), json!(count));
    Ok(NodeResult::new(state).with_log(format!("Found {} functions", count)))
}

fn check_complexity(mut state: State, _tools: &ToolRegistry) -> Result<NodeResult> {
    let names: Vec<&str> = state
        .get("functions")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let score = if names.is_empty() {
        0.1
    } else {
        let total: f64 = names
            .iter()
            .map(|name| (name.chars().count() as f64 / 10.0).clamp(0.1, 1.0))
            .sum();
        round2(total / names.len() as f64)
    };

    state.insert("complexity_score".to_string(), json!(score));
    Ok(NodeResult::new(state).with_log(format!("Complexity score: {}", score)))
}

fn detect_issues(mut state: State, tools: &ToolRegistry) -> Result<NodeResult> {
    let code = state.get("code").and_then(Value::as_str).unwrap_or_default().to_string();
    let issues = tools.call(DETECT_SMELLS, Value::String(code))?;
    let count = issue_count(&issues);

    state.insert("issues".to_string(), issues);
    Ok(NodeResult::new(state).with_log(format!("Issues detected: {}", count)))
}

fn suggest_improvements(mut state: State, _tools: &ToolRegistry) -> Result<NodeResult> {
    let complexity = number(&state, "complexity_score").unwrap_or(0.0);
    let issues = state.get("issues").map(issue_count).unwrap_or(0);

    let mut suggestions = Vec::new();
    if complexity > 0.7 {
        suggestions.push("Reduce branching or split large functions.");
    }
    if issues > 0 {
        suggestions.push("Address flagged code smells.");
    }
    if suggestions.is_empty() {
        suggestions.push("Looks good, minor refactors only.");
    }
    let added = suggestions.len();

    let existing = state
        .entry("suggestions")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !existing.is_array() {
        *existing = Value::Array(Vec::new());
    }
    if let Value::Array(items) = existing {
        items.extend(suggestions.into_iter().map(|s| json!(s)));
    }

    Ok(NodeResult::new(state).with_log(format!("Added {} suggestions", added)))
}

fn check_quality(mut state: State, _tools: &ToolRegistry) -> Result<NodeResult> {
    let threshold = number(&state, "quality_threshold").unwrap_or(DEFAULT_THRESHOLD);
    let max_iterations = state
        .get("max_iterations")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_MAX_ITERATIONS);
    let iterations = state.get("iterations").and_then(Value::as_i64).unwrap_or(0) + 1;

    let issues = state.get("issues").map(issue_count).unwrap_or(0) as f64;
    let complexity = number(&state, "complexity_score").unwrap_or(0.0);
    let score = round2((1.0 - 0.2 * issues - 0.3 * complexity).max(0.0));

    state.insert("quality_score".to_string(), json!(score));
    state.insert("iterations".to_string(), json!(iterations));

    let log = format!("Quality score {} (iteration {})", score, iterations);
    if score >= threshold || iterations >= max_iterations {
        return Ok(NodeResult::new(state).with_log(format!("{} -> stop", log)));
    }
    Ok(NodeResult::new(state)
        .goto("suggest_improvements")
        .with_log(format!("{} -> continue", log)))
}

fn number(state: &State, key: &str) -> Option<f64> {
    state.get(key).and_then(Value::as_f64)
}

fn issue_count(issues: &Value) -> u64 {
    issues.get("issues").and_then(Value::as_u64).unwrap_or(0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            _ => panic!("test state must be an object"),
        }
    }

    #[test]
    fn test_detect_smells_counts_long_lines_and_todos() {
        let code = format!("x = 1\n# TODO: fix\n{}\n", "y".repeat(121));
        let report = detect_smells(json!(code)).unwrap();
        assert_eq!(report, json!({"issues": 2, "long_lines": 1, "todos": 1}));
    }

    #[test]
    fn test_detect_smells_rejects_non_strings() {
        assert!(detect_smells(json!(3)).is_err());
    }

    #[test]
    fn test_extract_functions_finds_definitions() {
        let input = state(json!({"code": "def alpha():\n    pass\n\ndef beta_two(x):\n    return x\n"}));
        let result = extract_functions(input, &ToolRegistry::new()).unwrap();

        assert_eq!(result.state["functions"], json!(["alpha", "beta_two"]));
        assert_eq!(result.state["function_count"], json!(2));
        assert_eq!(result.log.as_deref(), Some("Found 2 functions"));
    }

    #[test]
    fn test_check_complexity_averages_name_lengths() {
        // "ab" -> 0.2, "abcdefghijklmno" -> capped at 1.0
        let input = state(json!({"functions": ["ab", "abcdefghijklmno"]}));
        let result = check_complexity(input, &ToolRegistry::new()).unwrap();
        assert_eq!(result.state["complexity_score"], json!(0.6));

        let empty = check_complexity(State::new(), &ToolRegistry::new()).unwrap();
        assert_eq!(empty.state["complexity_score"], json!(0.1));
    }

    #[test]
    fn test_detect_issues_requires_tool() {
        let err = detect_issues(State::new(), &ToolRegistry::new()).unwrap_err();
        assert_eq!(err.to_string(), "Tool 'detect_smells' is not registered");
    }

    #[test]
    fn test_suggest_improvements_appends() {
        let input = state(json!({
            "complexity_score": 0.9,
            "issues": {"issues": 1},
            "suggestions": ["earlier"],
        }));
        let result = suggest_improvements(input, &ToolRegistry::new()).unwrap();
        assert_eq!(
            result.state["suggestions"],
            json!([
                "earlier",
                "Reduce branching or split large functions.",
                "Address flagged code smells."
            ])
        );
    }

    #[test]
    fn test_check_quality_loops_then_stops() {
        let input = state(json!({"issues": {"issues": 5}, "max_iterations": 2}));
        let first = check_quality(input, &ToolRegistry::new()).unwrap();
        assert_eq!(first.next_node.as_deref(), Some("suggest_improvements"));
        assert_eq!(first.state["quality_score"], json!(0.0));

        let second = check_quality(first.state, &ToolRegistry::new()).unwrap();
        assert_eq!(second.next_node, None);
        assert_eq!(second.state["iterations"], json!(2));
        assert!(second.log.unwrap().ends_with("-> stop"));
    }

    #[test]
    fn test_check_quality_stops_at_threshold() {
        let input = state(json!({"complexity_score": 0.1}));
        let result = check_quality(input, &ToolRegistry::new()).unwrap();
        assert_eq!(result.state["quality_score"], json!(0.97));
        assert_eq!(result.next_node, None);
    }
}
