/// Configuration management for the workgraph engine
///
/// Handles server configuration and engine startup behaviour.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Engine startup configuration
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Engine startup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Register the code review graph at startup when no graph exists yet
    pub bootstrap_default_graph: bool,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("WORKGRAPH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("WORKGRAPH_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .unwrap_or(8000),
            },
            engine: EngineConfig {
                bootstrap_default_graph: std::env::var("WORKGRAPH_BOOTSTRAP")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(true),
            },
        }
    }
}

impl Config {
    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
