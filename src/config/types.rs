use serde::{Deserialize, Serialize};

/// Top-level service configuration, read from YAML. Every section is
/// optional and falls back to its defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CyberHuntConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// When set, every API route except health requires this bearer token.
    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "cyberhunt.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Capacity given to reviewers created without an explicit limit.
    pub default_max_assignments: u32,
    /// Longest accepted comment, in characters.
    pub max_comment_length: usize,
    /// Events a slow subscriber may fall behind before it starts losing them.
    pub event_buffer: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_max_assignments: 5,
            max_comment_length: 10_000,
            event_buffer: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Largest event channel the server will allocate.
pub const MAX_EVENT_BUFFER: usize = 65_536;

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
