use std::path::Path;
use crate::errors::CyberHuntError;
use super::types::{CyberHuntConfig, LOG_LEVELS, MAX_EVENT_BUFFER};
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<CyberHuntConfig, CyberHuntError> {
    if !path.exists() {
        return Err(CyberHuntError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(CyberHuntError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

/// Parse and validate configuration from YAML text.
pub fn parse_config_str(content: &str) -> Result<CyberHuntConfig, CyberHuntError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| CyberHuntError::Config(format!("Invalid YAML: {}", e)))?;

    // An empty file means all defaults
    if yaml.is_null() {
        return Ok(CyberHuntConfig::default());
    }

    validate_schema(&yaml)?;

    let config: CyberHuntConfig = serde_yaml::from_value(yaml)
        .map_err(|e| CyberHuntError::Config(format!("Invalid config: {}", e)))?;

    validate_semantics(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), CyberHuntError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| CyberHuntError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| CyberHuntError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        // Advisory: typed parsing and the semantic checks decide
        for e in errors {
            warn!(validation_error = %e, path = %e.instance_path, "Config schema warning");
        }
    }

    Ok(())
}

/// Reject values that parse but cannot work.
pub fn validate_semantics(config: &CyberHuntConfig) -> Result<(), CyberHuntError> {
    if config.server.port == 0 {
        return Err(CyberHuntError::Config("server.port must not be 0".into()));
    }
    if config.server.host.trim().is_empty() {
        return Err(CyberHuntError::Config("server.host must not be empty".into()));
    }
    if let Some(token) = &config.server.api_token {
        if token.trim().is_empty() {
            return Err(CyberHuntError::Config(
                "server.api_token is set but empty; remove it to disable auth".into(),
            ));
        }
    }
    if config.database.path.trim().is_empty() {
        return Err(CyberHuntError::Config("database.path must not be empty".into()));
    }
    if config.workflow.default_max_assignments == 0 {
        return Err(CyberHuntError::Config(
            "workflow.default_max_assignments must be positive".into(),
        ));
    }
    if config.workflow.max_comment_length == 0 {
        return Err(CyberHuntError::Config("workflow.max_comment_length must be positive".into()));
    }
    if config.workflow.event_buffer == 0 || config.workflow.event_buffer > MAX_EVENT_BUFFER {
        return Err(CyberHuntError::Config(format!(
            "workflow.event_buffer must be between 1 and {}",
            MAX_EVENT_BUFFER
        )));
    }
    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        return Err(CyberHuntError::Config(format!(
            "Unknown log level '{}', expected one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.server.api_token.is_none() && config.server.host != "127.0.0.1" && config.server.host != "localhost" {
        warn!(host = %config.server.host, "API exposed beyond localhost without an api_token");
    }

    Ok(())
}
