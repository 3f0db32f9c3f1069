use serde_json::{json, Value};
use std::sync::LazyLock;
use super::types::MAX_EVENT_BUFFER;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "server": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "host": { "type": "string" },
                    "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                    "api_token": { "type": ["string", "null"] }
                }
            },
            "database": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "path": { "type": "string" }
                }
            },
            "workflow": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "default_max_assignments": { "type": "integer", "minimum": 1 },
                    "max_comment_length": { "type": "integer", "minimum": 1 },
                    "event_buffer": { "type": "integer", "minimum": 1, "maximum": MAX_EVENT_BUFFER }
                }
            },
            "logging": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "level": { "type": "string", "enum": ["trace", "debug", "info", "warn", "error"] },
                    "json": { "type": "boolean" }
                }
            }
        }
    })
});
