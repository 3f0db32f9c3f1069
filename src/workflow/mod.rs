pub mod assignment;
pub mod comments;
pub mod events;
pub mod finalizer;
pub mod reviews;
pub mod state_machine;
pub mod triage;

pub use events::{EventBus, WorkflowEvent};
pub use reviews::ReviewOptions;

use crate::config::WorkflowConfig;
use crate::db::Database;

/// Limits the workflow enforces on its inputs.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub default_max_assignments: u32,
    pub max_comment_length: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            default_max_assignments: 5,
            max_comment_length: 10_000,
        }
    }
}

impl From<&WorkflowConfig> for WorkflowSettings {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            default_max_assignments: config.default_max_assignments,
            max_comment_length: config.max_comment_length,
        }
    }
}

/// Entry point for every review workflow operation.
///
/// Each mutation runs in one immediate transaction on the shared
/// connection and publishes its events only after the commit. Operations
/// are synchronous; async callers invoke them directly.
#[derive(Clone)]
pub struct WorkflowService {
    db: Database,
    events: EventBus,
    settings: WorkflowSettings,
}

impl WorkflowService {
    pub fn new(db: Database, events: EventBus, settings: WorkflowSettings) -> Self {
        Self { db, events, settings }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }
}

/// Rejects empty or whitespace-only values.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), crate::errors::CyberHuntError> {
    if value.trim().is_empty() {
        return Err(crate::errors::CyberHuntError::Validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}
