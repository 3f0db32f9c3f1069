use thiserror::Error;

#[derive(Debug, Error)]
pub enum CyberHuntError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Inactive reviewer: {0}")]
    InactiveReviewer(String),

    #[error("Duplicate review: {0}")]
    DuplicateReview(String),

    #[error("Comment already resolved: {0}")]
    AlreadyResolved(String),

    #[error("Duplicate subscription: {0}")]
    DuplicateSubscription(String),

    #[error("Report quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for CyberHuntError {
    fn from(e: rusqlite::Error) -> Self {
        CyberHuntError::Database(e.to_string())
    }
}

impl CyberHuntError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        CyberHuntError::NotFound(format!("{} '{}' does not exist", kind, id))
    }
}
