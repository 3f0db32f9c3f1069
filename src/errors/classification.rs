use axum::http::StatusCode;
use super::types::CyberHuntError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    /// Stable machine-readable code returned to API clients.
    pub error_type: &'static str,
    pub status: StatusCode,
}

impl CyberHuntError {
    /// Classify this error into its public code and the HTTP status it maps to.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            CyberHuntError::NotFound(_) => ErrorClassification {
                error_type: "NotFoundError",
                status: StatusCode::NOT_FOUND,
            },
            CyberHuntError::Validation(_) => ErrorClassification {
                error_type: "ValidationError",
                status: StatusCode::BAD_REQUEST,
            },
            CyberHuntError::InvalidTransition(_) => ErrorClassification {
                error_type: "InvalidTransitionError",
                status: StatusCode::CONFLICT,
            },
            CyberHuntError::InvariantViolation(_) => ErrorClassification {
                error_type: "InvariantViolationError",
                status: StatusCode::UNPROCESSABLE_ENTITY,
            },
            CyberHuntError::CapacityExceeded(_) => ErrorClassification {
                error_type: "CapacityExceededError",
                status: StatusCode::CONFLICT,
            },
            CyberHuntError::InactiveReviewer(_) => ErrorClassification {
                error_type: "InactiveReviewerError",
                status: StatusCode::CONFLICT,
            },
            CyberHuntError::DuplicateReview(_) => ErrorClassification {
                error_type: "DuplicateReviewError",
                status: StatusCode::CONFLICT,
            },
            CyberHuntError::AlreadyResolved(_) => ErrorClassification {
                error_type: "AlreadyResolvedError",
                status: StatusCode::CONFLICT,
            },
            CyberHuntError::DuplicateSubscription(_) => ErrorClassification {
                error_type: "DuplicateSubscriptionError",
                status: StatusCode::CONFLICT,
            },
            CyberHuntError::QuotaExceeded(_) => ErrorClassification {
                error_type: "QuotaExceededError",
                status: StatusCode::CONFLICT,
            },
            CyberHuntError::Unauthorized(_) => ErrorClassification {
                error_type: "UnauthorizedError",
                status: StatusCode::UNAUTHORIZED,
            },
            CyberHuntError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                status: StatusCode::BAD_REQUEST,
            },

            // Infrastructure failures
            CyberHuntError::Database(_) => ErrorClassification {
                error_type: "DatabaseError",
                status: StatusCode::INTERNAL_SERVER_ERROR,
            },
            CyberHuntError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                status: StatusCode::BAD_GATEWAY,
            },
            CyberHuntError::Io(_) => ErrorClassification {
                error_type: "IoError",
                status: StatusCode::INTERNAL_SERVER_ERROR,
            },
            CyberHuntError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                status: StatusCode::BAD_REQUEST,
            },
            CyberHuntError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                status: StatusCode::BAD_REQUEST,
            },
            CyberHuntError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                status: StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Domain errors are the caller's to handle; infrastructure errors are not.
    pub fn is_domain(&self) -> bool {
        self.classify().status.is_client_error()
    }
}
