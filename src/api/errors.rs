use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest,
    },
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{debug, error};
use crate::errors::CyberHuntError;

impl IntoResponse for CyberHuntError {
    fn into_response(self) -> axum::response::Response {
        let classification = self.classify();
        if classification.status.is_server_error() {
            error!(code = classification.error_type, error = %self, "Request failed");
        } else {
            debug!(code = classification.error_type, error = %self, "Request rejected");
        }

        (
            classification.status,
            Json(json!({"error": self.to_string(), "code": classification.error_type})),
        )
            .into_response()
    }
}

impl From<JsonRejection> for CyberHuntError {
    fn from(rejection: JsonRejection) -> Self {
        CyberHuntError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for CyberHuntError {
    fn from(rejection: QueryRejection) -> Self {
        CyberHuntError::Validation(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the API error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(CyberHuntError))]
pub struct ApiJson<T>(pub T);

/// `Query` extractor whose rejections use the API error body.
#[derive(axum::extract::FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(CyberHuntError))]
pub struct ApiQuery<T>(pub T);
