use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};
use crate::api::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "cyberhunt",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("CYBERHUNT_GIT_HASH"),
        "builtAt": option_env!("CYBERHUNT_BUILD_TIMESTAMP"),
        "uptimeSeconds": (Utc::now() - state.started_at).num_seconds(),
    }))
}
