use axum::{extract::State, Json};
use serde_json::{json, Value};
use crate::api::AppState;
use crate::errors::CyberHuntError;

/// Dashboard cards: persisted review counts plus in-memory event counters.
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Value>, CyberHuntError> {
    let counts = state.workflow.count_by_status()?;
    let total: i64 = counts.values().sum();
    let reviewers = state.workflow.list_reviewers(true)?;
    let capacity: u64 = reviewers.iter().map(|r| u64::from(r.max_assignments)).sum();
    let in_use: u64 = reviewers.iter().map(|r| u64::from(r.current_assignments)).sum();

    Ok(Json(json!({
        "reviews": { "total": total, "byStatus": counts },
        "reviewers": {
            "active": reviewers.len(),
            "capacity": capacity,
            "assigned": in_use,
        },
        "eventsPublished": state.workflow.events().published_counts(),
    })))
}
