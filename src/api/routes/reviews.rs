use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use crate::api::auth::Actor;
use crate::api::errors::{ApiJson, ApiQuery};
use crate::api::models::{AssignRequest, CreateReviewRequest, FinalizeRequest};
use crate::api::AppState;
use crate::db::reviews::page_size;
use crate::errors::CyberHuntError;
use crate::models::review::{Review, ReviewFilter, ReviewPatch};

pub async fn create_review(
    State(state): State<AppState>,
    Actor(actor): Actor,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), CyberHuntError> {
    let review = state.workflow.create_review(req.submission, req.options, &actor)?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ReviewFilter>,
) -> Result<Json<Value>, CyberHuntError> {
    let (reviews, total) = state.workflow.list_reviews_page(&filter)?;
    Ok(Json(json!({
        "reviews": reviews,
        "total": total,
        "limit": page_size(filter.limit),
        "offset": filter.offset.unwrap_or(0),
    })))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Review>, CyberHuntError> {
    Ok(Json(state.workflow.get_review(&id)?))
}

pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
    ApiJson(patch): ApiJson<ReviewPatch>,
) -> Result<Json<Review>, CyberHuntError> {
    Ok(Json(state.workflow.update_review(&id, patch, &actor)?))
}

pub async fn assign_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
    ApiJson(req): ApiJson<AssignRequest>,
) -> Result<Json<Review>, CyberHuntError> {
    Ok(Json(state.workflow.assign(&id, &req.reviewer_id, &actor)?))
}

pub async fn auto_assign_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
) -> Result<Json<Review>, CyberHuntError> {
    Ok(Json(state.workflow.auto_assign(&id, &actor)?))
}

pub async fn unassign_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
) -> Result<Json<Review>, CyberHuntError> {
    Ok(Json(state.workflow.unassign(&id, &actor)?))
}

pub async fn finalize_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
    ApiJson(req): ApiJson<FinalizeRequest>,
) -> Result<Json<Review>, CyberHuntError> {
    let review = state.workflow.finalize(
        &id,
        req.decision,
        &req.decision_reason,
        req.actual_reward,
        &actor,
    )?;
    Ok(Json(review))
}

pub async fn get_audit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, CyberHuntError> {
    let records = state.workflow.list_audit(&id)?;
    Ok(Json(json!({ "reviewId": id, "records": records })))
}
