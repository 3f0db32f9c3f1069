use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use crate::api::auth::Actor;
use crate::api::errors::{ApiJson, ApiQuery};
use crate::api::models::ReviewerListQuery;
use crate::api::AppState;
use crate::errors::CyberHuntError;
use crate::models::reviewer::{NewReviewer, Reviewer, ReviewerPatch};

pub async fn create_reviewer(
    State(state): State<AppState>,
    Actor(actor): Actor,
    ApiJson(req): ApiJson<NewReviewer>,
) -> Result<(StatusCode, Json<Reviewer>), CyberHuntError> {
    Ok((StatusCode::CREATED, Json(state.workflow.create_reviewer(req, &actor)?)))
}

pub async fn list_reviewers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReviewerListQuery>,
) -> Result<Json<Value>, CyberHuntError> {
    let reviewers = state.workflow.list_reviewers(query.active_only)?;
    Ok(Json(json!({ "reviewers": reviewers, "total": reviewers.len() })))
}

pub async fn get_reviewer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Reviewer>, CyberHuntError> {
    Ok(Json(state.workflow.get_reviewer(&id)?))
}

pub async fn update_reviewer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
    ApiJson(patch): ApiJson<ReviewerPatch>,
) -> Result<Json<Reviewer>, CyberHuntError> {
    Ok(Json(state.workflow.update_reviewer(&id, patch, &actor)?))
}

pub async fn deactivate_reviewer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
) -> Result<Json<Reviewer>, CyberHuntError> {
    Ok(Json(state.workflow.deactivate_reviewer(&id, &actor)?))
}
