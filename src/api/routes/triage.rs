use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use crate::api::auth::Actor;
use crate::api::errors::{ApiJson, ApiQuery};
use crate::api::models::{ServiceListQuery, SubscribeRequest};
use crate::api::AppState;
use crate::errors::CyberHuntError;
use crate::models::review::{Review, Submission};
use crate::models::triage::{NewTriageService, Subscription, TriageService};

pub async fn create_service(
    State(state): State<AppState>,
    Actor(actor): Actor,
    ApiJson(req): ApiJson<NewTriageService>,
) -> Result<(StatusCode, Json<TriageService>), CyberHuntError> {
    Ok((StatusCode::CREATED, Json(state.workflow.create_service(req, &actor)?)))
}

pub async fn list_services(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ServiceListQuery>,
) -> Result<Json<Value>, CyberHuntError> {
    let services = state.workflow.list_services(query.company_id.as_deref())?;
    Ok(Json(json!({ "services": services, "total": services.len() })))
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TriageService>, CyberHuntError> {
    Ok(Json(state.workflow.get_service(&id)?))
}

pub async fn subscribe(
    State(state): State<AppState>,
    Actor(actor): Actor,
    ApiJson(req): ApiJson<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscription>), CyberHuntError> {
    let sub = state.workflow.subscribe(&req.company_id, &req.service_id, &actor)?;
    Ok((StatusCode::CREATED, Json(sub)))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Subscription>, CyberHuntError> {
    Ok(Json(state.workflow.get_subscription(&id)?))
}

pub async fn intake_submission(
    State(state): State<AppState>,
    Path(subscription_id): Path<String>,
    Actor(actor): Actor,
    ApiJson(submission): ApiJson<Submission>,
) -> Result<(StatusCode, Json<Review>), CyberHuntError> {
    let review = state.workflow.intake_submission(submission, &subscription_id, &actor)?;
    Ok((StatusCode::CREATED, Json(review)))
}
