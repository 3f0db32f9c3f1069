pub mod routes;
pub mod models;
pub mod errors;
pub mod auth;

use std::sync::Arc;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use crate::config::CyberHuntConfig;
use crate::db::Database;
use crate::errors::CyberHuntError;
use crate::workflow::{EventBus, WorkflowService, WorkflowSettings};

#[derive(Clone)]
pub struct AppState {
    pub workflow: WorkflowService,
    /// Bearer token required on every route except health, if set.
    pub api_token: Option<Arc<str>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(workflow: WorkflowService, api_token: Option<String>) -> Self {
        Self {
            workflow,
            api_token: api_token.map(Arc::from),
            started_at: Utc::now(),
        }
    }
}

pub fn create_app_state(config: &CyberHuntConfig) -> Result<AppState, CyberHuntError> {
    let db = Database::new(&config.database.path)?;
    let workflow = WorkflowService::new(
        db,
        EventBus::new(config.workflow.event_buffer),
        WorkflowSettings::from(&config.workflow),
    );
    Ok(AppState::new(workflow, config.server.api_token.clone()))
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/stats", get(routes::stats::get_stats))
        .route("/api/reviews", get(routes::reviews::list_reviews).post(routes::reviews::create_review))
        .route("/api/reviews/:id", get(routes::reviews::get_review).patch(routes::reviews::update_review))
        .route("/api/reviews/:id/assign", post(routes::reviews::assign_review))
        .route("/api/reviews/:id/auto-assign", post(routes::reviews::auto_assign_review))
        .route("/api/reviews/:id/unassign", post(routes::reviews::unassign_review))
        .route("/api/reviews/:id/finalize", post(routes::reviews::finalize_review))
        .route("/api/reviews/:id/audit", get(routes::reviews::get_audit))
        .route("/api/reviews/:id/comments", get(routes::comments::list_comments).post(routes::comments::add_comment))
        .route("/api/comments/:id/resolve", post(routes::comments::resolve_comment))
        .route("/api/reviewers", get(routes::reviewers::list_reviewers).post(routes::reviewers::create_reviewer))
        .route("/api/reviewers/:id", get(routes::reviewers::get_reviewer).patch(routes::reviewers::update_reviewer))
        .route("/api/reviewers/:id/deactivate", post(routes::reviewers::deactivate_reviewer))
        .route("/api/services", get(routes::triage::list_services).post(routes::triage::create_service))
        .route("/api/services/:id", get(routes::triage::get_service))
        .route("/api/subscriptions", post(routes::triage::subscribe))
        .route("/api/subscriptions/:id", get(routes::triage::get_subscription))
        .route("/api/subscriptions/:id/intake", post(routes::triage::intake_submission))
        .route("/api/events", get(routes::events::event_stream))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::api_auth_middleware));

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
