use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::debug;
use crate::errors::CyberHuntError;
use super::AppState;

/// Header carrying the id of the user performing a mutation.
pub const ACTOR_HEADER: &str = "x-actor-id";

pub async fn api_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, CyberHuntError> {
    if let Some(expected_token) = state.api_token.as_deref() {
        let auth_header = request.headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        match auth_header.and_then(|header| header.strip_prefix("Bearer ")) {
            Some(token) if token == expected_token => {}
            Some(_) => {
                debug!(path = %request.uri().path(), "Rejected request with wrong API token");
                return Err(CyberHuntError::Unauthorized("Invalid API token".into()));
            }
            None => {
                return Err(CyberHuntError::Unauthorized("Missing Authorization header".into()));
            }
        }
    }

    Ok(next.run(request).await)
}

/// The acting user, taken from the `X-Actor-Id` header.
#[derive(Debug, Clone)]
pub struct Actor(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = CyberHuntError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CyberHuntError::Validation("X-Actor-Id header is required".into()))?;
        Ok(Actor(value.to_string()))
    }
}
