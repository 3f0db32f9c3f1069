use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use crate::api::auth::Actor;
use crate::api::errors::{ApiJson, ApiQuery};
use crate::api::models::{AddCommentRequest, CommentListQuery};
use crate::api::AppState;
use crate::errors::CyberHuntError;
use crate::models::comment::{Comment, CommentType, NewComment};

pub async fn add_comment(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    Actor(author): Actor,
    ApiJson(req): ApiJson<AddCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), CyberHuntError> {
    let comment = state.workflow.add_comment(&review_id, NewComment {
        author_id: author,
        content: req.content,
        comment_type: req.comment_type.unwrap_or(CommentType::Internal),
        mentions: req.mentions,
    })?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Staff see every comment by default; `includeInternal=false` gives the
/// researcher's view.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    ApiQuery(query): ApiQuery<CommentListQuery>,
) -> Result<Json<Value>, CyberHuntError> {
    let comments = state
        .workflow
        .list_comments(&review_id, query.include_internal.unwrap_or(true))?;
    Ok(Json(json!({ "comments": comments, "total": comments.len() })))
}

pub async fn resolve_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Actor(resolver): Actor,
) -> Result<Json<Comment>, CyberHuntError> {
    Ok(Json(state.workflow.resolve_comment(&id, &resolver)?))
}
