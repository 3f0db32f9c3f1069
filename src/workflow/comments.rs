use tracing::{debug, info};

use crate::db::comments::{fetch_comment, insert_comment, latest_comment_time, mark_resolved, query_comments};
use crate::db::reviews::require_review;
use crate::errors::CyberHuntError;
use crate::models::comment::{Comment, NewComment};
use crate::utils::time;
use super::events::WorkflowEvent;
use super::{require_text, WorkflowService};

impl WorkflowService {
    /// Append a comment to a review's discussion. The stored content is
    /// trimmed, and the creation time never precedes the newest existing
    /// comment so that a new comment always lists last.
    pub fn add_comment(&self, review_id: &str, input: NewComment) -> Result<Comment, CyberHuntError> {
        require_text("author id", &input.author_id)?;
        let content = input.content.trim();
        if content.is_empty() {
            return Err(CyberHuntError::Validation("comment must not be empty".into()));
        }
        let length = content.chars().count();
        if length > self.settings.max_comment_length {
            return Err(CyberHuntError::Validation(format!(
                "comment is {} characters, the limit is {}",
                length, self.settings.max_comment_length
            )));
        }

        let comment = self.db.transaction(|tx| {
            require_review(tx, review_id)?;
            let now = time::now();
            let created_at = match latest_comment_time(tx, review_id)? {
                Some(latest) if latest > now => latest,
                _ => now,
            };
            insert_comment(tx, &Comment {
                id: uuid::Uuid::new_v4().to_string(),
                review_id: review_id.to_string(),
                author_id: input.author_id.clone(),
                content: content.to_string(),
                comment_type: input.comment_type,
                is_resolved: false,
                resolved_by: None,
                resolved_at: None,
                mentions: input.mentions.clone(),
                created_at,
                seq: 0,
            })
        })?;

        debug!(review_id, comment_id = %comment.id, kind = comment.comment_type.as_str(), "Comment added");
        self.events.publish(WorkflowEvent::CommentAdded {
            review_id: comment.review_id.clone(),
            comment_id: comment.id.clone(),
            author_id: comment.author_id.clone(),
            comment_type: comment.comment_type,
            mentions: comment.mentions.iter().cloned().collect(),
        });
        Ok(comment)
    }

    pub fn resolve_comment(&self, comment_id: &str, resolver_id: &str) -> Result<Comment, CyberHuntError> {
        require_text("resolver id", resolver_id)?;
        let comment = self.db.transaction(|tx| {
            let existing = fetch_comment(tx, comment_id)?
                .ok_or_else(|| CyberHuntError::not_found("comment", comment_id))?;
            if existing.is_resolved || !mark_resolved(tx, comment_id, resolver_id, &time::now())? {
                return Err(CyberHuntError::AlreadyResolved(format!(
                    "comment '{}' is already resolved",
                    comment_id
                )));
            }
            fetch_comment(tx, comment_id)?.ok_or_else(|| CyberHuntError::not_found("comment", comment_id))
        })?;

        info!(comment_id, resolver = resolver_id, "Comment resolved");
        Ok(comment)
    }

    /// Comments in creation order. Internal comments are left out unless
    /// `include_internal` is set.
    pub fn list_comments(&self, review_id: &str, include_internal: bool) -> Result<Vec<Comment>, CyberHuntError> {
        self.db.read(|conn| {
            require_review(conn, review_id)?;
            query_comments(conn, review_id, include_internal)
        })
    }
}
