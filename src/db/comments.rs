use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::errors::CyberHuntError;
use crate::models::comment::{Comment, CommentType};
use crate::utils::time;
use super::rows;
use super::Database;

const COMMENT_COLUMNS: &str = "seq, id, review_id, author_id, content, comment_type, is_resolved, resolved_by, resolved_at, mentions, created_at";

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        seq: row.get("seq")?,
        id: row.get("id")?,
        review_id: row.get("review_id")?,
        author_id: row.get("author_id")?,
        content: row.get("content")?,
        comment_type: rows::parse(row, "comment_type")?,
        is_resolved: row.get("is_resolved")?,
        resolved_by: row.get("resolved_by")?,
        resolved_at: rows::opt_timestamp(row, "resolved_at")?,
        mentions: rows::string_set(row, "mentions")?,
        created_at: rows::timestamp(row, "created_at")?,
    })
}

/// Insert a comment and return it with its assigned sequence number.
pub(crate) fn insert_comment(conn: &Connection, comment: &Comment) -> Result<Comment, CyberHuntError> {
    conn.execute(
        "INSERT INTO comments (id, review_id, author_id, content, comment_type, is_resolved, resolved_by, resolved_at, mentions, created_at) VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, NULL, ?6, ?7)",
        rusqlite::params![
            comment.id,
            comment.review_id,
            comment.author_id,
            comment.content,
            comment.comment_type.as_str(),
            rows::encode_set(&comment.mentions)?,
            time::to_db(&comment.created_at),
        ],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to insert comment: {}", e)))?;

    Ok(Comment {
        seq: conn.last_insert_rowid(),
        ..comment.clone()
    })
}

/// Creation time of the newest comment on a review.
pub(crate) fn latest_comment_time(conn: &Connection, review_id: &str) -> Result<Option<DateTime<Utc>>, CyberHuntError> {
    let raw: Option<String> = conn.query_row(
        "SELECT MAX(created_at) FROM comments WHERE review_id = ?1",
        rusqlite::params![review_id],
        |row| row.get(0),
    ).map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))?;
    time::opt_from_db(raw)
}

pub(crate) fn fetch_comment(conn: &Connection, id: &str) -> Result<Option<Comment>, CyberHuntError> {
    conn.query_row(
        &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
        rusqlite::params![id],
        map_comment,
    )
    .optional()
    .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))
}

/// Flip a comment to resolved. Returns false if it was already resolved.
pub(crate) fn mark_resolved(
    conn: &Connection,
    id: &str,
    resolver_id: &str,
    at: &DateTime<Utc>,
) -> Result<bool, CyberHuntError> {
    let affected = conn.execute(
        "UPDATE comments SET is_resolved = 1, resolved_by = ?2, resolved_at = ?3 WHERE id = ?1 AND is_resolved = 0",
        rusqlite::params![id, resolver_id, time::to_db(at)],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to resolve comment: {}", e)))?;
    Ok(affected == 1)
}

pub(crate) fn query_comments(
    conn: &Connection,
    review_id: &str,
    include_internal: bool,
) -> Result<Vec<Comment>, CyberHuntError> {
    let sql = if include_internal {
        format!("SELECT {} FROM comments WHERE review_id = ?1 ORDER BY created_at, seq", COMMENT_COLUMNS)
    } else {
        format!(
            "SELECT {} FROM comments WHERE review_id = ?1 AND comment_type = '{}' ORDER BY created_at, seq",
            COMMENT_COLUMNS,
            CommentType::Public.as_str()
        )
    };
    let mut stmt = conn.prepare(&sql)
        .map_err(|e| CyberHuntError::Database(format!("Query failed: {}", e)))?;
    let rows = stmt.query_map(rusqlite::params![review_id], map_comment)
        .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row.map_err(|e| CyberHuntError::Database(format!("Row error: {}", e)))?);
    }
    Ok(comments)
}

impl Database {
    pub fn get_comment(&self, id: &str) -> Result<Option<Comment>, CyberHuntError> {
        self.read(|conn| fetch_comment(conn, id))
    }
}
