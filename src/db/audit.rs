use rusqlite::{Connection, Row};

use crate::errors::CyberHuntError;
use crate::models::audit::{AuditAction, AuditRecord};
use crate::models::review::ReviewStatus;
use crate::utils::time;
use super::rows;
use super::Database;

fn map_record(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    let action: String = row.get("action")?;
    Ok(AuditRecord {
        id: row.get("id")?,
        review_id: row.get("review_id")?,
        actor_id: row.get("actor_id")?,
        action: AuditAction::parse(&action).unwrap_or(AuditAction::Updated),
        from_status: rows::parse_opt(row, "from_status")?,
        to_status: rows::parse(row, "to_status")?,
        detail: row.get("detail")?,
        created_at: rows::timestamp(row, "created_at")?,
    })
}

pub(crate) struct AuditEntry<'a> {
    pub review_id: &'a str,
    pub actor_id: &'a str,
    pub action: AuditAction,
    pub from_status: Option<ReviewStatus>,
    pub to_status: ReviewStatus,
    pub detail: Option<String>,
}

pub(crate) fn append_audit(conn: &Connection, entry: AuditEntry<'_>) -> Result<(), CyberHuntError> {
    conn.execute(
        "INSERT INTO audit_log (review_id, actor_id, action, from_status, to_status, detail, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            entry.review_id,
            entry.actor_id,
            entry.action.as_str(),
            entry.from_status.map(|s| s.as_str()),
            entry.to_status.as_str(),
            entry.detail,
            time::to_db(&time::now()),
        ],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to append audit record: {}", e)))?;
    Ok(())
}

impl Database {
    /// Audit trail of a review, oldest first.
    pub fn list_audit(&self, review_id: &str) -> Result<Vec<AuditRecord>, CyberHuntError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, review_id, actor_id, action, from_status, to_status, detail, created_at FROM audit_log WHERE review_id = ?1 ORDER BY id"
            ).map_err(|e| CyberHuntError::Database(format!("Query failed: {}", e)))?;

            let rows = stmt.query_map(rusqlite::params![review_id], map_record)
                .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row.map_err(|e| CyberHuntError::Database(format!("Row error: {}", e)))?);
            }
            Ok(records)
        })
    }
}
