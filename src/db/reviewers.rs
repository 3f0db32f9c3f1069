use rusqlite::{Connection, OptionalExtension, Row};

use crate::errors::CyberHuntError;
use crate::models::reviewer::Reviewer;
use crate::utils::time;
use super::rows;
use super::Database;

const REVIEWER_COLUMNS: &str = "id, user_id, username, role, department, specializations, max_assignments, current_assignments, is_active, created_at";

fn map_reviewer(row: &Row<'_>) -> rusqlite::Result<Reviewer> {
    Ok(Reviewer {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        username: row.get("username")?,
        role: row.get("role")?,
        department: row.get("department")?,
        specializations: rows::string_set(row, "specializations")?,
        max_assignments: rows::u32_col(row, "max_assignments")?,
        current_assignments: rows::u32_col(row, "current_assignments")?,
        is_active: row.get("is_active")?,
        created_at: rows::timestamp(row, "created_at")?,
    })
}

pub(crate) fn insert_reviewer(conn: &Connection, reviewer: &Reviewer) -> Result<(), CyberHuntError> {
    conn.execute(
        &format!("INSERT INTO reviewers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)", REVIEWER_COLUMNS),
        rusqlite::params![
            reviewer.id,
            reviewer.user_id,
            reviewer.username,
            reviewer.role,
            reviewer.department,
            rows::encode_set(&reviewer.specializations)?,
            reviewer.max_assignments,
            reviewer.current_assignments,
            reviewer.is_active,
            time::to_db(&reviewer.created_at),
        ],
    ).map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
            CyberHuntError::Validation(format!("user '{}' is already a reviewer", reviewer.user_id))
        }
        other => CyberHuntError::Database(format!("Failed to insert reviewer: {}", other)),
    })?;
    Ok(())
}

pub(crate) fn save_reviewer(conn: &Connection, reviewer: &Reviewer) -> Result<(), CyberHuntError> {
    let affected = conn.execute(
        "UPDATE reviewers SET role = ?2, department = ?3, specializations = ?4, max_assignments = ?5, current_assignments = ?6, is_active = ?7 WHERE id = ?1",
        rusqlite::params![
            reviewer.id,
            reviewer.role,
            reviewer.department,
            rows::encode_set(&reviewer.specializations)?,
            reviewer.max_assignments,
            reviewer.current_assignments,
            reviewer.is_active,
        ],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to update reviewer: {}", e)))?;

    if affected == 0 {
        return Err(CyberHuntError::not_found("reviewer", &reviewer.id));
    }
    Ok(())
}

/// Atomically take one unit of capacity. Returns false when the reviewer is
/// already at its ceiling, so the check and the increment cannot be split.
pub(crate) fn try_increment_assignments(conn: &Connection, reviewer_id: &str) -> Result<bool, CyberHuntError> {
    let affected = conn.execute(
        "UPDATE reviewers SET current_assignments = current_assignments + 1 WHERE id = ?1 AND current_assignments < max_assignments",
        rusqlite::params![reviewer_id],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to update capacity: {}", e)))?;
    Ok(affected == 1)
}

pub(crate) fn decrement_assignments(conn: &Connection, reviewer_id: &str) -> Result<(), CyberHuntError> {
    conn.execute(
        "UPDATE reviewers SET current_assignments = MAX(current_assignments - 1, 0) WHERE id = ?1",
        rusqlite::params![reviewer_id],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to update capacity: {}", e)))?;
    Ok(())
}

pub(crate) fn fetch_reviewer(conn: &Connection, id: &str) -> Result<Option<Reviewer>, CyberHuntError> {
    conn.query_row(
        &format!("SELECT {} FROM reviewers WHERE id = ?1", REVIEWER_COLUMNS),
        rusqlite::params![id],
        map_reviewer,
    )
    .optional()
    .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))
}

pub(crate) fn require_reviewer(conn: &Connection, id: &str) -> Result<Reviewer, CyberHuntError> {
    fetch_reviewer(conn, id)?.ok_or_else(|| CyberHuntError::not_found("reviewer", id))
}

pub(crate) fn query_reviewers(conn: &Connection, active_only: bool) -> Result<Vec<Reviewer>, CyberHuntError> {
    let sql = if active_only {
        format!("SELECT {} FROM reviewers WHERE is_active = 1 ORDER BY id", REVIEWER_COLUMNS)
    } else {
        format!("SELECT {} FROM reviewers ORDER BY id", REVIEWER_COLUMNS)
    };
    let mut stmt = conn.prepare(&sql)
        .map_err(|e| CyberHuntError::Database(format!("Query failed: {}", e)))?;
    let rows = stmt.query_map([], map_reviewer)
        .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))?;

    let mut reviewers = Vec::new();
    for row in rows {
        reviewers.push(row.map_err(|e| CyberHuntError::Database(format!("Row error: {}", e)))?);
    }
    Ok(reviewers)
}

impl Database {
    pub fn get_reviewer(&self, id: &str) -> Result<Option<Reviewer>, CyberHuntError> {
        self.read(|conn| fetch_reviewer(conn, id))
    }

    pub fn list_reviewers(&self, active_only: bool) -> Result<Vec<Reviewer>, CyberHuntError> {
        self.read(|conn| query_reviewers(conn, active_only))
    }
}
