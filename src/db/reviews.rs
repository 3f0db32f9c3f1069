use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::errors::CyberHuntError;
use crate::models::review::{Review, ReviewFilter, ReviewStatus};
use crate::utils::time;
use super::rows;
use super::Database;

const REVIEW_COLUMNS: &str = "id, submission_id, program_id, reporter_id, title, description, submission_type, status, priority, category, severity, decision, decision_reason, internal_notes, public_response, estimated_reward, actual_reward, reviewer_id, assigned_by, due_date, tags, audience, service_id, review_started, review_completed, created_at, updated_at";

const DEFAULT_PAGE_SIZE: usize = 50;
pub(crate) const MAX_PAGE_SIZE: usize = 500;

fn map_review(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get("id")?,
        submission_id: row.get("submission_id")?,
        program_id: row.get("program_id")?,
        reporter_id: row.get("reporter_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        submission_type: row.get("submission_type")?,
        status: rows::parse(row, "status")?,
        priority: rows::parse(row, "priority")?,
        category: row.get("category")?,
        severity: rows::parse(row, "severity")?,
        decision: rows::parse_opt(row, "decision")?,
        decision_reason: row.get("decision_reason")?,
        internal_notes: row.get("internal_notes")?,
        public_response: row.get("public_response")?,
        estimated_reward: row.get("estimated_reward")?,
        actual_reward: row.get("actual_reward")?,
        reviewer_id: row.get("reviewer_id")?,
        assigned_by: row.get("assigned_by")?,
        due_date: rows::opt_timestamp(row, "due_date")?,
        tags: rows::string_set(row, "tags")?,
        audience: rows::parse(row, "audience")?,
        service_id: row.get("service_id")?,
        review_started: rows::opt_timestamp(row, "review_started")?,
        review_completed: rows::opt_timestamp(row, "review_completed")?,
        created_at: rows::timestamp(row, "created_at")?,
        updated_at: rows::timestamp(row, "updated_at")?,
    })
}

pub(crate) fn insert_review(conn: &Connection, review: &Review) -> Result<(), CyberHuntError> {
    conn.execute(
        &format!(
            "INSERT INTO reviews ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
            REVIEW_COLUMNS
        ),
        rusqlite::params![
            review.id,
            review.submission_id,
            review.program_id,
            review.reporter_id,
            review.title,
            review.description,
            review.submission_type,
            review.status.as_str(),
            review.priority.as_str(),
            review.category,
            review.severity.as_str(),
            review.decision.map(|d| d.as_str()),
            review.decision_reason,
            review.internal_notes,
            review.public_response,
            review.estimated_reward,
            review.actual_reward,
            review.reviewer_id,
            review.assigned_by,
            time::opt_to_db(review.due_date.as_ref()),
            rows::encode_set(&review.tags)?,
            review.audience.as_str(),
            review.service_id,
            time::opt_to_db(review.review_started.as_ref()),
            time::opt_to_db(review.review_completed.as_ref()),
            time::to_db(&review.created_at),
            time::to_db(&review.updated_at),
        ],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to insert review: {}", e)))?;
    Ok(())
}

/// Persist every mutable column of `review`. Identity and submission fields never change.
pub(crate) fn save_review(conn: &Connection, review: &Review) -> Result<(), CyberHuntError> {
    let affected = conn.execute(
        "UPDATE reviews SET status = ?2, priority = ?3, category = ?4, decision = ?5, decision_reason = ?6, internal_notes = ?7, public_response = ?8, estimated_reward = ?9, actual_reward = ?10, reviewer_id = ?11, assigned_by = ?12, due_date = ?13, tags = ?14, review_started = ?15, review_completed = ?16, updated_at = ?17 WHERE id = ?1",
        rusqlite::params![
            review.id,
            review.status.as_str(),
            review.priority.as_str(),
            review.category,
            review.decision.map(|d| d.as_str()),
            review.decision_reason,
            review.internal_notes,
            review.public_response,
            review.estimated_reward,
            review.actual_reward,
            review.reviewer_id,
            review.assigned_by,
            time::opt_to_db(review.due_date.as_ref()),
            rows::encode_set(&review.tags)?,
            time::opt_to_db(review.review_started.as_ref()),
            time::opt_to_db(review.review_completed.as_ref()),
            time::to_db(&review.updated_at),
        ],
    ).map_err(|e| CyberHuntError::Database(format!("Failed to update review: {}", e)))?;

    if affected == 0 {
        return Err(CyberHuntError::not_found("review", &review.id));
    }
    Ok(())
}

pub(crate) fn fetch_review(conn: &Connection, id: &str) -> Result<Option<Review>, CyberHuntError> {
    conn.query_row(
        &format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS),
        rusqlite::params![id],
        map_review,
    )
    .optional()
    .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))
}

pub(crate) fn require_review(conn: &Connection, id: &str) -> Result<Review, CyberHuntError> {
    fetch_review(conn, id)?.ok_or_else(|| CyberHuntError::not_found("review", id))
}

/// Id of the review for `submission_id` that has not reached a terminal state, if any.
pub(crate) fn open_review_for_submission(
    conn: &Connection,
    submission_id: &str,
) -> Result<Option<String>, CyberHuntError> {
    conn.query_row(
        "SELECT id FROM reviews WHERE submission_id = ?1 AND status NOT IN ('approved', 'rejected') LIMIT 1",
        rusqlite::params![submission_id],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))
}

/// Open reviews a reviewer is actively working on.
pub(crate) fn reviews_held_by(conn: &Connection, reviewer_id: &str) -> Result<Vec<Review>, CyberHuntError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM reviews WHERE reviewer_id = ?1 AND status IN ('assigned', 'in_review', 'needs_info') ORDER BY created_at, id",
        REVIEW_COLUMNS
    )).map_err(|e| CyberHuntError::Database(format!("Query failed: {}", e)))?;

    let rows = stmt.query_map(rusqlite::params![reviewer_id], map_review)
        .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))?;

    let mut reviews = Vec::new();
    for row in rows {
        reviews.push(row.map_err(|e| CyberHuntError::Database(format!("Row error: {}", e)))?);
    }
    Ok(reviews)
}

/// WHERE clause and bound parameters for a listing filter, without paging.
fn filter_sql(filter: &ReviewFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        params.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", params.len()));
    }
    if let Some(priority) = filter.priority {
        params.push(Box::new(priority.as_str()));
        clauses.push(format!("priority = ?{}", params.len()));
    }
    if let Some(category) = &filter.category {
        params.push(Box::new(category.clone()));
        clauses.push(format!("category = ?{}", params.len()));
    }
    if let Some(reviewer_id) = &filter.reviewer_id {
        params.push(Box::new(reviewer_id.clone()));
        clauses.push(format!("reviewer_id = ?{}", params.len()));
    }
    if let Some(audience) = filter.audience {
        params.push(Box::new(audience.as_str()));
        clauses.push(format!("audience = ?{}", params.len()));
    }
    if let Some(submission_id) = &filter.submission_id {
        params.push(Box::new(submission_id.clone()));
        clauses.push(format!("submission_id = ?{}", params.len()));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let escaped = search
            .to_lowercase()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        params.push(Box::new(format!("%{}%", escaped)));
        let n = params.len();
        clauses.push(format!(
            "(lower(title) LIKE ?{n} ESCAPE '\\' OR lower(description) LIKE ?{n} ESCAPE '\\')"
        ));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (where_sql, params)
}

/// Page size actually used for a requested `limit`.
pub(crate) fn page_size(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
}

pub(crate) fn query_reviews(conn: &Connection, filter: &ReviewFilter) -> Result<Vec<Review>, CyberHuntError> {
    let (where_sql, mut params) = filter_sql(filter);

    let limit = i64::try_from(page_size(filter.limit)).unwrap_or(i64::MAX);
    let offset = i64::try_from(filter.offset.unwrap_or(0)).unwrap_or(i64::MAX);
    params.push(Box::new(limit));
    params.push(Box::new(offset));

    let sql = format!(
        "SELECT {} FROM reviews {} ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
        REVIEW_COLUMNS,
        where_sql,
        params.len() - 1,
        params.len()
    );

    let mut stmt = conn.prepare(&sql)
        .map_err(|e| CyberHuntError::Database(format!("Query failed: {}", e)))?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), map_review)
        .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))?;

    let mut reviews = Vec::new();
    for row in rows {
        reviews.push(row.map_err(|e| CyberHuntError::Database(format!("Row error: {}", e)))?);
    }
    Ok(reviews)
}

/// Number of reviews matching `filter`, ignoring `limit` and `offset`.
pub(crate) fn count_reviews(conn: &Connection, filter: &ReviewFilter) -> Result<i64, CyberHuntError> {
    let (where_sql, params) = filter_sql(filter);
    conn.query_row(
        &format!("SELECT COUNT(*) FROM reviews {}", where_sql),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )
    .map_err(|e| CyberHuntError::Database(format!("Count failed: {}", e)))
}

impl Database {
    pub fn get_review(&self, id: &str) -> Result<Option<Review>, CyberHuntError> {
        self.read(|conn| fetch_review(conn, id))
    }

    pub fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, CyberHuntError> {
        self.read(|conn| query_reviews(conn, filter))
    }

    /// One page of matching reviews together with the total match count.
    pub fn list_reviews_page(&self, filter: &ReviewFilter) -> Result<(Vec<Review>, i64), CyberHuntError> {
        self.read(|conn| Ok((query_reviews(conn, filter)?, count_reviews(conn, filter)?)))
    }

    /// Review counts keyed by status, including zero counts.
    pub fn review_status_counts(&self) -> Result<BTreeMap<String, i64>, CyberHuntError> {
        self.read(|conn| {
            let mut counts: BTreeMap<String, i64> = ReviewStatus::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect();

            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM reviews GROUP BY status")
                .map_err(|e| CyberHuntError::Database(format!("Query failed: {}", e)))?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(|e| CyberHuntError::Database(format!("Query error: {}", e)))?;

            for row in rows {
                let (status, count) = row.map_err(|e| CyberHuntError::Database(format!("Row error: {}", e)))?;
                counts.insert(status, count);
            }
            Ok(counts)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use crate::models::review::{Audience, Priority, Severity};

    fn make_review(id: &str, submission_id: &str, title: &str) -> Review {
        let now = time::now();
        Review {
            id: id.to_string(),
            submission_id: submission_id.to_string(),
            program_id: Some("prog-1".into()),
            reporter_id: Some("hacker-1".into()),
            title: title.to_string(),
            description: "Reflected payload in the q parameter".into(),
            submission_type: "xss".into(),
            status: ReviewStatus::Pending,
            priority: Priority::Medium,
            category: "xss".into(),
            severity: Severity::Medium,
            decision: None,
            decision_reason: None,
            internal_notes: None,
            public_response: None,
            estimated_reward: Some(2500),
            actual_reward: None,
            reviewer_id: None,
            assigned_by: None,
            due_date: None,
            tags: ["web".to_string()].into_iter().collect::<BTreeSet<_>>(),
            audience: Audience::Moderation,
            service_id: None,
            review_started: None,
            review_completed: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_db_insert_and_get_review() {
        let db = Database::in_memory().unwrap();
        let review = make_review("r-1", "s-1", "XSS in search");
        db.transaction(|tx| insert_review(tx, &review)).unwrap();

        let loaded = db.get_review("r-1").unwrap().unwrap();
        assert_eq!(loaded, review);
    }

    #[test]
    fn test_db_get_nonexistent_review() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_review("missing").unwrap().is_none());
    }

    #[test]
    fn test_db_open_review_for_submission() {
        let db = Database::in_memory().unwrap();
        let review = make_review("r-1", "s-1", "XSS in search");
        db.transaction(|tx| insert_review(tx, &review)).unwrap();

        let open = db.read(|conn| open_review_for_submission(conn, "s-1")).unwrap();
        assert_eq!(open.as_deref(), Some("r-1"));
        let none = db.read(|conn| open_review_for_submission(conn, "s-2")).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_db_schema_rejects_decision_on_open_review() {
        let db = Database::in_memory().unwrap();
        let mut review = make_review("r-1", "s-1", "XSS in search");
        review.decision = Some(crate::models::review::Decision::Reject);
        let result = db.transaction(|tx| insert_review(tx, &review));
        assert!(matches!(result, Err(CyberHuntError::Database(_))));
    }

    #[test]
    fn test_db_list_reviews_filters_and_search() {
        let db = Database::in_memory().unwrap();
        db.transaction(|tx| {
            insert_review(tx, &make_review("r-1", "s-1", "XSS in search"))?;
            let mut sqli = make_review("r-2", "s-2", "SQL injection in login");
            sqli.priority = Priority::Critical;
            sqli.category = "sqli".into();
            insert_review(tx, &sqli)?;
            insert_review(tx, &make_review("r-3", "s-3", "100% CPU via regex"))
        }).unwrap();

        let all = db.list_reviews(&ReviewFilter::default()).unwrap();
        assert_eq!(all.len(), 3);

        let critical = db.list_reviews(&ReviewFilter {
            priority: Some(Priority::Critical),
            ..Default::default()
        }).unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].id, "r-2");

        let search = db.list_reviews(&ReviewFilter {
            search: Some("LOGIN".into()),
            ..Default::default()
        }).unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].id, "r-2");

        // LIKE wildcards in the search text are matched literally
        let percent = db.list_reviews(&ReviewFilter {
            search: Some("100%".into()),
            ..Default::default()
        }).unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].id, "r-3");

        let page = db.list_reviews(&ReviewFilter {
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        }).unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_db_page_reports_full_match_count() {
        let db = Database::in_memory().unwrap();
        db.transaction(|tx| {
            for i in 0..4 {
                insert_review(tx, &make_review(&format!("r-{}", i), &format!("s-{}", i), "Open redirect"))?;
            }
            Ok(())
        }).unwrap();

        let (page, total) = db.list_reviews_page(&ReviewFilter {
            search: Some("redirect".into()),
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        }).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(total, 4);
    }

    #[test]
    fn test_db_oversized_limit_is_clamped() {
        let db = Database::in_memory().unwrap();
        db.transaction(|tx| {
            for i in 0..=MAX_PAGE_SIZE {
                insert_review(tx, &make_review(&format!("r-{}", i), &format!("s-{}", i), "Open redirect"))?;
            }
            Ok(())
        }).unwrap();

        let page = db.list_reviews(&ReviewFilter {
            limit: Some(usize::MAX),
            ..Default::default()
        }).unwrap();
        assert_eq!(page.len(), MAX_PAGE_SIZE);

        let beyond = db.list_reviews(&ReviewFilter {
            offset: Some(usize::MAX),
            ..Default::default()
        }).unwrap();
        assert!(beyond.is_empty());
    }

    #[test]
    fn test_db_status_counts_include_zeroes() {
        let db = Database::in_memory().unwrap();
        db.transaction(|tx| insert_review(tx, &make_review("r-1", "s-1", "XSS"))).unwrap();

        let counts = db.review_status_counts().unwrap();
        assert_eq!(counts["pending"], 1);
        assert_eq!(counts["approved"], 0);
        assert_eq!(counts.len(), ReviewStatus::ALL.len());
    }
}
