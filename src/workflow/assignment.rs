use std::cmp::Ordering;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::audit::{append_audit, AuditEntry};
use crate::db::reviewers::{
    decrement_assignments, insert_reviewer, query_reviewers, require_reviewer, save_reviewer,
    try_increment_assignments,
};
use crate::db::reviews::{require_review, reviews_held_by, save_review};
use crate::errors::CyberHuntError;
use crate::models::audit::AuditAction;
use crate::models::review::{Review, ReviewStatus};
use crate::models::reviewer::{NewReviewer, Reviewer, ReviewerPatch};
use crate::utils::time;
use super::events::WorkflowEvent;
use super::state_machine::check_transition;
use super::{require_text, WorkflowService};

/// Compare two reviewers by `current/max` without floating point.
fn compare_load(a: &Reviewer, b: &Reviewer) -> Ordering {
    let (a_cur, a_max) = a.load();
    let (b_cur, b_max) = b.load();
    (a_cur * b_max).cmp(&(b_cur * a_max))
}

/// Pick the reviewer for a submission type: active, with spare capacity
/// and a matching specialization, lowest load ratio first, smallest id on
/// ties.
pub fn select_reviewer<'a>(candidates: &'a [Reviewer], submission_type: &str) -> Option<&'a Reviewer> {
    candidates
        .iter()
        .filter(|r| r.is_active && r.has_capacity() && r.specializes_in(submission_type))
        .min_by(|a, b| compare_load(a, b).then_with(|| a.id.cmp(&b.id)))
}

fn assign_in_tx(
    conn: &Connection,
    review_id: &str,
    reviewer_id: &str,
    actor_id: &str,
) -> Result<Review, CyberHuntError> {
    let current = require_review(conn, review_id)?;
    let reviewer = require_reviewer(conn, reviewer_id)?;
    if !reviewer.is_active {
        return Err(CyberHuntError::InactiveReviewer(format!(
            "reviewer '{}' is inactive",
            reviewer.username
        )));
    }
    check_transition(current.status, ReviewStatus::Assigned)?;
    if !try_increment_assignments(conn, reviewer_id)? {
        return Err(CyberHuntError::CapacityExceeded(format!(
            "reviewer '{}' already holds {} of {} reviews",
            reviewer.username, reviewer.current_assignments, reviewer.max_assignments
        )));
    }

    let mut next = current.clone();
    next.status = ReviewStatus::Assigned;
    next.reviewer_id = Some(reviewer.id.clone());
    next.assigned_by = Some(actor_id.to_string());
    next.updated_at = time::now().max(current.updated_at);
    next.check_invariants()?;

    save_review(conn, &next)?;
    append_audit(conn, AuditEntry {
        review_id: &next.id,
        actor_id,
        action: AuditAction::Assigned,
        from_status: Some(current.status),
        to_status: next.status,
        detail: Some(format!("reviewer {}", reviewer.id)),
    })?;
    Ok(next)
}

/// Returns the review and the reviewer it was taken from.
fn unassign_in_tx(
    conn: &Connection,
    current: Review,
    actor_id: &str,
) -> Result<(Review, String), CyberHuntError> {
    let reviewer_id = match (&current.reviewer_id, current.status.holds_reviewer()) {
        (Some(id), true) => id.clone(),
        _ => {
            return Err(CyberHuntError::InvalidTransition(format!(
                "cannot unassign a review that is {}",
                current.status
            )));
        }
    };
    decrement_assignments(conn, &reviewer_id)?;

    let mut next = current.clone();
    next.status = ReviewStatus::Pending;
    next.reviewer_id = None;
    next.assigned_by = None;
    next.updated_at = time::now().max(current.updated_at);
    next.check_invariants()?;

    save_review(conn, &next)?;
    append_audit(conn, AuditEntry {
        review_id: &next.id,
        actor_id,
        action: AuditAction::Unassigned,
        from_status: Some(current.status),
        to_status: next.status,
        detail: Some(format!("reviewer {}", reviewer_id)),
    })?;
    Ok((next, reviewer_id))
}

fn assigned_event(review: &Review, actor_id: &str) -> Option<WorkflowEvent> {
    review.reviewer_id.as_ref().map(|reviewer_id| WorkflowEvent::ReviewAssigned {
        review_id: review.id.clone(),
        reviewer_id: reviewer_id.clone(),
        assigned_by: actor_id.to_string(),
    })
}

fn unassigned_event(review: &Review, reviewer_id: String, actor_id: &str) -> WorkflowEvent {
    WorkflowEvent::ReviewUnassigned {
        review_id: review.id.clone(),
        reviewer_id,
        actor_id: actor_id.to_string(),
    }
}

impl WorkflowService {
    pub fn assign(&self, review_id: &str, reviewer_id: &str, actor_id: &str) -> Result<Review, CyberHuntError> {
        require_text("actor id", actor_id)?;
        let review = self
            .db
            .transaction(|tx| assign_in_tx(tx, review_id, reviewer_id, actor_id))?;

        info!(review_id = %review.id, reviewer_id, actor = actor_id, "Review assigned");
        self.events.publish_all(assigned_event(&review, actor_id));
        Ok(review)
    }

    pub fn unassign(&self, review_id: &str, actor_id: &str) -> Result<Review, CyberHuntError> {
        require_text("actor id", actor_id)?;
        let (review, reviewer_id) = self.db.transaction(|tx| {
            let current = require_review(tx, review_id)?;
            unassign_in_tx(tx, current, actor_id)
        })?;

        info!(review_id = %review.id, reviewer_id = %reviewer_id, actor = actor_id, "Review unassigned");
        self.events.publish(unassigned_event(&review, reviewer_id, actor_id));
        Ok(review)
    }

    /// Assign to the least-loaded eligible reviewer. Selection and
    /// assignment share one transaction.
    pub fn auto_assign(&self, review_id: &str, actor_id: &str) -> Result<Review, CyberHuntError> {
        require_text("actor id", actor_id)?;
        let review = self.db.transaction(|tx| {
            let review = require_review(tx, review_id)?;
            check_transition(review.status, ReviewStatus::Assigned)?;
            let candidates = query_reviewers(tx, true)?;
            let chosen = select_reviewer(&candidates, &review.submission_type).ok_or_else(|| {
                CyberHuntError::CapacityExceeded(format!(
                    "no eligible reviewer for '{}' submissions",
                    review.submission_type
                ))
            })?;
            assign_in_tx(tx, review_id, &chosen.id, actor_id)
        })?;

        info!(review_id = %review.id, reviewer_id = ?review.reviewer_id, actor = actor_id, "Review auto-assigned");
        self.events.publish_all(assigned_event(&review, actor_id));
        Ok(review)
    }

    pub fn create_reviewer(&self, input: NewReviewer, actor_id: &str) -> Result<Reviewer, CyberHuntError> {
        require_text("actor id", actor_id)?;
        require_text("user id", &input.user_id)?;
        require_text("username", &input.username)?;
        require_text("role", &input.role)?;
        let max_assignments = input
            .max_assignments
            .unwrap_or(self.settings.default_max_assignments);
        if max_assignments == 0 {
            return Err(CyberHuntError::Validation(
                "max assignments must be greater than zero".into(),
            ));
        }

        let reviewer = Reviewer {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: input.user_id.trim().to_string(),
            username: input.username.trim().to_string(),
            role: input.role.trim().to_string(),
            department: input.department,
            specializations: input.specializations,
            max_assignments,
            current_assignments: 0,
            is_active: true,
            created_at: time::now(),
        };
        self.db.transaction(|tx| insert_reviewer(tx, &reviewer))?;

        info!(reviewer_id = %reviewer.id, username = %reviewer.username, max_assignments, actor = actor_id, "Reviewer created");
        Ok(reviewer)
    }

    pub fn get_reviewer(&self, reviewer_id: &str) -> Result<Reviewer, CyberHuntError> {
        self.db
            .get_reviewer(reviewer_id)?
            .ok_or_else(|| CyberHuntError::not_found("reviewer", reviewer_id))
    }

    pub fn list_reviewers(&self, active_only: bool) -> Result<Vec<Reviewer>, CyberHuntError> {
        self.db.list_reviewers(active_only)
    }

    /// Setting `isActive` to false behaves like [`WorkflowService::deactivate_reviewer`].
    pub fn update_reviewer(
        &self,
        reviewer_id: &str,
        patch: ReviewerPatch,
        actor_id: &str,
    ) -> Result<Reviewer, CyberHuntError> {
        require_text("actor id", actor_id)?;
        if let Some(role) = &patch.role {
            require_text("role", role)?;
        }

        let (reviewer, events) = self.db.transaction(|tx| {
            let current = require_reviewer(tx, reviewer_id)?;
            let mut events = Vec::new();
            if patch.is_active == Some(false) && current.is_active {
                events = release_all(tx, reviewer_id, actor_id)?;
            }

            // Re-read: releasing reviews changes the counter
            let mut next = require_reviewer(tx, reviewer_id)?;
            if let Some(max) = patch.max_assignments {
                if max == 0 {
                    return Err(CyberHuntError::Validation(
                        "max assignments must be greater than zero".into(),
                    ));
                }
                if max < next.current_assignments {
                    return Err(CyberHuntError::Validation(format!(
                        "max assignments {} is below the {} reviews currently held",
                        max, next.current_assignments
                    )));
                }
                next.max_assignments = max;
            }
            if let Some(role) = &patch.role {
                next.role = role.trim().to_string();
            }
            if let Some(department) = &patch.department {
                next.department = Some(department.clone());
            }
            if let Some(specializations) = &patch.specializations {
                next.specializations = specializations.clone();
            }
            if let Some(active) = patch.is_active {
                next.is_active = active;
            }
            save_reviewer(tx, &next)?;
            Ok((next, events))
        })?;

        info!(reviewer_id = %reviewer.id, active = reviewer.is_active, actor = actor_id, "Reviewer updated");
        self.events.publish_all(events);
        Ok(reviewer)
    }

    /// Deactivate a reviewer and return every review it held to pending.
    pub fn deactivate_reviewer(&self, reviewer_id: &str, actor_id: &str) -> Result<Reviewer, CyberHuntError> {
        let patch = ReviewerPatch {
            is_active: Some(false),
            ..Default::default()
        };
        self.update_reviewer(reviewer_id, patch, actor_id)
    }
}

fn release_all(conn: &Connection, reviewer_id: &str, actor_id: &str) -> Result<Vec<WorkflowEvent>, CyberHuntError> {
    let held = reviews_held_by(conn, reviewer_id)?;
    if !held.is_empty() {
        warn!(reviewer_id, count = held.len(), "Returning reviews of deactivated reviewer to pending");
    }
    let mut events = Vec::with_capacity(held.len());
    for review in held {
        let (review, released_from) = unassign_in_tx(conn, review, actor_id)?;
        events.push(unassigned_event(&review, released_from, actor_id));
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::review::ReviewPatch;
    use crate::workflow::test_support::*;

    fn candidate(id: &str, current: u32, max: u32, specs: &[&str]) -> Reviewer {
        Reviewer {
            id: id.to_string(),
            user_id: format!("user-{}", id),
            username: id.to_string(),
            role: "analyst".into(),
            department: None,
            specializations: specs.iter().map(|s| s.to_string()).collect(),
            max_assignments: max,
            current_assignments: current,
            is_active: true,
            created_at: time::now(),
        }
    }

    #[test]
    fn test_select_lowest_load_ratio() {
        let pool = vec![
            candidate("a", 2, 4, &["xss"]),
            candidate("b", 1, 4, &["xss"]),
            candidate("c", 0, 1, &["sqli"]),
        ];
        assert_eq!(select_reviewer(&pool, "XSS").unwrap().id, "b");
    }

    #[test]
    fn test_select_tie_broken_by_id() {
        let pool = vec![
            candidate("zed", 1, 2, &["xss"]),
            candidate("amy", 2, 4, &["xss"]),
        ];
        assert_eq!(select_reviewer(&pool, "xss").unwrap().id, "amy");
    }

    #[test]
    fn test_select_skips_full_and_inactive() {
        let mut inactive = candidate("a", 0, 3, &["xss"]);
        inactive.is_active = false;
        let pool = vec![inactive, candidate("b", 3, 3, &["xss"])];
        assert!(select_reviewer(&pool, "xss").is_none());
    }

    #[test]
    fn test_assign_sets_reviewer_and_counter() {
        let svc = service();
        let rev = reviewer(&svc, "alice", 2, &["xss"]);
        let review = pending_review(&svc, "s-1");
        let mut events = svc.events().subscribe();

        let assigned = svc.assign(&review.id, &rev.id, "lead").unwrap();
        assert_eq!(assigned.status, ReviewStatus::Assigned);
        assert_eq!(assigned.reviewer_id.as_deref(), Some(rev.id.as_str()));
        assert_eq!(assigned.assigned_by.as_deref(), Some("lead"));
        assert_eq!(svc.get_reviewer(&rev.id).unwrap().current_assignments, 1);
        assert!(matches!(events.try_recv().unwrap(), WorkflowEvent::ReviewAssigned { .. }));
    }

    #[test]
    fn test_assign_to_inactive_reviewer() {
        let svc = service();
        let rev = reviewer(&svc, "alice", 2, &["xss"]);
        svc.deactivate_reviewer(&rev.id, "admin").unwrap();
        let review = pending_review(&svc, "s-1");

        let err = svc.assign(&review.id, &rev.id, "admin").unwrap_err();
        assert!(matches!(err, CyberHuntError::InactiveReviewer(_)));
    }

    #[test]
    fn test_assign_unknown_reviewer() {
        let svc = service();
        let review = pending_review(&svc, "s-1");
        let err = svc.assign(&review.id, "nobody", "admin").unwrap_err();
        assert!(matches!(err, CyberHuntError::NotFound(_)));
    }

    #[test]
    fn test_assign_twice_is_invalid_transition() {
        let svc = service();
        let rev = reviewer(&svc, "alice", 2, &["xss"]);
        let review = pending_review(&svc, "s-1");
        svc.assign(&review.id, &rev.id, "admin").unwrap();

        let err = svc.assign(&review.id, &rev.id, "admin").unwrap_err();
        assert!(matches!(err, CyberHuntError::InvalidTransition(_)));
        assert_eq!(svc.get_reviewer(&rev.id).unwrap().current_assignments, 1);
    }

    #[test]
    fn test_capacity_freed_by_unassign() {
        let svc = service();
        let rev = reviewer(&svc, "alice", 2, &["xss"]);
        let first = pending_review(&svc, "s-1");
        let second = pending_review(&svc, "s-2");
        let third = pending_review(&svc, "s-3");
        svc.assign(&first.id, &rev.id, "admin").unwrap();
        svc.assign(&second.id, &rev.id, "admin").unwrap();

        let err = svc.assign(&third.id, &rev.id, "admin").unwrap_err();
        assert!(matches!(err, CyberHuntError::CapacityExceeded(_)));

        let released = svc.unassign(&first.id, "admin").unwrap();
        assert_eq!(released.status, ReviewStatus::Pending);
        assert!(released.reviewer_id.is_none());
        assert!(released.assigned_by.is_none());

        svc.assign(&third.id, &rev.id, "admin").unwrap();
        assert_eq!(svc.get_reviewer(&rev.id).unwrap().current_assignments, 2);
    }

    #[test]
    fn test_unassign_pending_is_invalid() {
        let svc = service();
        let review = pending_review(&svc, "s-1");
        let err = svc.unassign(&review.id, "admin").unwrap_err();
        assert!(matches!(err, CyberHuntError::InvalidTransition(_)));
    }

    #[test]
    fn test_auto_assign_prefers_least_loaded() {
        let svc = service();
        let busy = reviewer(&svc, "busy", 2, &["xss"]);
        let idle = reviewer(&svc, "idle", 4, &["XSS", "idor"]);
        reviewer(&svc, "other", 5, &["sqli"]);
        let warmup = pending_review(&svc, "s-0");
        svc.assign(&warmup.id, &busy.id, "admin").unwrap();

        let review = pending_review(&svc, "s-1");
        let assigned = svc.auto_assign(&review.id, "system").unwrap();
        assert_eq!(assigned.reviewer_id.as_deref(), Some(idle.id.as_str()));
    }

    #[test]
    fn test_auto_assign_without_candidates() {
        let svc = service();
        reviewer(&svc, "sqli-only", 3, &["sqli"]);
        let review = pending_review(&svc, "s-1");

        let err = svc.auto_assign(&review.id, "system").unwrap_err();
        assert!(matches!(err, CyberHuntError::CapacityExceeded(_)));
        assert_eq!(svc.get_review(&review.id).unwrap().status, ReviewStatus::Pending);
    }

    #[test]
    fn test_lowering_max_below_current_fails() {
        let svc = service();
        let rev = reviewer(&svc, "alice", 3, &["xss"]);
        let first = pending_review(&svc, "s-1");
        let second = pending_review(&svc, "s-2");
        svc.assign(&first.id, &rev.id, "admin").unwrap();
        svc.assign(&second.id, &rev.id, "admin").unwrap();

        let patch = ReviewerPatch {
            max_assignments: Some(1),
            ..Default::default()
        };
        let err = svc.update_reviewer(&rev.id, patch, "admin").unwrap_err();
        assert!(matches!(err, CyberHuntError::Validation(_)));

        let patch = ReviewerPatch {
            max_assignments: Some(2),
            department: Some("web".into()),
            ..Default::default()
        };
        let updated = svc.update_reviewer(&rev.id, patch, "admin").unwrap();
        assert_eq!(updated.max_assignments, 2);
        assert_eq!(updated.department.as_deref(), Some("web"));
    }

    #[test]
    fn test_deactivate_returns_held_reviews_to_pending() {
        let svc = service();
        let rev = reviewer(&svc, "alice", 3, &["xss"]);
        let held = review_in_progress(&svc, "s-1", &rev.id);
        let closed = review_in_progress(&svc, "s-2", &rev.id);
        svc.finalize(&closed.id, crate::models::review::Decision::Reject, "noise", None, &rev.id)
            .unwrap();

        let reviewer = svc.deactivate_reviewer(&rev.id, "admin").unwrap();
        assert!(!reviewer.is_active);
        assert_eq!(reviewer.current_assignments, 0);

        let held = svc.get_review(&held.id).unwrap();
        assert_eq!(held.status, ReviewStatus::Pending);
        assert!(held.reviewer_id.is_none());
        let closed = svc.get_review(&closed.id).unwrap();
        assert_eq!(closed.status, ReviewStatus::Rejected);
        assert_eq!(closed.reviewer_id.as_deref(), Some(rev.id.as_str()));
    }

    #[test]
    fn test_default_capacity_from_settings() {
        let svc = service();
        let rev = svc
            .create_reviewer(NewReviewer {
                user_id: "u-9".into(),
                username: "dana".into(),
                role: "analyst".into(),
                department: None,
                specializations: Default::default(),
                max_assignments: None,
            }, "admin-1")
            .unwrap();
        assert_eq!(rev.max_assignments, svc.settings().default_max_assignments);
    }

    #[test]
    fn test_unassign_from_needs_info() {
        let svc = service();
        let rev = reviewer(&svc, "alice", 1, &["xss"]);
        let review = review_in_progress(&svc, "s-1", &rev.id);
        let patch = ReviewPatch {
            status: Some(ReviewStatus::NeedsInfo),
            ..Default::default()
        };
        svc.update_review(&review.id, patch, &rev.id).unwrap();

        let released = svc.unassign(&review.id, "admin").unwrap();
        assert_eq!(released.status, ReviewStatus::Pending);
        assert_eq!(svc.get_reviewer(&rev.id).unwrap().current_assignments, 0);
    }
}
