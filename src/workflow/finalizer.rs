use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::db::audit::{append_audit, AuditEntry};
use crate::db::reviewers::decrement_assignments;
use crate::db::reviews::{require_review, save_review};
use crate::errors::CyberHuntError;
use crate::models::audit::AuditAction;
use crate::models::review::{Decision, Review, ReviewStatus};
use crate::utils::time;
use super::events::WorkflowEvent;
use super::{require_text, WorkflowService};

fn check_reward(decision: Decision, actual_reward: Option<i64>) -> Result<(), CyberHuntError> {
    match (decision, actual_reward) {
        (Decision::Accept, None) => Err(CyberHuntError::InvariantViolation(
            "accepting a review requires an actual reward".into(),
        )),
        (Decision::Accept, Some(amount)) if amount < 0 => Err(CyberHuntError::InvariantViolation(
            "actual reward must not be negative".into(),
        )),
        (Decision::Accept, Some(_)) => Ok(()),
        (other, Some(_)) => Err(CyberHuntError::InvariantViolation(format!(
            "a '{}' decision cannot carry a reward",
            other.as_str()
        ))),
        (_, None) => Ok(()),
    }
}

/// Close `review` with `decision` inside an open transaction.
///
/// Sets the decision fields and completion time and releases the
/// reviewer's slot. The caller saves the review and writes the audit
/// record. Returns the event to publish once the transaction commits.
pub(crate) fn apply_decision(
    conn: &Connection,
    review: &mut Review,
    decision: Decision,
    decision_reason: Option<&str>,
    actual_reward: Option<i64>,
    now: DateTime<Utc>,
) -> Result<WorkflowEvent, CyberHuntError> {
    match review.status {
        ReviewStatus::InReview | ReviewStatus::NeedsInfo => {}
        status if status.is_terminal() => {
            return Err(CyberHuntError::InvalidTransition(format!(
                "review is already {}; decisions are final",
                status
            )));
        }
        status => {
            return Err(CyberHuntError::InvalidTransition(format!(
                "cannot finalize a review that is {}",
                status
            )));
        }
    }
    check_reward(decision, actual_reward)?;
    let reason = decision_reason
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .ok_or_else(|| CyberHuntError::Validation("decision reason must not be empty".into()))?;

    let held = review.status.holds_reviewer();
    review.status = decision.terminal_status();
    review.decision = Some(decision);
    review.decision_reason = Some(reason.to_string());
    review.actual_reward = actual_reward;
    review.review_completed = Some(now.max(review.review_started.unwrap_or(review.created_at)));

    if held {
        if let Some(reviewer_id) = &review.reviewer_id {
            decrement_assignments(conn, reviewer_id)?;
        }
    }

    Ok(match (decision, actual_reward) {
        (Decision::Accept, Some(amount)) => WorkflowEvent::RewardIssued {
            review_id: review.id.clone(),
            submission_id: review.submission_id.clone(),
            reporter_id: review.reporter_id.clone(),
            amount,
        },
        _ => WorkflowEvent::ReviewClosed {
            review_id: review.id.clone(),
            submission_id: review.submission_id.clone(),
            decision,
        },
    })
}

impl WorkflowService {
    /// Record the terminal decision on a review under evaluation.
    pub fn finalize(
        &self,
        review_id: &str,
        decision: Decision,
        decision_reason: &str,
        actual_reward: Option<i64>,
        actor_id: &str,
    ) -> Result<Review, CyberHuntError> {
        require_text("actor id", actor_id)?;

        let (review, event) = self.db.transaction(|tx| {
            let current = require_review(tx, review_id)?;
            let mut next = current.clone();
            let now = time::now();

            let event = apply_decision(tx, &mut next, decision, Some(decision_reason), actual_reward, now)?;
            next.updated_at = now.max(current.updated_at);
            next.check_invariants()?;

            save_review(tx, &next)?;
            append_audit(tx, AuditEntry {
                review_id: &next.id,
                actor_id,
                action: AuditAction::Finalized,
                from_status: Some(current.status),
                to_status: next.status,
                detail: Some(format!("decision {}", decision.as_str())),
            })?;
            Ok((next, event))
        })?;

        info!(
            review_id = %review.id,
            decision = decision.as_str(),
            reward = ?review.actual_reward,
            actor = actor_id,
            "Review finalized"
        );
        self.events.publish(event);
        Ok(review)
    }
}
