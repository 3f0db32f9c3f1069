use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::db::audit::{append_audit, AuditEntry};
use crate::db::reviewers::decrement_assignments;
use crate::db::reviews::{insert_review, open_review_for_submission, require_review, save_review};
use crate::errors::CyberHuntError;
use crate::models::audit::{AuditAction, AuditRecord};
use crate::models::review::{
    Audience, Priority, Review, ReviewFilter, ReviewPatch, ReviewStatus, Submission,
};
use crate::utils::time;
use super::events::WorkflowEvent;
use super::finalizer::apply_decision;
use super::state_machine::check_transition;
use super::{require_text, WorkflowService};

/// Overrides applied when a review is created.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ReviewOptions {
    pub audience: Audience,
    /// Defaults from the submission severity.
    pub priority: Option<Priority>,
    /// Defaults to the submission type.
    pub category: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_reward: Option<i64>,
    pub tags: BTreeSet<String>,
    pub internal_notes: Option<String>,
    /// Set by triage intake only.
    #[serde(skip)]
    pub service_id: Option<String>,
}

fn validate_submission(submission: &Submission) -> Result<(), CyberHuntError> {
    require_text("submission id", &submission.id)?;
    require_text("submission title", &submission.title)?;
    require_text("submission type", &submission.submission_type)?;
    Ok(())
}

fn validate_estimate(estimated_reward: Option<i64>) -> Result<(), CyberHuntError> {
    match estimated_reward {
        Some(amount) if amount < 0 => Err(CyberHuntError::Validation(
            "estimated reward must not be negative".into(),
        )),
        _ => Ok(()),
    }
}

/// Insert a pending review for `submission` inside an open transaction.
pub(crate) fn create_review_in_tx(
    conn: &Connection,
    submission: &Submission,
    options: &ReviewOptions,
    actor_id: &str,
    now: DateTime<Utc>,
) -> Result<Review, CyberHuntError> {
    validate_submission(submission)?;
    validate_estimate(options.estimated_reward)?;
    if let Some(category) = &options.category {
        require_text("category", category)?;
    }

    if let Some(existing) = open_review_for_submission(conn, &submission.id)? {
        return Err(CyberHuntError::DuplicateReview(format!(
            "submission {} already has open review {}",
            submission.id, existing
        )));
    }

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        submission_id: submission.id.clone(),
        program_id: submission.program_id.clone(),
        reporter_id: submission.reporter_id.clone(),
        title: submission.title.trim().to_string(),
        description: submission.description.clone(),
        submission_type: submission.submission_type.clone(),
        status: ReviewStatus::Pending,
        priority: options
            .priority
            .unwrap_or_else(|| submission.severity.default_priority()),
        category: options
            .category
            .clone()
            .unwrap_or_else(|| submission.submission_type.clone()),
        severity: submission.severity,
        decision: None,
        decision_reason: None,
        internal_notes: options.internal_notes.clone(),
        public_response: None,
        estimated_reward: options.estimated_reward,
        actual_reward: None,
        reviewer_id: None,
        assigned_by: None,
        due_date: options.due_date,
        tags: options.tags.clone(),
        audience: options.audience,
        service_id: options.service_id.clone(),
        review_started: None,
        review_completed: None,
        created_at: now,
        updated_at: now,
    };
    review.check_invariants()?;
    insert_review(conn, &review)?;
    append_audit(conn, AuditEntry {
        review_id: &review.id,
        actor_id,
        action: AuditAction::Created,
        from_status: None,
        to_status: review.status,
        detail: Some(format!("submission {}", review.submission_id)),
    })?;
    Ok(review)
}

pub(crate) fn created_event(review: &Review) -> WorkflowEvent {
    WorkflowEvent::ReviewCreated {
        review_id: review.id.clone(),
        submission_id: review.submission_id.clone(),
        audience: review.audience,
    }
}

impl WorkflowService {
    pub fn create_review(
        &self,
        submission: Submission,
        options: ReviewOptions,
        actor_id: &str,
    ) -> Result<Review, CyberHuntError> {
        require_text("actor id", actor_id)?;
        let review = self.db.transaction(|tx| {
            create_review_in_tx(tx, &submission, &options, actor_id, time::now())
        })?;

        info!(review_id = %review.id, submission_id = %review.submission_id, actor = actor_id, "Review created");
        self.events.publish(created_event(&review));
        Ok(review)
    }

    /// Apply a partial update. Moving to a terminal status follows the
    /// same decision rules as [`WorkflowService::finalize`].
    pub fn update_review(
        &self,
        review_id: &str,
        patch: ReviewPatch,
        actor_id: &str,
    ) -> Result<Review, CyberHuntError> {
        require_text("actor id", actor_id)?;
        validate_estimate(patch.estimated_reward)?;
        if let Some(category) = &patch.category {
            require_text("category", category)?;
        }

        let (review, events) = self.db.transaction(|tx| {
            let current = require_review(tx, review_id)?;
            let target = patch.status.filter(|status| *status != current.status);

            if let Some(to) = target {
                if matches!(to, ReviewStatus::Pending | ReviewStatus::Assigned) {
                    return Err(CyberHuntError::InvalidTransition(format!(
                        "a review becomes {} only through assignment",
                        to
                    )));
                }
                check_transition(current.status, to)?;
            }

            let touches_decision = patch.decision.is_some()
                || patch.decision_reason.is_some()
                || patch.actual_reward.is_some();
            if current.status.is_terminal() && touches_decision {
                return Err(CyberHuntError::InvalidTransition(format!(
                    "review is already {}; decisions are final",
                    current.status
                )));
            }

            let closing = target.map_or(false, |to| to.is_terminal());
            if !closing {
                if patch.decision.is_some() {
                    return Err(CyberHuntError::InvariantViolation(
                        "a decision can only be set when closing the review".into(),
                    ));
                }
                if patch.actual_reward.is_some() {
                    return Err(CyberHuntError::InvariantViolation(
                        "actual reward can only be set when accepting the review".into(),
                    ));
                }
                if patch.decision_reason.is_some() {
                    return Err(CyberHuntError::InvariantViolation(
                        "decision reason can only be set with a decision".into(),
                    ));
                }
            }

            let mut next = current.clone();
            if let Some(priority) = patch.priority {
                next.priority = priority;
            }
            if let Some(category) = &patch.category {
                next.category = category.trim().to_string();
            }
            if let Some(notes) = &patch.internal_notes {
                next.internal_notes = Some(notes.clone());
            }
            if let Some(response) = &patch.public_response {
                next.public_response = Some(response.clone());
            }
            if let Some(estimate) = patch.estimated_reward {
                next.estimated_reward = Some(estimate);
            }
            if let Some(due) = patch.due_date {
                next.due_date = Some(due);
            }
            if let Some(tags) = &patch.tags {
                next.tags = tags.clone();
            }

            let now = time::now();
            let mut events = Vec::new();
            let action = match target {
                Some(to) if to.is_terminal() => {
                    let decision = patch.decision.ok_or_else(|| {
                        CyberHuntError::InvariantViolation(
                            "closing a review requires a decision".into(),
                        )
                    })?;
                    if decision.terminal_status() != to {
                        return Err(CyberHuntError::InvariantViolation(format!(
                            "decision '{}' cannot close a review as {}",
                            decision.as_str(),
                            to
                        )));
                    }
                    events.push(apply_decision(
                        tx,
                        &mut next,
                        decision,
                        patch.decision_reason.as_deref(),
                        patch.actual_reward,
                        now,
                    )?);
                    AuditAction::Finalized
                }
                Some(ReviewStatus::Escalated) => {
                    next.status = ReviewStatus::Escalated;
                    // Escalated reviews leave the reviewer's queue
                    if current.status.holds_reviewer() {
                        if let Some(reviewer_id) = &current.reviewer_id {
                            decrement_assignments(tx, reviewer_id)?;
                        }
                    }
                    events.push(WorkflowEvent::ReviewEscalated {
                        review_id: next.id.clone(),
                        actor_id: actor_id.to_string(),
                    });
                    AuditAction::Escalated
                }
                Some(to) => {
                    next.status = to;
                    if to == ReviewStatus::InReview && next.review_started.is_none() {
                        next.review_started = Some(now.max(next.created_at));
                    }
                    AuditAction::Updated
                }
                None => AuditAction::Updated,
            };
            next.updated_at = now.max(current.updated_at);
            next.check_invariants()?;

            save_review(tx, &next)?;
            append_audit(tx, AuditEntry {
                review_id: &next.id,
                actor_id,
                action,
                from_status: Some(current.status),
                to_status: next.status,
                detail: None,
            })?;
            Ok((next, events))
        })?;

        info!(review_id = %review.id, status = %review.status, actor = actor_id, "Review updated");
        self.events.publish_all(events);
        Ok(review)
    }

    pub fn get_review(&self, review_id: &str) -> Result<Review, CyberHuntError> {
        self.db
            .get_review(review_id)?
            .ok_or_else(|| CyberHuntError::not_found("review", review_id))
    }

    pub fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, CyberHuntError> {
        self.db.list_reviews(filter)
    }

    /// A page of matching reviews and the number of matches across all pages.
    pub fn list_reviews_page(&self, filter: &ReviewFilter) -> Result<(Vec<Review>, i64), CyberHuntError> {
        self.db.list_reviews_page(filter)
    }

    /// Review counts keyed by status, every status present.
    pub fn count_by_status(&self) -> Result<BTreeMap<String, i64>, CyberHuntError> {
        self.db.review_status_counts()
    }

    pub fn list_audit(&self, review_id: &str) -> Result<Vec<AuditRecord>, CyberHuntError> {
        self.get_review(review_id)?;
        self.db.list_audit(review_id)
    }
}
