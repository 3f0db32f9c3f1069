use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CyberHuntError;

/// Workflow state of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Assigned,
    InReview,
    /// The admin dashboard calls this state "completed".
    #[serde(alias = "completed")]
    Approved,
    Rejected,
    NeedsInfo,
    Escalated,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 7] = [
        Self::Pending,
        Self::Assigned,
        Self::InReview,
        Self::Approved,
        Self::Rejected,
        Self::NeedsInfo,
        Self::Escalated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::NeedsInfo => "needs_info",
            Self::Escalated => "escalated",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// States in which a reviewer is actively holding the review.
    pub fn holds_reviewer(&self) -> bool {
        matches!(self, Self::Assigned | Self::InReview | Self::NeedsInfo)
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "in_review" => Ok(Self::InReview),
            "approved" | "completed" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "needs_info" => Ok(Self::NeedsInfo),
            "escalated" => Ok(Self::Escalated),
            other => Err(CyberHuntError::Validation(format!("unknown review status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(CyberHuntError::Validation(format!("unknown priority '{}'", other))),
        }
    }
}

/// Severity declared on the submission, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }

    /// Starting priority for a review of a submission with this severity.
    pub fn default_priority(&self) -> Priority {
        match self {
            Self::Critical => Priority::Critical,
            Self::High => Priority::High,
            Self::Medium => Priority::Medium,
            Self::Low | Self::Info => Priority::Low,
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "info" => Ok(Self::Info),
            other => Err(CyberHuntError::Validation(format!("unknown severity '{}'", other))),
        }
    }
}

/// Terminal disposition of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
    Duplicate,
    Invalid,
    NeedsClarification,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Duplicate => "duplicate",
            Self::Invalid => "invalid",
            Self::NeedsClarification => "needs_clarification",
        }
    }

    /// Accept closes a review as approved; every other decision rejects it.
    pub fn terminal_status(&self) -> ReviewStatus {
        match self {
            Self::Accept => ReviewStatus::Approved,
            _ => ReviewStatus::Rejected,
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            "duplicate" => Ok(Self::Duplicate),
            "invalid" => Ok(Self::Invalid),
            "needs_clarification" => Ok(Self::NeedsClarification),
            other => Err(CyberHuntError::Validation(format!("unknown decision '{}'", other))),
        }
    }
}

/// Which dashboard a review belongs to. Moderation reviews are handled by
/// platform staff, triage reports by a company's triage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    #[default]
    Moderation,
    Triage,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Moderation => "moderation",
            Self::Triage => "triage",
        }
    }
}

impl std::str::FromStr for Audience {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moderation" => Ok(Self::Moderation),
            "triage" => Ok(Self::Triage),
            other => Err(CyberHuntError::Validation(format!("unknown audience '{}'", other))),
        }
    }
}

/// Snapshot of a submission handed over by the submission store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Submission {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub submission_type: String,
    pub severity: Severity,
    pub program_id: Option<String>,
    pub reporter_id: Option<String>,
}

/// The workflow wrapper tracking the triage lifecycle of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub submission_id: String,
    pub program_id: Option<String>,
    pub reporter_id: Option<String>,
    pub title: String,
    pub description: String,
    pub submission_type: String,
    pub status: ReviewStatus,
    pub priority: Priority,
    pub category: String,
    pub severity: Severity,
    pub decision: Option<Decision>,
    pub decision_reason: Option<String>,
    /// Staff-only notes.
    pub internal_notes: Option<String>,
    /// Response shown to the reporting researcher.
    pub public_response: Option<String>,
    /// Minor currency units.
    pub estimated_reward: Option<i64>,
    /// Minor currency units, present only on accepted reviews.
    pub actual_reward: Option<i64>,
    pub reviewer_id: Option<String>,
    pub assigned_by: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: BTreeSet<String>,
    pub audience: Audience,
    pub service_id: Option<String>,
    pub review_started: Option<DateTime<Utc>>,
    pub review_completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Checks the cross-field invariants every persisted review must satisfy.
    pub fn check_invariants(&self) -> Result<(), CyberHuntError> {
        if self.decision.is_some() != self.status.is_terminal() {
            return Err(CyberHuntError::InvariantViolation(format!(
                "decision must be set exactly when status is terminal (status {})",
                self.status
            )));
        }
        if let Some(decision) = self.decision {
            if decision.terminal_status() != self.status {
                return Err(CyberHuntError::InvariantViolation(format!(
                    "decision '{}' cannot close a review as {}",
                    decision.as_str(),
                    self.status
                )));
            }
        }
        match (self.decision, self.actual_reward) {
            (Some(Decision::Accept), None) => {
                return Err(CyberHuntError::InvariantViolation(
                    "accepted review requires an actual reward".into(),
                ));
            }
            (Some(Decision::Accept), Some(amount)) if amount < 0 => {
                return Err(CyberHuntError::InvariantViolation(
                    "actual reward must not be negative".into(),
                ));
            }
            (decision, Some(_)) if decision != Some(Decision::Accept) => {
                return Err(CyberHuntError::InvariantViolation(
                    "actual reward is only allowed on accepted reviews".into(),
                ));
            }
            _ => {}
        }
        if let Some(started) = self.review_started {
            if started < self.created_at {
                return Err(CyberHuntError::InvariantViolation(
                    "review started before it was created".into(),
                ));
            }
        }
        if let Some(completed) = self.review_completed {
            let floor = self.review_started.unwrap_or(self.created_at);
            if completed < floor {
                return Err(CyberHuntError::InvariantViolation(
                    "review completed before it started".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Partial update applied by `update_review`. Absent fields are left as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReviewPatch {
    pub status: Option<ReviewStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub decision: Option<Decision>,
    pub decision_reason: Option<String>,
    pub internal_notes: Option<String>,
    pub public_response: Option<String>,
    pub estimated_reward: Option<i64>,
    pub actual_reward: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<BTreeSet<String>>,
}

/// Query used by the dashboards to list reviews.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub reviewer_id: Option<String>,
    pub audience: Option<Audience>,
    pub submission_id: Option<String>,
    /// Case-insensitive match against title and description.
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
