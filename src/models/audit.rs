use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::review::ReviewStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Assigned,
    Unassigned,
    Escalated,
    Finalized,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Assigned => "assigned",
            Self::Unassigned => "unassigned",
            Self::Escalated => "escalated",
            Self::Finalized => "finalized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "assigned" => Some(Self::Assigned),
            "unassigned" => Some(Self::Unassigned),
            "escalated" => Some(Self::Escalated),
            "finalized" => Some(Self::Finalized),
            _ => None,
        }
    }
}

/// One entry of a review's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: i64,
    pub review_id: String,
    pub actor_id: String,
    pub action: AuditAction,
    pub from_status: Option<ReviewStatus>,
    pub to_status: ReviewStatus,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
