use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::comment::CommentType;
use crate::models::review::{Audience, Decision};

/// Events published after a workflow mutation commits. The notification and
/// payment systems consume these; delivery is best effort.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WorkflowEvent {
    ReviewCreated {
        review_id: String,
        submission_id: String,
        audience: Audience,
    },
    ReviewAssigned {
        review_id: String,
        reviewer_id: String,
        assigned_by: String,
    },
    ReviewUnassigned {
        review_id: String,
        reviewer_id: String,
        actor_id: String,
    },
    ReviewEscalated {
        review_id: String,
        actor_id: String,
    },
    CommentAdded {
        review_id: String,
        comment_id: String,
        author_id: String,
        comment_type: CommentType,
        mentions: Vec<String>,
    },
    /// Consumed by the payment system. `amount` is in minor currency units.
    RewardIssued {
        review_id: String,
        submission_id: String,
        reporter_id: Option<String>,
        amount: i64,
    },
    ReviewClosed {
        review_id: String,
        submission_id: String,
        decision: Decision,
    },
}

impl WorkflowEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReviewCreated { .. } => "reviewCreated",
            Self::ReviewAssigned { .. } => "reviewAssigned",
            Self::ReviewUnassigned { .. } => "reviewUnassigned",
            Self::ReviewEscalated { .. } => "reviewEscalated",
            Self::CommentAdded { .. } => "commentAdded",
            Self::RewardIssued { .. } => "rewardIssued",
            Self::ReviewClosed { .. } => "reviewClosed",
        }
    }

    pub fn review_id(&self) -> &str {
        match self {
            Self::ReviewCreated { review_id, .. }
            | Self::ReviewAssigned { review_id, .. }
            | Self::ReviewUnassigned { review_id, .. }
            | Self::ReviewEscalated { review_id, .. }
            | Self::CommentAdded { review_id, .. }
            | Self::RewardIssued { review_id, .. }
            | Self::ReviewClosed { review_id, .. } => review_id,
        }
    }
}

/// In-process fan-out of workflow events. Publishing never blocks; a
/// subscriber that falls more than the buffer behind skips old events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
    published: Arc<DashMap<&'static str, u64>>,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self {
            sender,
            published: Arc::new(DashMap::new()),
        }
    }

    pub fn publish(&self, event: WorkflowEvent) {
        *self.published.entry(event.kind()).or_insert(0) += 1;
        debug!(kind = event.kind(), review_id = %event.review_id(), "Publishing workflow event");
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = WorkflowEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Number of events published so far, by kind.
    pub fn published_counts(&self) -> BTreeMap<String, u64> {
        self.published
            .iter()
            .map(|entry| (entry.key().to_string(), *entry.value()))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(WorkflowEvent::ReviewEscalated {
            review_id: "r-1".into(),
            actor_id: "admin".into(),
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind(), "reviewEscalated");
        assert_eq!(event.review_id(), "r-1");
    }

    #[test]
    fn test_publish_without_subscribers_is_counted() {
        let bus = EventBus::new(8);
        bus.publish(WorkflowEvent::ReviewEscalated {
            review_id: "r-1".into(),
            actor_id: "admin".into(),
        });
        bus.publish(WorkflowEvent::ReviewEscalated {
            review_id: "r-2".into(),
            actor_id: "admin".into(),
        });
        assert_eq!(bus.published_counts()["reviewEscalated"], 2);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = WorkflowEvent::RewardIssued {
            review_id: "r-1".into(),
            submission_id: "s-1".into(),
            reporter_id: None,
            amount: 5000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "rewardIssued");
        assert_eq!(json["reviewId"], "r-1");
        assert_eq!(json["amount"], 5000);
    }
}
