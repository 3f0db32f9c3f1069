use serde::Deserialize;
use crate::models::comment::CommentType;
use crate::models::review::{Decision, Submission};
use crate::workflow::ReviewOptions;
use std::collections::BTreeSet;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub submission: Submission,
    #[serde(default)]
    pub options: ReviewOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignRequest {
    pub reviewer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FinalizeRequest {
    pub decision: Decision,
    pub decision_reason: String,
    /// Minor currency units.
    pub actual_reward: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddCommentRequest {
    pub content: String,
    pub comment_type: Option<CommentType>,
    #[serde(default)]
    pub mentions: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubscribeRequest {
    pub company_id: String,
    pub service_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListQuery {
    pub include_internal: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerListQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceListQuery {
    pub company_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStreamQuery {
    /// Only stream events about this review.
    pub review_id: Option<String>,
}
