use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CyberHuntError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentType {
    /// Visible to staff only.
    Internal,
    /// Visible to the reporting researcher as well.
    Public,
}

impl CommentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Public => "public",
        }
    }
}

impl std::str::FromStr for CommentType {
    type Err = CyberHuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(Self::Internal),
            "public" => Ok(Self::Public),
            other => Err(CyberHuntError::Validation(format!("unknown comment type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub review_id: String,
    pub author_id: String,
    pub content: String,
    pub comment_type: CommentType,
    pub is_resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub mentions: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    /// Insertion counter; breaks ties between equal timestamps.
    pub seq: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewComment {
    pub author_id: String,
    pub content: String,
    pub comment_type: CommentType,
    #[serde(default)]
    pub mentions: BTreeSet<String>,
}
