use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A staff member who can hold a bounded number of open reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub department: Option<String>,
    pub specializations: BTreeSet<String>,
    pub max_assignments: u32,
    pub current_assignments: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Reviewer {
    pub fn has_capacity(&self) -> bool {
        self.current_assignments < self.max_assignments
    }

    /// Fraction of capacity in use, as an exact (numerator, denominator) pair
    /// so that load comparisons never go through floating point.
    pub fn load(&self) -> (u64, u64) {
        (self.current_assignments as u64, self.max_assignments.max(1) as u64)
    }

    /// Case-insensitive match of a submission type against the specializations.
    pub fn specializes_in(&self, submission_type: &str) -> bool {
        self.specializations
            .iter()
            .any(|s| s.eq_ignore_ascii_case(submission_type))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewReviewer {
    pub user_id: String,
    pub username: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub department: Option<String>,
    #[serde(default)]
    pub specializations: BTreeSet<String>,
    pub max_assignments: Option<u32>,
}

fn default_role() -> String {
    "analyst".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReviewerPatch {
    pub role: Option<String>,
    pub department: Option<String>,
    pub specializations: Option<BTreeSet<String>>,
    pub max_assignments: Option<u32>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviewer(current: u32, max: u32) -> Reviewer {
        Reviewer {
            id: "rev-1".into(),
            user_id: "u-1".into(),
            username: "alice".into(),
            role: "analyst".into(),
            department: None,
            specializations: ["XSS".to_string(), "sqli".to_string()].into_iter().collect(),
            max_assignments: max,
            current_assignments: current,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_has_capacity() {
        assert!(reviewer(1, 2).has_capacity());
        assert!(!reviewer(2, 2).has_capacity());
    }

    #[test]
    fn test_specializes_in_ignores_case() {
        let r = reviewer(0, 1);
        assert!(r.specializes_in("xss"));
        assert!(r.specializes_in("SQLI"));
        assert!(!r.specializes_in("ssrf"));
    }
}
