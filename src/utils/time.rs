use chrono::{DateTime, SecondsFormat, Utc};
use crate::errors::CyberHuntError;

/// Fixed-width RFC 3339 form, so stored timestamps sort lexicographically.
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn opt_to_db(ts: Option<&DateTime<Utc>>) -> Option<String> {
    ts.map(to_db)
}

pub fn from_db(s: &str) -> Result<DateTime<Utc>, CyberHuntError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CyberHuntError::Database(format!("Bad timestamp '{}': {}", s, e)))
}

pub fn opt_from_db(s: Option<String>) -> Result<Option<DateTime<Utc>>, CyberHuntError> {
    s.as_deref().map(from_db).transpose()
}

/// Current time truncated to the stored precision.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    from_db(&to_db(&now)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_round_trip_preserves_micros() {
        let ts = now();
        assert_eq!(from_db(&to_db(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_db_format_sorts_chronologically() {
        let a = from_db("2026-01-01T09:00:00.000001Z").unwrap();
        let b = from_db("2026-01-01T10:00:00.000000Z").unwrap();
        assert!(to_db(&a) < to_db(&b));
    }

    #[test]
    fn test_from_db_rejects_garbage() {
        assert!(from_db("yesterday").is_err());
    }
}
