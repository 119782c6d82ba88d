//! Small shared helpers for run identifiers and timestamps.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// UTC timestamp alias used across the crate.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Returns the current UTC time as an ISO 8601 string.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Mints a fresh pipeline run identifier.
#[must_use]
pub fn new_run_id() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }

    #[test]
    fn test_new_run_id_is_v4() {
        assert_eq!(new_run_id().get_version_num(), 4);
    }
}
