//! Timestamp and identifier helpers.

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 formatted string.
///
/// Format: `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`
///
/// # Examples
///
/// ```
/// use designflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso(&Utc::now())
}

/// Formats a timestamp as ISO 8601 with microsecond precision.
#[must_use]
pub fn format_iso(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Compact second-resolution stamp used inside identifiers: `YYYYMMDD_HHMMSS`.
#[must_use]
pub fn compact_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y%m%d_%H%M%S").to_string()
}

/// Generates an execution identifier of the form `exec_<YYYYMMDD_HHMMSS>`.
#[must_use]
pub fn generate_execution_id(at: &Timestamp) -> String {
    format!("exec_{}", compact_timestamp(at))
}

/// Builds the final artifact identifier for an execution.
#[must_use]
pub fn artifact_id(execution_id: &str, generated_at: &Timestamp) -> String {
    format!("design_doc_{execution_id}_{}", compact_timestamp(generated_at))
}

/// Seconds elapsed since `start`, as a float.
#[must_use]
pub fn elapsed_seconds(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = format_iso(&fixed());
        assert_eq!(ts, "2024-03-09T07:05:01.000000+00:00");
    }

    #[test]
    fn test_generate_execution_id() {
        assert_eq!(generate_execution_id(&fixed()), "exec_20240309_070501");
    }

    #[test]
    fn test_artifact_id() {
        assert_eq!(
            artifact_id("exec_custom", &fixed()),
            "design_doc_exec_custom_20240309_070501"
        );
    }

    #[test]
    fn test_elapsed_seconds_non_negative() {
        let start = Instant::now();
        assert!(elapsed_seconds(start) >= 0.0);
    }
}
