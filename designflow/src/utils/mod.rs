//! Utility functions for identifiers and timestamp handling.

pub mod timestamps;

pub use timestamps::{
    artifact_id, compact_timestamp, elapsed_seconds, format_iso, generate_execution_id,
    iso_timestamp, now_utc, Timestamp,
};
