//! Tracing setup and span helpers.
//!
//! Logs are structured: every span opened by the controller and executor
//! carries `execution_id`, and unit spans add `phase` and `unit`.

mod spans;

pub use spans::{phase_span, pipeline_span, unit_span};

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `level` when set. With `json`, events are written as
/// one JSON object per line. Installing twice is not an error; the second
/// call leaves the first subscriber in place and returns `false`.
pub fn init_tracing(level: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().with_current_span(true).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
