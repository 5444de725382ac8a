//! Structured logging for Lambda handlers.
//!
//! Emits one JSON object per event on stdout, where the Lambda service ships
//! it to CloudWatch. The filter comes from `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global subscriber. Safe to call more than once; later calls
/// leave the first subscriber in place.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_current_span(false)
        .without_time()
        .try_init();
}
