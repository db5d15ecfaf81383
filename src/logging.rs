//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over the configured level so individual
//! targets can still be tuned at runtime.

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::LogEncoding;

/// Install the global subscriber.
///
/// # Errors
///
/// Returns a message if the level is not a valid filter or a global
/// subscriber is already installed.
pub fn init_logging(level: &str, encoding: LogEncoding) -> Result<(), String> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{level}': {e}"))?,
    };

    let result = match encoding {
        LogEncoding::Console => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        LogEncoding::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(false)
            .try_init(),
    };

    result.map_err(|e| format!("Failed to install tracing subscriber: {e}"))
}

/// Install the global subscriber unless one is already set.
pub fn try_init_logging(level: &str, encoding: LogEncoding) {
    if let Err(e) = init_logging(level, encoding) {
        debug!(error = %e, "Keeping existing tracing subscriber");
    }
}
