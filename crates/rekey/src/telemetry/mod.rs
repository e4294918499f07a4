//! Logging for the rekey tool.
//!
//! Output is JSON on stderr, with the fields of the enclosing `migrate` span on
//! every event. Keys are only ever logged by fingerprint.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG`, when set, wins over `log_level`.
///
/// # Errors
///
/// Returns an error if `log_level` is not a valid filter or a subscriber is
/// already installed.
pub fn init(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(log_level)?,
    };

    tracing_subscriber::fmt()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise rekey logging: {e}"))
}

/// Parse `LOG_LEVEL` strictly.
fn level_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(log_level)
        .with_context(|| format!("LOG_LEVEL {log_level:?} is not a valid filter"))
}
