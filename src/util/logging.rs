//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "SENSOR_ARCHIVE_LOG";

/// Install a formatted tracing subscriber filtered by [`LOG_ENV`].
///
/// Falls back to `warn` when the variable is unset or unparsable. Safe to
/// call more than once; later calls leave the first subscriber in place.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
