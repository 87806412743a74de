//! Tracing setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured log level
pub const LOG_ENV: &str = "TETHER_LOG";

/// Filter from `TETHER_LOG` if set and valid, else the configured level
pub fn filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber, logging to stderr
///
/// Output on stdout stays machine-readable in JSON and quiet formats.
pub fn init(configured: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(configured))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
