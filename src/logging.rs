//! Logging configuration for odps-review.
//!
//! Logs go to stderr so that stdout carries only command results.

use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Initializes logging to stderr.
///
/// `verbose` lowers the default level to `debug`; an explicit `RUST_LOG`
/// always wins.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(default_env_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the env filter, falling back to the default level.
fn default_env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    })
}
