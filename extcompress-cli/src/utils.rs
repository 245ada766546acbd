//! Utility functions for the CLI.

use extcompress_filter::{FilterRegistry, Result};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise warnings only, or debug output with
/// `--verbose`. Logs go to stderr so streamed payloads on stdout stay clean.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build the filter registry from `--config`, or the built-in defaults.
pub fn load_registry(config: Option<&Path>) -> Result<FilterRegistry> {
    match config {
        Some(path) => {
            debug!(path = %path.display(), "Loading filter configuration");
            FilterRegistry::from_path(path)
        }
        None => Ok(FilterRegistry::with_defaults()),
    }
}
