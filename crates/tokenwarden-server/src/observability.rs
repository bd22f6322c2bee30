// Tracing initialization driven by the `[logging]` section of the config.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Installs the global subscriber at the configured level.
///
/// `RUST_LOG` overrides `logging.level` when it is set and parses.
pub fn init_tracing(logging: &LoggingConfig) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(logging, rust_log.as_deref());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

/// Picks the filter directives for `logging`, letting `rust_log` win.
pub fn build_filter(logging: &LoggingConfig, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(logging.level.to_ascii_lowercase()))
}
