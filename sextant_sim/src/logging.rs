// sextant_sim/src/logging.rs

use tracing_subscriber::EnvFilter;

/// Used when neither `--log` nor `RUST_LOG` is given.
pub const DEFAULT_LOG_FILTER: &str = "info,sextant_core=debug";

/// The filter for `directive`, else `RUST_LOG`, else the default.
///
/// An unparsable directive falls back to the default filter.
pub fn build_filter(directive: Option<&str>) -> EnvFilter {
    match directive {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global `tracing` subscriber.
pub fn init_logging(directive: Option<&str>) {
    // A subscriber may already be installed, e.g. by a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(directive))
        .with_thread_names(true)
        .try_init();
}
