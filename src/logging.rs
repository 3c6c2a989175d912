/// Log output for the monitor.
///
/// All modules emit `tracing` events with structured fields; this installs
/// the one subscriber that prints them. The filter comes from `RUST_LOG`
/// (e.g. `RUST_LOG=kinneret_monitor=debug`) and defaults to `info`.

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "info";

/// Builds the filter from `RUST_LOG`, falling back to `info` when the
/// variable is unset or unparseable.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs the global fmt subscriber. Calling it a second time is a no-op.
pub fn init_logging() {
    let installed = fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("logging initialized");
    }
}
