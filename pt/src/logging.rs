//! Tracing setup

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a control surface process. Respects `RUST_LOG`,
/// defaulting to `info`. Repeat calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
