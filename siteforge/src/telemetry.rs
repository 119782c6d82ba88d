//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber with `RUST_LOG` filtering.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
