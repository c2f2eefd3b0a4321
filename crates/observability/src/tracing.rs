//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize the process-wide tracing subscriber.
///
/// JSON lines with timestamps, filtered via `RUST_LOG` (defaults to `info`).
/// Subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
