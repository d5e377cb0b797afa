//! Logging initialization.
//!
//! All modules emit structured `tracing` events: interactive paths at
//! `trace!`/`debug!`, job lifecycle at `debug!`, rejected mutations at
//! `warn!`. The host decides whether and how to subscribe; this helper
//! installs a sensible default for binaries and examples.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a formatted `tracing` subscriber filtered by `RUST_LOG`.
///
/// Defaults to `info` when `RUST_LOG` is unset. Safe to call once per
/// process; a second call is a no-op rather than a panic, so tests and
/// embedding hosts that already installed a subscriber are unaffected.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
