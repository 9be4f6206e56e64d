//! Tracing setup for embedders
//!
//! The library itself only emits `tracing` events; nothing is collected
//! unless a subscriber is installed. Embedders and examples that want the
//! events on stderr can call [`init_tracing`] once at startup.

use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Falls back to `info` when `RUST_LOG` is unset. Safe to call more than
/// once; later calls are ignored if a subscriber is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .ok();
}
