//! Shared `tracing` subscriber setup for both binaries. Structured,
//! per-session output (peer address, sequence state) replaces ad-hoc
//! `println!` logging, which doesn't compose once multiple sessions run
//! concurrently and their log lines interleave.

use tracing_subscriber::EnvFilter;

/// Installs a global subscriber. Level defaults to `info`, overridable via
/// the `RUST_LOG` environment variable (e.g. `RUST_LOG=debug`).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
