//! Tracing setup for worker processes.

/// Initialize the global tracing subscriber, honoring `RUST_LOG` and
/// defaulting to `info` with debug output from the lcfleet crates.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lcfleet=debug".parse().unwrap()),
        )
        .init();
}
