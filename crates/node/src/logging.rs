use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for the node. `RUST_LOG` overrides
/// the default `info` level.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
