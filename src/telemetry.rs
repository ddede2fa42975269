use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// Filter is taken from `RUST_LOG`, falling back to `info`. Host processes
/// that install their own subscriber can skip this entirely.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
