//! Logging configuration for mddb.

use tracing_subscriber::EnvFilter;

/// Initializes logging to stderr, keeping stdout free for query output.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
