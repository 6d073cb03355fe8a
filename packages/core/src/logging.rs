use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging for the binary. Call once, before anything logs.
///
/// `RUST_LOG` overrides the default `info` filter. Output goes to stderr so
/// `estimate --json` keeps stdout clean.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    debug!("Logging initialized");
}
