//! Tracing setup shared by the goi binaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging at the default `info` level
///
/// `RUST_LOG` overrides the level as usual.
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with an explicit default level (`debug`, `info`,
/// `warn`, `error`), still honoring `RUST_LOG` when it is set
///
/// Output goes to stderr in the compact single-line format so review
/// prompts on stdout stay clean.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}
