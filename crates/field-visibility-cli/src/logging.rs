//! Logging setup for the CLI using `tracing` and `tracing-subscriber`.
//!
//! Events go to stderr so command output on stdout stays machine readable.
//! `RUST_LOG` takes precedence over the `-v` flags.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

/// Maps the number of `-v` flags to a level: warnings by default.
pub fn level_from_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn init_logging(verbose: u8) {
    let level = level_from_verbosity(verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    // A subscriber may already be installed when embedded; keep it.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
