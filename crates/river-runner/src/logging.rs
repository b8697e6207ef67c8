/*!
Logging setup for the command line front end.

Log lines go to stderr so the output table can be piped from stdout.
*/

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global fmt subscriber, filtered by `RUST_LOG`.
///
/// If RUST_LOG is not set, a default is set first: debug output for this workspace's crates in
/// debug builds, info otherwise.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "info,river_runner=debug,river_runner_lib=debug");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::debug!(
        "Logging initialized with RUST_LOG={}",
        std::env::var("RUST_LOG").unwrap_or_default()
    );
}
