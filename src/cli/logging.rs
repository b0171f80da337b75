//! cli::logging
//!
//! Diagnostic logging for the binary.
//!
//! Engine events go to stderr through `tracing-subscriber`. `RUST_LOG`
//! overrides the default filter; `--debug` raises it for this crate.
//! User-facing results are printed by [`crate::ui::output`], not logged.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once.
pub fn init(debug: bool) {
    let default = if debug {
        "translatehub=debug"
    } else {
        "translatehub=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
