//! Tracing subscriber setup.
//!
//! Logs go to stderr so that command output on stdout stays clean. The
//! level defaults to `info` and can be overridden with `RUST_LOG`.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore the error from a second init (tests, embedding callers).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
