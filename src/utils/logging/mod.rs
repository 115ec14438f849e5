//! Structured logging setup
//!
//! Initializes a `tracing_subscriber` pipeline driven by `RUST_LOG`, with a
//! sane default filter when the variable is unset. `tracing-actix-web`
//! attaches a span per request on top of this.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global tracing subscriber
///
/// Reads `RUST_LOG` for per-module filtering (e.g. `ollama_ha_proxy=debug,actix_web=info`);
/// defaults to `info` when unset or unparseable.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();
}

/// Initialize logging with JSON-formatted output, for environments that
/// ingest structured logs (e.g. behind a log shipper).
pub fn init_json_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).json().init();
}
