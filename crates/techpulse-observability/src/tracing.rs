//! Tracing/log initialization (§B.3): `tracing` + `tracing-subscriber` with
//! env-filter, JSON formatting in non-interactive mode, initialized once at
//! binary startup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub default_filter: String,
    /// JSON-formatted log lines (for ingestion by a log pipeline) vs. a
    /// human-readable compact format (for interactive use).
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            json: false,
        }
    }
}

/// Initialize the global tracing subscriber. Call once at process startup.
pub fn init_tracing(config: TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.clone()));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }
}
