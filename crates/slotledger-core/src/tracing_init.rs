//! Shared tracing/logging initialization.
//!
//! The CLI and any embedding service set up `tracing_subscriber` the same
//! way: an env-filter plus either human-readable or JSON output on stderr.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set. Calling this twice is a
/// no-op for the second call.
pub fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| logging.filter_directive()),
    );
    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
