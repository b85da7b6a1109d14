//! Error types for `Slotledger` core library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using `Slotledger` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    ParseConfig {
        path: PathBuf,
        source: serde_json::Error,
    },
}
