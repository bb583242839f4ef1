//! Catalog Store error type (§B.2): structured variants so callers can
//! pattern-match the degrade-vs-abort decision from §7 instead of
//! inspecting strings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("persistence failed after retry: {0}")]
    PersistFailed(String),

    #[error("durable storage was absent or malformed: {0}")]
    LoadMalformed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for techpulse_core::Error {
    fn from(err: StoreError) -> Self {
        techpulse_core::Error::Store(err.to_string())
    }
}
