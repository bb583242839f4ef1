//! Crate-local error type. The Breakdown Extractor never actually returns
//! an error for a missing LLM/embedding provider — see §4.10 — these
//! variants cover genuine failures (malformed input, store I/O surfaced
//! through the caller) rather than "provider unavailable," which is a
//! normal fallback path, not an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BreakdownError {
    #[error("transcript is empty")]
    EmptyTranscript,

    #[error("video metadata is missing required field: {0}")]
    MissingMetadata(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BreakdownError>;
