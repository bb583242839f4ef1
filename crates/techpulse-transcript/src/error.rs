//! Crate-local error type for the transcript acquisition fallback chain (§4.9).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptError {
    /// Age-restricted, private, or 403-blocked: short-circuits remaining
    /// download-based methods rather than advancing to the next one.
    #[error("access blocked: {0}")]
    AccessBlocked(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned unexpected status {status}")]
    Upstream { status: u16 },

    #[error("audio download command failed: {0}")]
    Extraction(String),

    #[error("transcription polling timed out")]
    PollTimeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TranscriptError>;
