//! Error types for `techpulse-sources`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed XML payload: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

impl From<SourceError> for techpulse_core::Error {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::RateLimited { retry_after_secs } => {
                techpulse_core::Error::RateLimited { retry_after_secs }
            }
            other => techpulse_core::Error::Source(other.to_string()),
        }
    }
}
