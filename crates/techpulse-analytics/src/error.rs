//! Analytics Engine error type (§B.2).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid snapshot directory name: {0}")]
    InvalidSnapshotName(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl From<techpulse_store::StoreError> for AnalyticsError {
    fn from(err: techpulse_store::StoreError) -> Self {
        AnalyticsError::Internal(err.to_string())
    }
}

impl From<AnalyticsError> for techpulse_core::Error {
    fn from(err: AnalyticsError) -> Self {
        techpulse_core::Error::Internal(err.to_string())
    }
}
