use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelationalError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("invalid snapshot directory name: {0}")]
    InvalidDirectoryName(String),
}

pub type Result<T> = std::result::Result<T, RelationalError>;

impl From<RelationalError> for techpulse_core::Error {
    fn from(err: RelationalError) -> Self {
        techpulse_core::Error::Store(err.to_string())
    }
}
