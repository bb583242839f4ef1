//! Ingestion Orchestrator error type (§B.2). A cycle never hard-fails on
//! adapter or persistence trouble (§7) — this enum exists for the narrow
//! set of conditions that genuinely abort a cycle (cancellation, a
//! catalog merge that itself failed after its own internal retry).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("cycle cancelled")]
    Cancelled,

    #[error("catalog store error: {0}")]
    Store(#[from] techpulse_core::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
