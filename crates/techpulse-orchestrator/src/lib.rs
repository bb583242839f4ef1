//! C5 — Ingestion Orchestrator: fan-out fetch across Source Adapters, the
//! Deduplicator, a merge into the Catalog Store, and the expanding-window
//! retry protocol (§4.5).

pub mod cancellation;
pub mod cycle;
pub mod error;

pub use cancellation::CancellationToken;
pub use cycle::{AttemptReport, CycleReport, FORCE_REFRESH_WINDOW_DAYS, initial_date_threshold, run_cycle};
pub use error::{OrchestratorError, Result};
