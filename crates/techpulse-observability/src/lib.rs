//! Observability: metrics, health, and tracing initialization shared by
//! every long-running binary in the workspace (§B.3, §B.4).

pub mod health;
pub mod metrics;
pub mod tracing;

pub use health::{HealthResponse, HealthSnapshot, HealthState, health_router};
pub use metrics::Metrics;
pub use tracing::{TracingConfig, init_tracing};
