//! `/health` and `/metrics` HTTP endpoints (§6, §7).
//!
//! `/health` must report cache size, last fetch time, process uptime, and
//! whether a refresh is currently in flight — never an error, even when the
//! catalog itself is empty or a refresh is mid-cycle.

use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use prometheus::TextEncoder;
use serde::Serialize;

use crate::metrics::Metrics;

/// Supplies the live facts `/health` reports. Implemented by the server
/// binary over the Catalog Store and Scheduler.
pub trait HealthSnapshot: Send + Sync {
    fn cache_size(&self) -> usize;
    fn last_fetch_time(&self) -> Option<DateTime<Utc>>;
    fn refresh_in_flight(&self) -> bool;
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub cache_size: usize,
    pub last_fetch_time: Option<DateTime<Utc>>,
    pub uptime_seconds: u64,
    pub refresh_in_flight: bool,
}

#[derive(Clone)]
pub struct HealthState {
    pub metrics: Arc<Metrics>,
    pub snapshot: Arc<dyn HealthSnapshot>,
    started_at: Instant,
}

impl HealthState {
    pub fn new(metrics: Arc<Metrics>, snapshot: Arc<dyn HealthSnapshot>) -> Self {
        Self {
            metrics,
            snapshot,
            started_at: Instant::now(),
        }
    }
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok".to_string(),
        cache_size: state.snapshot.cache_size(),
        last_fetch_time: state.snapshot.last_fetch_time(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        refresh_in_flight: state.snapshot.refresh_in_flight(),
    };
    (StatusCode::OK, Json(body))
}

async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = state.metrics.registry().gather();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {err}"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct FakeSnapshot {
        size: AtomicUsize,
        in_flight: AtomicBool,
    }

    impl HealthSnapshot for FakeSnapshot {
        fn cache_size(&self) -> usize {
            self.size.load(Ordering::SeqCst)
        }
        fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
            None
        }
        fn refresh_in_flight(&self) -> bool {
            self.in_flight.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn health_reports_cache_size_and_in_flight_state() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let snapshot = Arc::new(FakeSnapshot {
            size: AtomicUsize::new(42),
            in_flight: AtomicBool::new(true),
        });
        let state = HealthState::new(metrics, snapshot);
        let app = health_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.cache_size, 42);
        assert!(parsed.refresh_in_flight);
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_prometheus_text() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let snapshot = Arc::new(FakeSnapshot {
            size: AtomicUsize::new(0),
            in_flight: AtomicBool::new(false),
        });
        let state = HealthState::new(metrics, snapshot);
        let app = health_router(state);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
