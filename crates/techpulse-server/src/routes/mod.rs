//! The §6 HTTP surface: `/papers/*` and `/insights/*`. `/health`,
//! `/healthz`, and `/metrics` are served by `techpulse_observability`'s
//! own router, merged alongside this one in `main.rs`.

pub mod insights;
pub mod papers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use serde::Serialize;

use crate::app::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/papers", get(papers::list))
        .route("/papers/stats", get(papers::stats))
        .route("/papers/autocomplete", get(papers::autocomplete))
        .route("/papers/batch", post(papers::batch))
        .route("/papers/refresh", post(papers::refresh))
        .route("/papers/{id}", get(papers::get_one))
        .route("/insights/technologies", get(insights::technologies))
        .route("/insights/industries", get(insights::industries))
        .route("/insights/emerging", get(insights::emerging))
        .route("/insights/predictions", get(insights::predictions))
        .route("/insights/leader-quotes", get(insights::leader_quotes))
        .route("/insights/combined-signal", get(insights::combined_signal))
        .with_state(state)
}

/// The common list-endpoint envelope (§6): `{items[], total, lastUpdate, hasMore}`.
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
    #[serde(rename = "lastUpdate")]
    pub last_update: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

impl<T: Serialize> ListResponse<T> {
    /// `items` must already be the requested page (post offset/limit
    /// slicing); `total` is the filtered-but-unpaginated count.
    pub fn new(items: Vec<T>, total: usize, last_update: Option<chrono::DateTime<chrono::Utc>>, offset: usize) -> Self {
        let has_more = offset + items.len() < total;
        Self {
            items,
            total,
            last_update,
            has_more,
        }
    }
}
