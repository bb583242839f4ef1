//! `/insights/*` handlers (§6): served from the cached `AnalyticsSnapshot`
//! when the requested `timeWindow` matches what was last computed, and
//! recomputed live over the full catalog otherwise.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use techpulse_analytics::{EmergingTechnology, IndustryGrowth, LeaderQuote, TechnologyMomentum, TechnologyRead};
use techpulse_core::CanonicalRecord;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

use super::ListResponse;

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    #[serde(rename = "timeWindow")]
    pub time_window: Option<i64>,
}

async fn records_if_window_differs(state: &AppState, requested_window: Option<i64>) -> ApiResult<Option<(Vec<CanonicalRecord>, i64)>> {
    let cached = state.analytics_snapshot().await;
    let window = requested_window.unwrap_or(state.window_days);

    let needs_recompute = match &cached {
        Some(snapshot) => requested_window.is_some() && requested_window != Some(snapshot.window_days),
        None => true,
    };

    if !needs_recompute {
        return Ok(None);
    }

    let records = state.catalog.snapshot().await.map_err(ApiError::from)?;
    Ok(Some((records, window)))
}

pub async fn technologies(State(state): State<Arc<AppState>>, Query(query): Query<WindowQuery>) -> ApiResult<Json<ListResponse<TechnologyMomentum>>> {
    let momentum = match records_if_window_differs(&state, query.time_window).await? {
        Some((records, window)) => {
            let signals = techpulse_signals::all_signals(&records);
            techpulse_analytics::rank_momentum(&signals, window, chrono::Utc::now())
        }
        None => state.analytics_snapshot().await.map(|s| s.momentum).unwrap_or_default(),
    };
    let total = momentum.len();
    Ok(Json(ListResponse::new(momentum, total, None, 0)))
}

pub async fn industries(State(state): State<Arc<AppState>>, Query(query): Query<WindowQuery>) -> ApiResult<Json<ListResponse<IndustryGrowth>>> {
    let growth = match records_if_window_differs(&state, query.time_window).await? {
        Some((records, _window)) => {
            let signals = techpulse_signals::all_signals(&records);
            techpulse_analytics::rank_growth(&signals, None, chrono::Utc::now())
        }
        None => state.analytics_snapshot().await.map(|s| s.growth).unwrap_or_default(),
    };
    let total = growth.len();
    Ok(Json(ListResponse::new(growth, total, None, 0)))
}

pub async fn emerging(State(state): State<Arc<AppState>>, Query(query): Query<WindowQuery>) -> ApiResult<Json<ListResponse<EmergingTechnology>>> {
    let emerging = match records_if_window_differs(&state, query.time_window).await? {
        Some((records, window)) => {
            let signals = techpulse_signals::all_signals(&records);
            let leader_quotes = techpulse_analytics::extract_leader_quotes(&records);
            techpulse_analytics::rank_emerging(
                &signals,
                |tech| techpulse_analytics::mention_count(&leader_quotes, tech),
                window,
                chrono::Utc::now(),
            )
        }
        None => state.analytics_snapshot().await.map(|s| s.emerging).unwrap_or_default(),
    };
    let total = emerging.len();
    Ok(Json(ListResponse::new(emerging, total, None, 0)))
}

pub async fn predictions(State(state): State<Arc<AppState>>) -> Json<ListResponse<TechnologyRead>> {
    let predictions = state.analytics_snapshot().await.map(|s| s.predictions).unwrap_or_default();
    let total = predictions.len();
    Json(ListResponse::new(predictions, total, None, 0))
}

pub async fn leader_quotes(State(state): State<Arc<AppState>>) -> Json<ListResponse<LeaderQuote>> {
    let quotes = state.analytics_snapshot().await.map(|s| s.leader_quotes).unwrap_or_default();
    let total = quotes.len();
    Json(ListResponse::new(quotes, total, None, 0))
}

#[derive(Debug, Deserialize)]
pub struct CombinedSignalQuery {
    pub technology: String,
    #[serde(rename = "timeWindow")]
    pub time_window: Option<i64>,
}

pub async fn combined_signal(State(state): State<Arc<AppState>>, Query(query): Query<CombinedSignalQuery>) -> ApiResult<Json<Vec<techpulse_signals::Signal>>> {
    if query.technology.trim().is_empty() {
        return Err(ApiError::BadRequest("technology is required".to_string()));
    }
    let records = state.catalog.snapshot().await.map_err(ApiError::from)?;
    let window = query.time_window.unwrap_or(state.window_days);
    let signals = techpulse_analytics::combined_signal(&records, &query.technology, window, chrono::Utc::now());
    Ok(Json(signals))
}
