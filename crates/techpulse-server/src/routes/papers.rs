//! `/papers/*` handlers (§6).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use techpulse_core::CanonicalRecord;
use techpulse_scheduler::RefreshTrigger;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

use super::ListResponse;

fn default_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub venue: Option<String>,
    pub search: Option<String>,
    /// Matches a record's `type` (paper/news/github/patent/job/podcast).
    pub source: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

async fn filtered_records(state: &AppState, query: &ListQuery) -> ApiResult<Vec<CanonicalRecord>> {
    let records = state.catalog.snapshot().await.map_err(ApiError::from)?;
    let search_lower = query.search.as_ref().map(|s| s.to_lowercase());

    let filtered = records
        .into_iter()
        .filter(|r| {
            query
                .category
                .as_ref()
                .is_none_or(|c| r.categories.contains(c) || r.tags.contains(c))
        })
        .filter(|r| query.venue.as_ref().is_none_or(|v| &r.venue == v))
        .filter(|r| {
            query
                .source
                .as_ref()
                .is_none_or(|s| format!("{:?}", r.record_type).eq_ignore_ascii_case(s))
        })
        .filter(|r| {
            search_lower
                .as_ref()
                .is_none_or(|q| r.title.to_lowercase().contains(q) || r.summary.to_lowercase().contains(q))
        })
        .collect();
    Ok(filtered)
}

pub async fn list(State(state): State<Arc<AppState>>, Query(query): Query<ListQuery>) -> ApiResult<Json<ListResponse<CanonicalRecord>>> {
    let mut records = filtered_records(&state, &query).await?;
    records.sort_by(|a, b| b.published.cmp(&a.published));
    let total = records.len();

    let (_, last_update) = state.catalog.watermarks().await.map_err(ApiError::from)?;

    let page: Vec<CanonicalRecord> = records.into_iter().skip(query.offset).take(query.limit).collect();
    Ok(Json(ListResponse::new(page, total, last_update, query.offset)))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "month".to_string()
}

#[derive(Debug, Serialize)]
pub struct IndustryCount {
    pub industry: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub period: String,
    pub total: usize,
    pub by_industry: Vec<IndustryCount>,
}

pub async fn stats(State(state): State<Arc<AppState>>, Query(query): Query<StatsQuery>) -> ApiResult<Json<StatsResponse>> {
    let window_days = match query.period.as_str() {
        "month" => 30,
        "quarter" => 90,
        "year" => 365,
        other => return Err(ApiError::BadRequest(format!("unrecognized period '{other}'"))),
    };

    let records = state.catalog.snapshot().await.map_err(ApiError::from)?;
    let floor = chrono::Utc::now() - chrono::Duration::days(window_days);
    let in_window: Vec<&CanonicalRecord> = records.iter().filter(|r| r.published >= floor).collect();

    let mut counts: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for record in &in_window {
        for industry in &record.industries {
            *counts.entry(industry.clone()).or_insert(0) += 1;
        }
    }
    let mut by_industry: Vec<IndustryCount> = counts
        .into_iter()
        .map(|(industry, count)| IndustryCount { industry, count })
        .collect();
    by_industry.sort_by(|a, b| b.count.cmp(&a.count));

    Ok(Json(StatsResponse {
        period: query.period,
        total: in_window.len(),
        by_industry,
    }))
}

pub async fn get_one(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<CanonicalRecord>> {
    let record = state
        .catalog
        .get(&id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("no record with id '{id}'")))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub ids: Vec<String>,
}

pub async fn batch(State(state): State<Arc<AppState>>, Json(request): Json<BatchRequest>) -> ApiResult<Json<Vec<CanonicalRecord>>> {
    let mut out = Vec::with_capacity(request.ids.len());
    for id in &request.ids {
        if let Some(record) = state.catalog.get(id).await.map_err(ApiError::from)? {
            out.push(record);
        }
    }
    Ok(Json(out))
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct AutocompleteSuggestion {
    pub id: String,
    pub title: String,
}

pub async fn autocomplete(State(state): State<Arc<AppState>>, Query(query): Query<AutocompleteQuery>) -> ApiResult<Json<Vec<AutocompleteSuggestion>>> {
    if query.q.trim().chars().count() < 2 {
        return Err(ApiError::BadRequest("q must be at least 2 characters".to_string()));
    }

    let records = state.catalog.snapshot().await.map_err(ApiError::from)?;
    let needle = query.q.to_lowercase();
    let mut suggestions: Vec<AutocompleteSuggestion> = records
        .into_iter()
        .filter(|r| r.title.to_lowercase().contains(&needle))
        .map(|r| AutocompleteSuggestion { id: r.id, title: r.title })
        .collect();
    suggestions.truncate(20);
    Ok(Json(suggestions))
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
}

pub async fn refresh(State(state): State<Arc<AppState>>, Query(query): Query<RefreshQuery>) -> Json<RefreshResponse> {
    let status = match state.scheduler().trigger_catalog_refresh(query.force) {
        RefreshTrigger::Started => "started",
        RefreshTrigger::AlreadyRunning => "already_running",
    };
    Json(RefreshResponse { status })
}
