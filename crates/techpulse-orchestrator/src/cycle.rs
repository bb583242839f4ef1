//! C5 — Ingestion Orchestrator: one cycle end-to-end (§4.5). Fans out to
//! every enabled adapter concurrently, deduplicates and merges the
//! result into the Catalog Store, and retries with an expanding window
//! when a cycle yields too few truly-new records.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tracing::{info, instrument, warn};

use techpulse_core::{CanonicalRecord, CatalogStore, SourceAdapter};

use crate::cancellation::CancellationToken;
use crate::error::{OrchestratorError, Result};

/// A cycle stops widening once it sees at least this many truly-new
/// records in one attempt (§4.5 step 3, "below a threshold (e.g., 1)").
const NEW_RECORD_THRESHOLD: usize = 1;

/// The fixed window sequence a cycle walks through on repeated misses
/// (§4.5 step 3): the initial window, then 14 days, then 30 days. At most
/// three attempts total.
const WIDENED_WINDOWS_DAYS: &[i64] = &[14, 30];

/// Dates older than this are never fetched, regardless of how stale
/// `lastPaperDate` is (§4.5 "a starting dateThreshold ... a floor of
/// '48 hours ago'" — the floor bounds how far back the *first* attempt
/// reaches, not how far back widened attempts may go).
const INITIAL_FLOOR_HOURS: i64 = 48;

/// `force=true` manual refresh resets the threshold to this far back (§4.6, §6).
pub const FORCE_REFRESH_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub window_days: i64,
    pub date_threshold: DateTime<Utc>,
    pub fetched: usize,
    pub new_records: usize,
    pub updated_records: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub attempts: Vec<AttemptReport>,
    pub total_new_records: usize,
    pub total_updated_records: usize,
    pub cancelled: bool,
}

/// The initial `dateThreshold` for a cycle: whichever is older of the
/// catalog's `lastPaperDate` watermark and the 48-hour floor, so a cycle
/// never looks back less than 48 hours even right after a successful run.
pub fn initial_date_threshold(last_paper_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = now - Duration::hours(INITIAL_FLOOR_HOURS);
    match last_paper_date {
        Some(watermark) => watermark.min(floor),
        None => floor,
    }
}

/// Run one adapter fan-out-and-merge cycle, expanding the window up to
/// three attempts total when a cycle yields too few new records.
///
/// `force` resets the starting threshold to [`FORCE_REFRESH_WINDOW_DAYS`]
/// ago instead of deriving it from the catalog watermark (§4.6 manual
/// refresh with `force=true`).
#[instrument(skip(adapters, catalog, cancellation), fields(num_adapters = adapters.len()))]
pub async fn run_cycle(
    adapters: &[Arc<dyn SourceAdapter>],
    catalog: &dyn CatalogStore,
    max_records: usize,
    force: bool,
    cancellation: CancellationToken,
    now: DateTime<Utc>,
) -> Result<CycleReport> {
    let (last_paper_date, _) = catalog.watermarks().await?;
    let starting_threshold = if force {
        now - Duration::days(FORCE_REFRESH_WINDOW_DAYS)
    } else {
        initial_date_threshold(last_paper_date, now)
    };

    let mut report = CycleReport::default();
    let mut window_days = 0i64; // 0 marks "use starting_threshold as-is" for the first attempt
    let mut widen_idx = 0usize;

    loop {
        if cancellation.is_cancelled() {
            report.cancelled = true;
            info!("ingestion cycle observed cancellation between attempts");
            return Ok(report);
        }

        let date_threshold = if window_days == 0 {
            starting_threshold
        } else {
            now - Duration::days(window_days)
        };

        let attempt = run_attempt(adapters, catalog, max_records, date_threshold, window_days, &cancellation).await?;
        if cancellation.is_cancelled() {
            report.cancelled = true;
            report.attempts.push(attempt);
            return Ok(report);
        }

        report.total_new_records += attempt.new_records;
        report.total_updated_records += attempt.updated_records;
        let new_records = attempt.new_records;
        report.attempts.push(attempt);

        if new_records >= NEW_RECORD_THRESHOLD || widen_idx >= WIDENED_WINDOWS_DAYS.len() {
            break;
        }
        window_days = WIDENED_WINDOWS_DAYS[widen_idx];
        widen_idx += 1;
        info!(window_days, "cycle yielded too few new records, widening window");
    }

    catalog.record_fetch(now).await?;
    Ok(report)
}

/// One fan-out-fetch-dedup-merge attempt at a fixed `date_threshold`.
async fn run_attempt(
    adapters: &[Arc<dyn SourceAdapter>],
    catalog: &dyn CatalogStore,
    max_records: usize,
    date_threshold: DateTime<Utc>,
    window_days: i64,
    cancellation: &CancellationToken,
) -> Result<AttemptReport> {
    if cancellation.is_cancelled() {
        return Err(OrchestratorError::Cancelled);
    }

    let per_adapter_limit = (max_records / adapters.len().max(1)).max(1);
    let fetches = adapters.iter().map(|adapter| {
        let adapter = Arc::clone(adapter);
        async move {
            match adapter.fetch_latest(per_adapter_limit, date_threshold).await {
                Ok(records) => records,
                Err(err) => {
                    warn!(source = adapter.name(), error = %err, "adapter fetch failed, treating as a partial (empty) result");
                    Vec::new()
                }
            }
        }
    });
    let results: Vec<Vec<CanonicalRecord>> = join_all(fetches).await;
    let fetched: Vec<CanonicalRecord> = results.into_iter().flatten().collect();
    let fetched_count = fetched.len();

    if cancellation.is_cancelled() {
        return Err(OrchestratorError::Cancelled);
    }

    let dedup_outcome = techpulse_dedup::dedupe_batch(fetched, catalog).await?;
    let new_records = dedup_outcome.new_records.len();
    let updated_records = dedup_outcome.updates.len();
    let merge_outcome = catalog.merge(dedup_outcome.into_merged()).await?;

    info!(
        window_days,
        date_threshold = %date_threshold,
        fetched = fetched_count,
        new_records,
        updated_records,
        store_new = merge_outcome.new_records,
        store_updated = merge_outcome.updated_records,
        "ingestion cycle attempt completed"
    );

    Ok(AttemptReport {
        window_days,
        date_threshold,
        fetched: fetched_count,
        new_records,
        updated_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use techpulse_core::{ExternalIds, MergeOutcome, RecordType, Result as CoreResult};

    struct StaticAdapter {
        name: String,
        records: Vec<CanonicalRecord>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceAdapter for StaticAdapter {
        fn name(&self) -> &str {
            &self.name
        }
        async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> CoreResult<Vec<CanonicalRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .records
                .iter()
                .filter(|r| r.published >= date_threshold)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    struct InMemoryCatalog {
        records: Mutex<HashMap<String, CanonicalRecord>>,
        last_fetch: Mutex<Option<DateTime<Utc>>>,
    }

    impl InMemoryCatalog {
        fn empty() -> Self {
            Self { records: Mutex::new(HashMap::new()), last_fetch: Mutex::new(None) }
        }
    }

    #[async_trait]
    impl CatalogStore for InMemoryCatalog {
        async fn merge(&self, records: Vec<CanonicalRecord>) -> CoreResult<MergeOutcome> {
            let mut store = self.records.lock().unwrap();
            let mut outcome = MergeOutcome::default();
            for r in records {
                if store.insert(r.id.clone(), r).is_some() {
                    outcome.updated_records += 1;
                } else {
                    outcome.new_records += 1;
                }
            }
            Ok(outcome)
        }
        async fn get(&self, id: &str) -> CoreResult<Option<CanonicalRecord>> {
            Ok(self.records.lock().unwrap().get(id).cloned())
        }
        async fn find_by_external_id(&self, namespace: &str, value: &str) -> CoreResult<Option<CanonicalRecord>> {
            Ok(self.records.lock().unwrap().values().find(|r| r.external_ids.get(namespace).map(|v| v == value).unwrap_or(false)).cloned())
        }
        async fn find_by_title_fingerprint(&self, fingerprint: &str) -> CoreResult<Option<CanonicalRecord>> {
            Ok(self.records.lock().unwrap().values().find(|r| techpulse_core::normalize_title_fingerprint(&r.title) == fingerprint).cloned())
        }
        async fn snapshot(&self) -> CoreResult<Vec<CanonicalRecord>> {
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }
        async fn watermarks(&self) -> CoreResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
            Ok((None, *self.last_fetch.lock().unwrap()))
        }
        async fn record_fetch(&self, fetch_time: DateTime<Utc>) -> CoreResult<()> {
            *self.last_fetch.lock().unwrap() = Some(fetch_time);
            Ok(())
        }
        async fn len(&self) -> CoreResult<usize> {
            Ok(self.records.lock().unwrap().len())
        }
    }

    fn paper(id: &str, published: DateTime<Utc>) -> CanonicalRecord {
        let mut ids = ExternalIds::new();
        ids.insert("arxiv".to_string(), id.to_string());
        CanonicalRecord {
            id: format!("arxiv:{id}"),
            record_type: RecordType::Paper,
            title: format!("Paper {id}"),
            summary: String::new(),
            published,
            updated: published,
            date_fidelity: Default::default(),
            authors: vec![],
            link: format!("https://example.com/{id}"),
            pdf_link: None,
            venue: String::new(),
            tags: Default::default(),
            categories: Default::default(),
            citations: 0,
            external_ids: ids,
            technologies: Default::default(),
            industries: Default::default(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn initial_threshold_never_more_recent_than_48h_floor() {
        let now = Utc::now();
        let recent_watermark = now - Duration::hours(1);
        let threshold = initial_date_threshold(Some(recent_watermark), now);
        assert!(threshold <= now - Duration::hours(INITIAL_FLOOR_HOURS));
    }

    #[test]
    fn initial_threshold_uses_stale_watermark_when_older_than_floor() {
        let now = Utc::now();
        let stale_watermark = now - Duration::days(10);
        let threshold = initial_date_threshold(Some(stale_watermark), now);
        assert_eq!(threshold, stale_watermark);
    }

    #[tokio::test]
    async fn s1_scenario_two_adapters_one_overlap() {
        // All publish timestamps sit inside the 48-hour initial floor so
        // one attempt admits every record, mirroring the scenario's
        // single-cycle expectation.
        let now = Utc::now();
        let a1 = paper("2401.00001", now - Duration::hours(6));
        let a2 = paper("2401.00002", now - Duration::hours(12));
        let a3 = paper("2401.00003", now - Duration::hours(18));

        let mut b2 = paper("2401.00002", now - Duration::hours(12));
        b2.external_ids.clear();
        b2.external_ids.insert("doi".to_string(), "10.1/x".to_string());
        b2.id = "doi:10.1/x".to_string();
        let b_other1 = paper("b-other-1", now - Duration::hours(6));
        let b_other2 = paper("b-other-2", now - Duration::hours(6));

        let adapter_a = Arc::new(StaticAdapter {
            name: "a".to_string(),
            records: vec![a1, a2, a3],
            calls: AtomicUsize::new(0),
        });
        let adapter_b = Arc::new(StaticAdapter {
            name: "b".to_string(),
            records: vec![b2, b_other1, b_other2],
            calls: AtomicUsize::new(0),
        });

        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![adapter_a, adapter_b];
        let catalog = InMemoryCatalog::empty();

        let report = run_cycle(&adapters, &catalog, 100, false, CancellationToken::new(), now)
            .await
            .unwrap();

        assert_eq!(techpulse_core::CatalogStore::len(&catalog).await.unwrap(), 5);
        assert_eq!(report.total_new_records, 5);
    }

    #[tokio::test]
    async fn expanding_window_stops_after_three_attempts() {
        let now = Utc::now();
        let adapter = Arc::new(StaticAdapter {
            name: "empty".to_string(),
            records: vec![],
            calls: AtomicUsize::new(0),
        });
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![adapter];
        let catalog = InMemoryCatalog::empty();

        let report = run_cycle(&adapters, &catalog, 100, false, CancellationToken::new(), now)
            .await
            .unwrap();
        assert_eq!(report.attempts.len(), 3);
        assert_eq!(report.attempts[1].window_days, 14);
        assert_eq!(report.attempts[2].window_days, 30);
    }

    #[tokio::test]
    async fn cancellation_between_attempts_stops_the_cycle() {
        let now = Utc::now();
        let adapter = Arc::new(StaticAdapter {
            name: "empty".to_string(),
            records: vec![],
            calls: AtomicUsize::new(0),
        });
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![adapter];
        let catalog = InMemoryCatalog::empty();
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let report = run_cycle(&adapters, &catalog, 100, false, cancellation, now).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.attempts.len(), 0);
    }

    #[tokio::test]
    async fn force_refresh_uses_seven_day_window() {
        let now = Utc::now();
        let fresh = paper("force-1", now - Duration::days(3));
        let adapter = Arc::new(StaticAdapter {
            name: "a".to_string(),
            records: vec![fresh],
            calls: AtomicUsize::new(0),
        });
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![adapter];
        let catalog = InMemoryCatalog::empty();

        let report = run_cycle(&adapters, &catalog, 100, true, CancellationToken::new(), now)
            .await
            .unwrap();
        assert_eq!(report.total_new_records, 1);
        assert_eq!(report.attempts[0].date_threshold, now - Duration::days(FORCE_REFRESH_WINDOW_DAYS));
    }
}
