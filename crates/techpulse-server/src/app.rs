//! Shared application state: the dependency-injection root every HTTP
//! handler and the Scheduler's refresh tasks read from. Holds the Catalog
//! Store, Source Adapters, the Analytics Engine's cached snapshot, the
//! optional LLM/embedding/transcript pipeline, and the shared
//! [`CancellationToken`] that both graceful shutdown and every ingestion
//! cycle observe.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock as StdRwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use techpulse_analytics::AnalyticsSnapshot;
use techpulse_core::{CatalogStore, EmbeddingClient, LlmClient, RecordType, SourceAdapter};
use techpulse_observability::{HealthSnapshot, Metrics};
use techpulse_orchestrator::CancellationToken;
use techpulse_scheduler::{AnalyticsRefreshTask, CatalogRefreshTask, Scheduler};
use techpulse_transcript::TranscriptPipeline;

use crate::bootstrap::{Bootstrapped, SnapshotCache};
use crate::config::ServerConfig;

pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
    pub snapshots: SnapshotCache,
    pub analytics: RwLock<Option<AnalyticsSnapshot>>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub embedder: Option<Arc<dyn EmbeddingClient>>,
    pub transcript_pipeline: Option<Arc<TranscriptPipeline>>,
    pub metrics: Arc<Metrics>,
    pub cancellation: CancellationToken,
    pub max_records: usize,
    pub window_days: i64,
    /// Mirrors the catalog's size and last-fetch watermark so `/health`
    /// (a synchronous trait) never has to block on the Catalog Store's
    /// async lock; refreshed at the end of every catalog-refresh cycle.
    cache_size: AtomicUsize,
    last_fetch_time: StdRwLock<Option<DateTime<Utc>>>,
    /// Set once, synchronously, right after construction — before the
    /// router starts serving requests. `Scheduler` needs `Arc<AppState>`
    /// for its refresh tasks and `AppState` needs `Arc<Scheduler>` for
    /// `/papers/refresh`, so the two are wired together after both exist
    /// rather than threaded through the constructor. This creates a
    /// deliberate `Arc` cycle (`AppState` <-> `Scheduler`) that lives for
    /// the whole process and is never meant to be torn down early.
    pub scheduler: OnceLock<Arc<Scheduler>>,
}

impl AppState {
    pub fn new(bootstrapped: Bootstrapped, config: &ServerConfig, metrics: Arc<Metrics>) -> Arc<Self> {
        Arc::new(Self {
            catalog: bootstrapped.catalog,
            adapters: bootstrapped.adapters,
            snapshots: bootstrapped.snapshots,
            analytics: RwLock::new(None),
            llm: bootstrapped.llm,
            embedder: bootstrapped.embedder,
            transcript_pipeline: bootstrapped.transcript_pipeline,
            metrics,
            cancellation: CancellationToken::new(),
            max_records: config.max_records,
            window_days: 90,
            cache_size: AtomicUsize::new(0),
            last_fetch_time: StdRwLock::new(None),
            scheduler: OnceLock::new(),
        })
    }

    pub fn scheduler(&self) -> Arc<Scheduler> {
        self.scheduler
            .get()
            .cloned()
            .expect("scheduler attached before the router starts serving")
    }

    pub fn attach_scheduler(&self, scheduler: Arc<Scheduler>) {
        self.scheduler
            .set(scheduler)
            .unwrap_or_else(|_| panic!("attach_scheduler called twice"));
    }

    /// Refresh the values `/health` reports from the Catalog Store's
    /// current state. Called once at startup and after every
    /// catalog-refresh cycle.
    pub async fn refresh_health_snapshot(&self) {
        if let Ok(len) = self.catalog.len().await {
            self.cache_size.store(len, Ordering::Relaxed);
        }
        if let Ok((_, last_fetch)) = self.catalog.watermarks().await {
            *self.last_fetch_time.write().expect("lock poisoned") = last_fetch;
        }
    }

    /// The cached analytics snapshot, loading the most recent durable one
    /// on first access if the process hasn't computed one yet this run.
    pub async fn analytics_snapshot(&self) -> Option<AnalyticsSnapshot> {
        if let Some(snapshot) = self.analytics.read().await.clone() {
            return Some(snapshot);
        }
        match self.snapshots.latest().await {
            Ok(Some(snapshot)) => {
                *self.analytics.write().await = Some(snapshot.clone());
                Some(snapshot)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "failed to load durable analytics snapshot");
                None
            }
        }
    }

    /// Podcast records merged by a catalog-refresh cycle that don't yet
    /// carry a `metadata.breakdown` (§4.10, §9): run the Transcript
    /// Pipeline then the Breakdown Extractor over each, and merge the
    /// enriched record back in. Runs only when a transcript service is
    /// configured; otherwise podcast records stay un-enriched rather than
    /// blocking the rest of the cycle (§4.9's cooperative-degrade policy).
    async fn enrich_new_podcasts(&self) {
        let Some(pipeline) = &self.transcript_pipeline else {
            return;
        };
        let records = match self.catalog.snapshot().await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "failed to snapshot catalog for podcast enrichment");
                return;
            }
        };

        for mut record in records {
            if record.record_type != RecordType::Podcast || record.metadata.contains_key("breakdown") {
                continue;
            }

            let video_id = record
                .external_ids
                .get("youtube")
                .cloned()
                .unwrap_or_else(|| record.id.clone());

            let Some(transcript) = pipeline.fetch_transcript(&video_id).await else {
                continue;
            };

            let video = techpulse_breakdown::VideoMetadata {
                video_id: video_id.clone(),
                title: record.title.clone(),
            };
            let llm_ref = self.llm.as_deref();
            match techpulse_breakdown::build_breakdown(&video, &transcript, llm_ref).await {
                Ok(breakdown) => {
                    let value = match serde_json::to_value(&breakdown) {
                        Ok(v) => v,
                        Err(err) => {
                            warn!(video_id, error = %err, "failed to serialize breakdown");
                            continue;
                        }
                    };
                    record.metadata.insert("breakdown".to_string(), value);
                    if let Err(err) = self.catalog.merge(vec![record]).await {
                        warn!(video_id, error = %err, "failed to merge enriched podcast record");
                    }
                }
                Err(err) => {
                    warn!(video_id, error = %err, "breakdown extraction failed");
                }
            }
        }
    }
}

impl HealthSnapshot for AppState {
    fn cache_size(&self) -> usize {
        self.cache_size.load(Ordering::Relaxed)
    }

    fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        *self.last_fetch_time.read().expect("lock poisoned")
    }

    fn refresh_in_flight(&self) -> bool {
        self.scheduler
            .get()
            .map(|s| s.catalog_refresh_in_flight() || s.analytics_refresh_in_flight())
            .unwrap_or(false)
    }
}

#[async_trait]
impl CatalogRefreshTask for AppState {
    async fn run(&self, force: bool) {
        let now = Utc::now();
        match techpulse_orchestrator::run_cycle(&self.adapters, self.catalog.as_ref(), self.max_records, force, self.cancellation.clone(), now).await {
            Ok(report) => {
                info!(
                    new_records = report.total_new_records,
                    updated_records = report.total_updated_records,
                    cancelled = report.cancelled,
                    "catalog refresh cycle finished"
                );
                if let Err(err) = self.catalog.record_fetch(now).await {
                    warn!(error = %err, "failed to record catalog fetch watermark");
                }
                self.refresh_health_snapshot().await;
                self.enrich_new_podcasts().await;
            }
            Err(err) => {
                warn!(error = %err, "catalog refresh cycle failed");
            }
        }
    }
}

#[async_trait]
impl AnalyticsRefreshTask for AppState {
    async fn run(&self) {
        let records = match self.catalog.snapshot().await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "failed to snapshot catalog for analytics refresh");
                return;
            }
        };

        let now = Utc::now();
        let snapshot = techpulse_analytics::compute_all(&records, self.window_days, now, self.llm.as_deref()).await;

        if let Err(err) = self.snapshots.write(now, &snapshot).await {
            warn!(error = %err, "failed to persist analytics snapshot");
        }
        *self.analytics.write().await = Some(snapshot);
        info!("deep analytics refresh finished");
    }
}
