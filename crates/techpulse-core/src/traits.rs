//! Trait seams between components: the Source Adapter contract (§4.2), the
//! Catalog Store contract (§4.4), and the cooperative LLM/embedding client
//! contracts (§4.10) that degrade to `None` rather than failing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::record::CanonicalRecord;

/// One adapter per upstream. Implementations live in `techpulse-sources`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable, human-readable source name used in logs, metrics, and the
    /// `venue`/source filter on `/papers`.
    fn name(&self) -> &str;

    /// Fetch up to `limit` records newer than `date_threshold`, applying
    /// query rotation, pagination, English-text filtering, and identity
    /// assignment internally (§4.2). A fully failed adapter returns
    /// `Ok(vec![])` paired with a logged error, never propagates — the
    /// orchestrator treats every adapter result as "a partial result,
    /// possibly empty," per §7.
    async fn fetch_latest(
        &self,
        limit: usize,
        date_threshold: DateTime<Utc>,
    ) -> Result<Vec<CanonicalRecord>>;

    /// Optional ad hoc search, used by `/papers?search=`. Default: unsupported.
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<CanonicalRecord>> {
        Ok(Vec::new())
    }

    /// Optional single-record enrichment (e.g. fetch citation counts).
    /// Default: returns the record unchanged.
    async fn enrich(&self, record: CanonicalRecord) -> Result<CanonicalRecord> {
        Ok(record)
    }
}

/// Outcome of merging one batch into the Catalog Store.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub new_records: usize,
    pub updated_records: usize,
}

/// The Catalog Store contract (§4.4): in-memory authority over committed
/// records with durable persistence. Implementations: `techpulse-store`
/// (file-backed) and `techpulse-store-relational` (`storeBackend = relational`).
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Merge a deduplicated batch into the store. Atomic from the reader's
    /// point of view (§5): readers never observe a partial merge.
    async fn merge(&self, records: Vec<CanonicalRecord>) -> Result<MergeOutcome>;

    /// Look up a record by its identity key.
    async fn get(&self, id: &str) -> Result<Option<CanonicalRecord>>;

    /// Look up a record by a populated external-id namespace value, e.g. `("arxiv", "2401.00001")`.
    async fn find_by_external_id(&self, namespace: &str, value: &str) -> Result<Option<CanonicalRecord>>;

    /// Look up by normalized-title fingerprint (not the full identity key).
    async fn find_by_title_fingerprint(&self, fingerprint: &str) -> Result<Option<CanonicalRecord>>;

    /// A consistent snapshot of every record currently committed.
    async fn snapshot(&self) -> Result<Vec<CanonicalRecord>>;

    /// The latest `published` among committed papers, and when the store
    /// was last successfully fetched. Inputs to the expanding-window protocol.
    async fn watermarks(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)>;

    /// Update `lastFetchTime` (and, if later, `lastPaperDate`) after a cycle.
    async fn record_fetch(&self, fetch_time: DateTime<Utc>) -> Result<()>;

    /// Number of records currently held (for `/health`).
    async fn len(&self) -> Result<usize>;
}

/// A narrow, cooperative client for LLM calls. `None` anywhere in the
/// pipeline configuration means "not configured" — callers must fall back
/// to templates/heuristics, never fail (§4.10, §9).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a prompt, expect the model to return JSON; callers validate
    /// the shape themselves and fall back to heuristics on mismatch.
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<String>;

    /// Send a prompt, expect free text (used for the 2-3 sentence summary).
    async fn complete_text(&self, system: &str, prompt: &str) -> Result<String>;
}

/// A narrow, cooperative embedding client for the optional knowledge-graph tier.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

/// Nearest-neighbor query surface for the optional vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, id: &str, embedding: &[f32], metadata: serde_json::Value) -> Result<()>;
    async fn nearest(&self, embedding: &[f32], top_k: usize) -> Result<Vec<(String, f32)>>;
    async fn delete_by_video(&self, video_id: &str) -> Result<()>;
}
