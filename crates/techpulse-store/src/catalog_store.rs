//! C4 Catalog Store — in-memory mapping from `id` to record, with secondary
//! indices by external-id namespace and normalized title, backed by
//! write-temp-then-swap persistence to a single JSON document
//! (`{records[], lastFetchTime, lastPaperDate}`, §6).
//!
//! All mutations are serialized through one `tokio::sync::RwLock` writer;
//! readers take the same lock for read and observe either the pre- or
//! post-merge snapshot, never a partial one (§5).

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use techpulse_core::{CanonicalRecord, MergeOutcome, RecordType};

use crate::atomic_writer::write_atomic;
use crate::error::{Result, StoreError};

#[derive(Debug, Serialize, Deserialize, Default)]
struct CatalogDocument {
    records: Vec<CanonicalRecord>,
    last_fetch_time: Option<DateTime<Utc>>,
    last_paper_date: Option<DateTime<Utc>>,
}

struct CatalogInner {
    records: HashMap<String, CanonicalRecord>,
    by_external_id: HashMap<(String, String), String>,
    by_title_fingerprint: HashMap<String, String>,
    last_fetch_time: Option<DateTime<Utc>>,
    last_paper_date: Option<DateTime<Utc>>,
}

impl CatalogInner {
    fn empty() -> Self {
        Self {
            records: HashMap::new(),
            by_external_id: HashMap::new(),
            by_title_fingerprint: HashMap::new(),
            last_fetch_time: None,
            last_paper_date: None,
        }
    }

    fn from_document(doc: CatalogDocument) -> Self {
        let mut inner = Self::empty();
        inner.last_fetch_time = doc.last_fetch_time;
        inner.last_paper_date = doc.last_paper_date;
        for record in doc.records {
            inner.index_record(&record);
            inner.records.insert(record.id.clone(), record);
        }
        inner
    }

    fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            records: self.records.values().cloned().collect(),
            last_fetch_time: self.last_fetch_time,
            last_paper_date: self.last_paper_date,
        }
    }

    fn index_record(&mut self, record: &CanonicalRecord) {
        for (ns, value) in &record.external_ids {
            if !value.trim().is_empty() {
                self.by_external_id
                    .insert((ns.clone(), value.clone()), record.id.clone());
            }
        }
        let fp = techpulse_core::normalize_title_fingerprint(&record.title);
        if fp.len() >= 5 {
            self.by_title_fingerprint.insert(fp, record.id.clone());
        }
    }

    fn deindex_record(&mut self, record: &CanonicalRecord) {
        for (ns, value) in &record.external_ids {
            self.by_external_id.remove(&(ns.clone(), value.clone()));
        }
        let fp = techpulse_core::normalize_title_fingerprint(&record.title);
        self.by_title_fingerprint.remove(&fp);
    }

    /// Upsert one record, returning whether it was new. Keeps indices and
    /// the `lastPaperDate` watermark in sync.
    fn upsert(&mut self, record: CanonicalRecord) -> bool {
        let is_new = !self.records.contains_key(&record.id);
        if record.record_type == RecordType::Paper {
            self.last_paper_date = Some(match self.last_paper_date {
                Some(existing) => existing.max(record.published),
                None => record.published,
            });
        }
        if let Some(old) = self.records.get(&record.id) {
            self.deindex_record(&old.clone());
        }
        self.index_record(&record);
        self.records.insert(record.id.clone(), record);
        is_new
    }

    /// Evict oldest-`published` records until `len <= ceiling`.
    fn evict_to_ceiling(&mut self, ceiling: usize) -> usize {
        if self.records.len() <= ceiling {
            return 0;
        }
        let mut ids_by_published: Vec<(DateTime<Utc>, String)> = self
            .records
            .values()
            .map(|r| (r.published, r.id.clone()))
            .collect();
        ids_by_published.sort_by_key(|(published, _)| *published);
        let to_evict = self.records.len() - ceiling;
        let mut evicted = 0;
        for (_, id) in ids_by_published.into_iter().take(to_evict) {
            if let Some(record) = self.records.remove(&id) {
                self.deindex_record(&record);
                evicted += 1;
            }
        }
        evicted
    }
}

/// File-backed `CatalogStore`: the default `storeBackend = file` option (§6).
pub struct FileCatalogStore {
    path: PathBuf,
    max_records: usize,
    inner: RwLock<CatalogInner>,
}

impl FileCatalogStore {
    /// Rehydrate from durable storage at `path`. If absent or malformed,
    /// starts with an empty store and logs the condition (§4.4) rather
    /// than failing.
    pub async fn load(path: impl Into<PathBuf>, max_records: usize) -> Self {
        let path = path.into();
        let inner = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<CatalogDocument>(&bytes) {
                Ok(doc) => {
                    info!(records = doc.records.len(), path = %path.display(), "rehydrated catalog store");
                    CatalogInner::from_document(doc)
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "catalog store file malformed, starting empty");
                    CatalogInner::empty()
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "catalog store file absent, starting empty");
                CatalogInner::empty()
            }
        };
        Self {
            path,
            max_records,
            inner: RwLock::new(inner),
        }
    }

    async fn persist(&self, inner: &CatalogInner) -> Result<()> {
        let doc = inner.to_document();
        let bytes = serde_json::to_vec_pretty(&doc)?;
        let path = self.path.clone();
        // One retry on failure per §7 ("Persistence failure: retried once;
        // on second failure the cycle's results remain in memory").
        match write_atomic(&path, &bytes) {
            Ok(()) => Ok(()),
            Err(first_err) => {
                warn!(error = %first_err, "catalog persistence failed, retrying once");
                write_atomic(&path, &bytes).map_err(|second_err| {
                    warn!(error = %second_err, "catalog persistence failed twice, results remain in memory only");
                    StoreError::PersistFailed(second_err.to_string())
                })
            }
        }
    }
}

#[async_trait]
impl techpulse_core::CatalogStore for FileCatalogStore {
    async fn merge(&self, records: Vec<CanonicalRecord>) -> techpulse_core::Result<MergeOutcome> {
        let mut inner = self.inner.write().await;
        let mut outcome = MergeOutcome::default();
        for record in records {
            if inner.upsert(record) {
                outcome.new_records += 1;
            } else {
                outcome.updated_records += 1;
            }
        }
        let evicted = inner.evict_to_ceiling(self.max_records);
        if evicted > 0 {
            info!(evicted, ceiling = self.max_records, "evicted oldest-published records over the cache ceiling");
        }
        self.persist(&inner).await?;
        Ok(outcome)
    }

    async fn get(&self, id: &str) -> techpulse_core::Result<Option<CanonicalRecord>> {
        Ok(self.inner.read().await.records.get(id).cloned())
    }

    async fn find_by_external_id(
        &self,
        namespace: &str,
        value: &str,
    ) -> techpulse_core::Result<Option<CanonicalRecord>> {
        let inner = self.inner.read().await;
        let id = inner
            .by_external_id
            .get(&(namespace.to_string(), value.to_string()));
        Ok(id.and_then(|id| inner.records.get(id).cloned()))
    }

    async fn find_by_title_fingerprint(
        &self,
        fingerprint: &str,
    ) -> techpulse_core::Result<Option<CanonicalRecord>> {
        let inner = self.inner.read().await;
        let id = inner.by_title_fingerprint.get(fingerprint);
        Ok(id.and_then(|id| inner.records.get(id).cloned()))
    }

    async fn snapshot(&self) -> techpulse_core::Result<Vec<CanonicalRecord>> {
        Ok(self.inner.read().await.records.values().cloned().collect())
    }

    async fn watermarks(
        &self,
    ) -> techpulse_core::Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let inner = self.inner.read().await;
        Ok((inner.last_paper_date, inner.last_fetch_time))
    }

    async fn record_fetch(&self, fetch_time: DateTime<Utc>) -> techpulse_core::Result<()> {
        let mut inner = self.inner.write().await;
        inner.last_fetch_time = Some(match inner.last_fetch_time {
            Some(existing) => existing.max(fetch_time),
            None => fetch_time,
        });
        self.persist(&inner).await?;
        Ok(())
    }

    async fn len(&self) -> techpulse_core::Result<usize> {
        Ok(self.inner.read().await.records.len())
    }
}
