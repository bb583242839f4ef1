//! C3 — Deduplicator: intra-batch collapse followed by a cross-catalog
//! identity lookup (§4.4), producing the set of "truly new" records plus
//! in-place updates to records the catalog already holds.
//!
//! The identity key used for grouping is the record's own `id`: adapters
//! already stamp it via the same Identity Rules (`techpulse_core::
//! compute_identity_key`) before a record ever reaches the Deduplicator,
//! so two records collide here exactly when they would collide under the
//! rules in §3.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use techpulse_core::{CanonicalRecord, CatalogStore, normalize_title_fingerprint};

/// Result of deduplicating one incoming batch against the catalog.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Records with no prior catalog entry; identity key is new.
    pub new_records: Vec<CanonicalRecord>,
    /// Records the catalog already holds, with fields merged per the
    /// update policy (§4.4). These replace the existing stored record.
    pub updates: Vec<CanonicalRecord>,
}

impl DedupOutcome {
    /// All records destined for the store, new and updated alike.
    pub fn into_merged(self) -> Vec<CanonicalRecord> {
        let mut out = self.new_records;
        out.extend(self.updates);
        out
    }
}

/// Intra-batch pass (§4.4 step 1): collapse records sharing an identity
/// key into one, then (§4.4 step 2/3) resolve each surviving record
/// against the catalog, merging into an existing entry or admitting it
/// as new.
pub async fn dedupe_batch(
    incoming: Vec<CanonicalRecord>,
    catalog: &dyn CatalogStore,
) -> techpulse_core::Result<DedupOutcome> {
    let collapsed = collapse_intra_batch(incoming);

    let mut outcome = DedupOutcome::default();
    for record in collapsed {
        match find_existing(&record, catalog).await? {
            Some(existing) => outcome.updates.push(merge_update(existing, record)),
            None => outcome.new_records.push(record),
        }
    }
    Ok(outcome)
}

/// Collapse records within one batch that share an identity key. The
/// surviving record per key is the field-wise merge of every collapsed
/// record, seeded with whichever has more citations or the longer
/// (non-empty) summary — §4.4's "higher-citation or more-complete
/// summary wins" tie-break applies to which record anchors the merge,
/// not to which fields survive it.
fn collapse_intra_batch(incoming: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    let mut by_id: BTreeMap<String, CanonicalRecord> = BTreeMap::new();
    for record in incoming {
        match by_id.remove(&record.id) {
            Some(existing) => {
                let merged = merge_fields(pick_anchor(&existing, &record), existing, record);
                by_id.insert(merged.id.clone(), merged);
            }
            None => {
                by_id.insert(record.id.clone(), record);
            }
        }
    }
    by_id.into_values().collect()
}

/// Which of two colliding records should anchor the merge: more citations
/// wins; ties broken by the longer non-empty summary.
fn pick_anchor<'a>(a: &'a CanonicalRecord, b: &'a CanonicalRecord) -> &'a CanonicalRecord {
    if a.citations != b.citations {
        if a.citations > b.citations { a } else { b }
    } else if a.summary.trim().len() >= b.summary.trim().len() {
        a
    } else {
        b
    }
}

/// Look up the catalog for an existing record matching `candidate`: first
/// by each populated external-id namespace, then by normalized-title
/// fingerprint (skipped when the fingerprint is under 5 characters, per
/// the edge case in §4.4).
async fn find_existing(
    candidate: &CanonicalRecord,
    catalog: &dyn CatalogStore,
) -> techpulse_core::Result<Option<CanonicalRecord>> {
    for (namespace, value) in &candidate.external_ids {
        if value.trim().is_empty() {
            continue;
        }
        if let Some(existing) = catalog.find_by_external_id(namespace, value).await? {
            return Ok(Some(existing));
        }
    }
    let fingerprint = normalize_title_fingerprint(&candidate.title);
    if fingerprint.len() < 5 {
        return Ok(None);
    }
    catalog.find_by_title_fingerprint(&fingerprint).await
}

/// Cross-catalog update policy (§4.4 step 3): merge `externalIds` (union),
/// take the maximum of numeric counters, union tags/categories, retain the
/// earliest `published`, the latest `updated`. The existing record's `id`
/// always wins so the identity key never changes after first commit.
fn merge_update(existing: CanonicalRecord, incoming: CanonicalRecord) -> CanonicalRecord {
    let mut merged = merge_fields(&existing, existing.clone(), incoming);
    merged.id = existing.id;
    merged
}

/// Field-wise merge of two records believed to be the same artifact:
/// non-empty value wins, numeric fields take the maximum, set fields
/// union, `published` takes the earliest, `updated` the latest.
fn merge_fields(
    anchor: &CanonicalRecord,
    a: CanonicalRecord,
    b: CanonicalRecord,
) -> CanonicalRecord {
    let id = anchor.id.clone();
    let record_type = anchor.record_type;
    let title = pick_non_empty(a.title, b.title);
    let summary = pick_longer(a.summary, b.summary);
    let published = earliest(a.published, b.published);
    let updated = latest(a.updated, b.updated);
    let date_fidelity = anchor.date_fidelity;
    let authors = CanonicalRecord::dedupe_authors(
        a.authors.into_iter().chain(b.authors).collect(),
    );
    let link = pick_non_empty(a.link, b.link);
    let pdf_link = a.pdf_link.or(b.pdf_link);
    let venue = pick_non_empty(a.venue, b.venue);
    let tags = a.tags.into_iter().chain(b.tags).collect();
    let categories = a.categories.into_iter().chain(b.categories).collect();
    let citations = a.citations.max(b.citations);
    let mut external_ids = a.external_ids;
    for (ns, v) in b.external_ids {
        external_ids.entry(ns).or_insert(v);
    }
    let technologies = a.technologies.into_iter().chain(b.technologies).collect();
    let industries = a.industries.into_iter().chain(b.industries).collect();
    let mut metadata = a.metadata;
    for (k, v) in b.metadata {
        metadata.entry(k).or_insert(v);
    }

    CanonicalRecord {
        id,
        record_type,
        title,
        summary,
        published,
        updated,
        date_fidelity,
        authors,
        link,
        pdf_link,
        venue,
        tags,
        categories,
        citations,
        external_ids,
        technologies,
        industries,
        metadata,
    }
}

fn pick_non_empty(a: String, b: String) -> String {
    if !a.trim().is_empty() { a } else { b }
}

fn pick_longer(a: String, b: String) -> String {
    if a.trim().len() >= b.trim().len() { a } else { b }
}

fn earliest(a: DateTime<Utc>, b: DateTime<Utc>) -> DateTime<Utc> {
    a.min(b)
}

fn latest(a: DateTime<Utc>, b: DateTime<Utc>) -> DateTime<Utc> {
    a.max(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use techpulse_core::{ExternalIds, MergeOutcome, RecordType};

    struct FakeCatalog {
        records: Mutex<HashMap<String, CanonicalRecord>>,
    }

    impl FakeCatalog {
        fn new(seed: Vec<CanonicalRecord>) -> Self {
            let mut m = HashMap::new();
            for r in seed {
                m.insert(r.id.clone(), r);
            }
            Self { records: Mutex::new(m) }
        }
    }

    #[async_trait]
    impl CatalogStore for FakeCatalog {
        async fn merge(&self, _records: Vec<CanonicalRecord>) -> techpulse_core::Result<MergeOutcome> {
            unimplemented!()
        }
        async fn get(&self, id: &str) -> techpulse_core::Result<Option<CanonicalRecord>> {
            Ok(self.records.lock().unwrap().get(id).cloned())
        }
        async fn find_by_external_id(&self, namespace: &str, value: &str) -> techpulse_core::Result<Option<CanonicalRecord>> {
            Ok(self.records.lock().unwrap().values().find(|r| {
                r.external_ids.get(namespace).map(|v| v == value).unwrap_or(false)
            }).cloned())
        }
        async fn find_by_title_fingerprint(&self, fingerprint: &str) -> techpulse_core::Result<Option<CanonicalRecord>> {
            Ok(self.records.lock().unwrap().values().find(|r| {
                normalize_title_fingerprint(&r.title) == fingerprint
            }).cloned())
        }
        async fn snapshot(&self) -> techpulse_core::Result<Vec<CanonicalRecord>> {
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }
        async fn watermarks(&self) -> techpulse_core::Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
            Ok((None, None))
        }
        async fn record_fetch(&self, _fetch_time: DateTime<Utc>) -> techpulse_core::Result<()> {
            Ok(())
        }
        async fn len(&self) -> techpulse_core::Result<usize> {
            Ok(self.records.lock().unwrap().len())
        }
    }

    fn paper(id: &str, title: &str, external_ids: ExternalIds, citations: u64) -> CanonicalRecord {
        let now = Utc::now();
        CanonicalRecord {
            id: id.to_string(),
            record_type: RecordType::Paper,
            title: title.to_string(),
            summary: String::new(),
            published: now,
            updated: now,
            date_fidelity: Default::default(),
            authors: vec![],
            link: format!("https://example.com/{id}"),
            pdf_link: None,
            venue: String::new(),
            tags: Default::default(),
            categories: Default::default(),
            citations,
            external_ids,
            technologies: Default::default(),
            industries: Default::default(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn s1_scenario_intra_batch_and_cross_source_collision() {
        let mut arx_ids = ExternalIds::new();
        arx_ids.insert("arxiv".to_string(), "2401.00002".to_string());
        let a2 = paper("arxiv:2401.00002", "Paper 00002 Title", arx_ids, 0);

        let mut doi_ids = ExternalIds::new();
        doi_ids.insert("doi".to_string(), "10.1/x".to_string());
        let b2 = paper("doi:10.1/x", "…00002 title", doi_ids, 5);

        let catalog = FakeCatalog::new(vec![a2]);
        let outcome = dedupe_batch(vec![b2], &catalog).await.unwrap();

        assert_eq!(outcome.new_records.len(), 0);
        assert_eq!(outcome.updates.len(), 1);
        let merged = &outcome.updates[0];
        assert_eq!(merged.id, "arxiv:2401.00002");
        assert!(merged.external_ids.contains_key("arxiv"));
        assert!(merged.external_ids.contains_key("doi"));
        assert_eq!(merged.citations, 5);
    }

    #[tokio::test]
    async fn intra_batch_collapses_same_identity_key() {
        let mut ids1 = ExternalIds::new();
        ids1.insert("arxiv".to_string(), "2401.00001".to_string());
        let r1 = paper("arxiv:2401.00001", "Some Title", ids1.clone(), 3);
        let r2 = paper("arxiv:2401.00001", "Some Title", ids1, 9);

        let catalog = FakeCatalog::new(vec![]);
        let outcome = dedupe_batch(vec![r1, r2], &catalog).await.unwrap();
        assert_eq!(outcome.new_records.len(), 1);
        assert_eq!(outcome.new_records[0].citations, 9);
    }

    #[tokio::test]
    async fn titles_differing_only_in_case_and_punctuation_collide() {
        let existing = paper("fp:abc", "Attention Is All You Need", ExternalIds::new(), 0);
        let catalog = FakeCatalog::new(vec![existing]);

        let incoming = paper("fp:xyz", "attention, is all you need!", ExternalIds::new(), 1);
        let outcome = dedupe_batch(vec![incoming], &catalog).await.unwrap();
        assert_eq!(outcome.updates.len(), 1);
        assert_eq!(outcome.updates[0].id, "fp:abc");
    }

    #[tokio::test]
    async fn short_titles_skip_fingerprint_lookup() {
        let existing = paper("fp:abc", "Hi", ExternalIds::new(), 0);
        let catalog = FakeCatalog::new(vec![existing]);

        let incoming = paper("fp:xyz", "Hi", ExternalIds::new(), 1);
        let outcome = dedupe_batch(vec![incoming], &catalog).await.unwrap();
        // "Hi" normalizes to length 2, under the 5-char fingerprint floor,
        // so no cross-catalog hit is possible: treated as new.
        assert_eq!(outcome.new_records.len(), 1);
    }

    #[tokio::test]
    async fn retains_earliest_published_and_latest_updated() {
        let now = Utc::now();
        let mut existing = paper("arxiv:1", "T", ExternalIds::new(), 0);
        existing.external_ids.insert("arxiv".to_string(), "1".to_string());
        existing.published = now - chrono::Duration::days(5);
        existing.updated = now - chrono::Duration::days(1);

        let mut incoming = paper("arxiv:1", "T", ExternalIds::new(), 0);
        incoming.external_ids.insert("arxiv".to_string(), "1".to_string());
        incoming.published = now;
        incoming.updated = now;

        let catalog = FakeCatalog::new(vec![existing.clone()]);
        let outcome = dedupe_batch(vec![incoming], &catalog).await.unwrap();
        let merged = &outcome.updates[0];
        assert_eq!(merged.published, existing.published);
        assert_eq!(merged.updated, now);
    }
}
