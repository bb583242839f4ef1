//! Shared adapter scaffolding: the title/language/date admission checks
//! every adapter runs before emitting a record (§4.2 step 3), and the
//! technology/industry enrichment every record gets regardless of source.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use techpulse_core::{CanonicalRecord, ExternalIds, compute_identity_key};
use techpulse_textsignals::{classify_industries, extract_technologies, is_english};

/// Admission check shared by every adapter: reject missing titles,
/// non-English text, and items older than the window floor.
pub fn admits(title: &str, published: DateTime<Utc>, date_threshold: DateTime<Utc>) -> bool {
    if title.trim().is_empty() {
        return false;
    }
    if !is_english(title) {
        return false;
    }
    if published < date_threshold {
        return false;
    }
    true
}

/// Technology and industry tags derived from free text, shared by every
/// adapter so classification stays consistent across source families.
pub fn enrich_tags(title: &str, summary: &str, existing_tags: &BTreeSet<String>) -> (BTreeSet<String>, BTreeSet<String>) {
    let technologies = extract_technologies(title, summary);
    let industries = classify_industries(title, summary, existing_tags);
    (technologies, industries)
}

/// Compute the identity key an adapter should stamp on a freshly-built
/// record (§4.2 step 4), using whatever external id namespace it has plus
/// a title/author/year fallback. Returns `None` when neither is usable,
/// in which case the caller must drop the record.
pub fn assign_identity(external_ids: &ExternalIds, title: &str, authors: &[String], published: DateTime<Utc>) -> Option<String> {
    let first_author_lastname = authors
        .first()
        .map(|a| a.split_whitespace().last().unwrap_or(a).to_lowercase())
        .unwrap_or_default();
    compute_identity_key(external_ids, title, &first_author_lastname, published.year())
}

/// Finalize a record's `id` field via [`assign_identity`], returning `None`
/// (and dropping the record) when no identity can be computed.
pub fn with_identity(mut record: CanonicalRecord) -> Option<CanonicalRecord> {
    let id = assign_identity(&record.external_ids, &record.title, &record.authors, record.published)?;
    record.id = id;
    Some(record)
}
