//! C7 — Signal Aggregator: projects the catalog into per-technology
//! `Signal` views that the Analytics Engine (`techpulse-analytics`)
//! consumes. A `Signal` wraps a `CanonicalRecord` with the
//! technology/industry/sentiment/confidence annotations §4.7 describes;
//! it borrows nothing from the record it wraps so callers can hold a
//! `Vec<Signal>` independent of catalog lifetimes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use techpulse_core::{CanonicalRecord, RecordType};

/// A Canonical Record enriched with the fields the Analytics Engine needs:
/// technology/industry membership, sentiment, and a confidence scalar.
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub record_type: RecordType,
    pub published: DateTime<Utc>,
    pub technologies: BTreeSet<String>,
    pub industries: BTreeSet<String>,
    /// `[-1, 1]`, bag-of-words differential for news, 0 for every other type (§4.7).
    pub sentiment: f64,
    /// `[0, 1]`. Higher for records with a stronger identity signal
    /// (an external id) than a bare title fingerprint, and for records
    /// with a non-empty summary.
    pub confidence: f64,
    pub citations: u64,
    pub venue: String,
    pub title: String,
    pub id: String,
}

impl Signal {
    /// Build a `Signal` view over one Canonical Record.
    pub fn from_record(record: &CanonicalRecord) -> Self {
        let sentiment = if record.record_type == RecordType::News {
            techpulse_textsignals::sentiment_score(&format!("{} {}", record.title, record.summary))
        } else {
            0.0
        };
        let has_external_id = record.external_ids.values().any(|v| !v.trim().is_empty());
        let has_summary = !record.summary.trim().is_empty();
        let confidence = match (has_external_id, has_summary) {
            (true, true) => 1.0,
            (true, false) => 0.8,
            (false, true) => 0.6,
            (false, false) => 0.4,
        };
        Self {
            record_type: record.record_type,
            published: record.published,
            technologies: record.technologies.clone(),
            industries: record.industries.clone(),
            sentiment,
            confidence,
            citations: record.citations,
            venue: record.venue.clone(),
            title: record.title.clone(),
            id: record.id.clone(),
        }
    }
}

/// `allSignals(W)` (§4.7): every record in the catalog, annotated, with no
/// technology filter. Callers apply the `W`-day recency filter themselves
/// (the Analytics Engine needs both the "recent" and the "prior" window,
/// so filtering belongs to the caller, not this projection).
pub fn all_signals(records: &[CanonicalRecord]) -> Vec<Signal> {
    records.iter().map(Signal::from_record).collect()
}

/// `signalsForTechnology(tech, W)` (§4.7): signals whose `technologies`
/// set contains `tech` and whose `published` is within the last `window`
/// days of `now`.
pub fn signals_for_technology(
    records: &[CanonicalRecord],
    tech: &str,
    window_days: i64,
    now: DateTime<Utc>,
) -> Vec<Signal> {
    let floor = now - chrono::Duration::days(window_days);
    records
        .iter()
        .filter(|r| r.technologies.contains(tech) && r.published >= floor)
        .map(Signal::from_record)
        .collect()
}

/// `technologies(signals)` (§4.7): the union of technology tags across a
/// signal set.
pub fn technologies(signals: &[Signal]) -> BTreeSet<String> {
    signals.iter().flat_map(|s| s.technologies.iter().cloned()).collect()
}

/// `industries(signals)` (§4.7): the union of industry tags across a
/// signal set.
pub fn industries(signals: &[Signal]) -> BTreeSet<String> {
    signals.iter().flat_map(|s| s.industries.iter().cloned()).collect()
}

/// Signals published within `[floor, ceiling)`, sorted `published`
/// descending — the canonical within-technology order from §5.
pub fn in_window(signals: &[Signal], floor: DateTime<Utc>, ceiling: DateTime<Utc>) -> Vec<Signal> {
    let mut out: Vec<Signal> = signals
        .iter()
        .filter(|s| s.published >= floor && s.published < ceiling)
        .cloned()
        .collect();
    out.sort_by(|a, b| b.published.cmp(&a.published));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use techpulse_core::ExternalIds;

    fn news_record(title: &str, published: DateTime<Utc>) -> CanonicalRecord {
        CanonicalRecord {
            id: format!("fp:{title}"),
            record_type: RecordType::News,
            title: title.to_string(),
            summary: String::new(),
            published,
            updated: published,
            date_fidelity: Default::default(),
            authors: vec![],
            link: "https://example.com".to_string(),
            pdf_link: None,
            venue: "Example Wire".to_string(),
            tags: Default::default(),
            categories: Default::default(),
            citations: 0,
            external_ids: ExternalIds::new(),
            technologies: ["Machine Learning".to_string()].into_iter().collect(),
            industries: Default::default(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn news_gets_nonzero_sentiment_other_types_get_zero() {
        let now = Utc::now();
        let positive = news_record("Breakthrough growth surges for new platform", now);
        let signal = Signal::from_record(&positive);
        assert!(signal.sentiment > 0.0);

        let mut paper = positive.clone();
        paper.record_type = RecordType::Paper;
        let paper_signal = Signal::from_record(&paper);
        assert_eq!(paper_signal.sentiment, 0.0);
    }

    #[test]
    fn signals_for_technology_filters_by_membership_and_window() {
        let now = Utc::now();
        let fresh = news_record("A", now);
        let stale = news_record("B", now - chrono::Duration::days(100));
        let signals = signals_for_technology(&[fresh, stale], "Machine Learning", 30, now);
        assert_eq!(signals.len(), 1);
    }

    #[test]
    fn in_window_sorts_descending_by_published() {
        let now = Utc::now();
        let older = news_record("older", now - chrono::Duration::days(1));
        let newer = news_record("newer", now);
        let signals = all_signals(&[older, newer]);
        let windowed = in_window(&signals, now - chrono::Duration::days(10), now + chrono::Duration::days(1));
        assert_eq!(windowed[0].title, "newer");
        assert_eq!(windowed[1].title, "older");
    }
}
