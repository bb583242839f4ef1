//! C8 — Analytics Engine: momentum, industry growth, emerging-technology
//! detection, "technology read" prediction scores, and leader quotes,
//! over the Signal Aggregator's projection of the catalog. Results are
//! cached as dated snapshots (`snapshot`); the most recent snapshot is
//! served when the engine is idle between `deepRefreshHours` ticks (§4.8).

pub mod emerging;
pub mod error;
pub mod growth;
pub mod leader_quotes;
pub mod momentum;
pub mod prediction;
pub mod snapshot;

pub use emerging::{EmergingTechnology, evaluate_emerging, rank_emerging};
pub use error::{AnalyticsError, Result};
pub use growth::{IndustryGrowth, compute_growth, rank_growth};
pub use leader_quotes::{LeaderQuote, extract_leader_quotes, mention_count};
pub use momentum::{TechnologyMomentum, compute_momentum, rank_momentum};
pub use prediction::{TechnologyPrediction, TechnologyRead, compute_prediction, rank_predictions, rank_reads};
pub use snapshot::{FileSnapshotCache, SnapshotKind};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use techpulse_core::{CanonicalRecord, LlmClient};
use techpulse_signals::Signal;

/// Everything the `/insights/*` HTTP surface serves, computed once per
/// deep-analytics refresh (§4.6) and cached as dated snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub window_days: i64,
    pub momentum: Vec<TechnologyMomentum>,
    pub growth: Vec<IndustryGrowth>,
    pub emerging: Vec<EmergingTechnology>,
    pub predictions: Vec<TechnologyRead>,
    pub leader_quotes: Vec<LeaderQuote>,
}

/// Recompute every analytics output over the full catalog snapshot, for a
/// given momentum/emerging window `window_days`. This is what the
/// Scheduler's deep-analytics trigger calls every `deepRefreshHours`;
/// `llm` is the optional configured client used to narrate each
/// technology read (§4.10 step 3), falling back to template text when
/// it's absent or fails.
pub async fn compute_all(records: &[CanonicalRecord], window_days: i64, now: DateTime<Utc>, llm: Option<&dyn LlmClient>) -> AnalyticsSnapshot {
    let signals = techpulse_signals::all_signals(records);
    let leader_quotes = extract_leader_quotes(records);
    let momentum = rank_momentum(&signals, window_days, now);
    let growth = rank_growth(&signals, None, now);
    let emerging = rank_emerging(
        &signals,
        |tech| mention_count(&leader_quotes, tech),
        window_days,
        now,
    );
    let predictions = rank_reads(&signals, &leader_quotes, window_days, now, llm).await;

    AnalyticsSnapshot {
        generated_at: now,
        window_days,
        momentum,
        growth,
        emerging,
        predictions,
        leader_quotes,
    }
}

/// Signals for one technology over a window, combining sentiment and the
/// other `/insights/combined-signal` fields `§6`'s HTTP surface exposes.
pub fn combined_signal(records: &[CanonicalRecord], technology: &str, window_days: i64, now: DateTime<Utc>) -> Vec<Signal> {
    techpulse_signals::signals_for_technology(records, technology, window_days, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use techpulse_core::{ExternalIds, RecordType};

    fn paper(published: DateTime<Utc>, tech: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: format!("fp:{tech}-{published}"),
            record_type: RecordType::Paper,
            title: format!("A paper about {tech}"),
            summary: String::new(),
            published,
            updated: published,
            date_fidelity: Default::default(),
            authors: vec![],
            link: "https://example.com".to_string(),
            pdf_link: None,
            venue: String::new(),
            tags: Default::default(),
            categories: Default::default(),
            citations: 0,
            external_ids: ExternalIds::new(),
            technologies: [tech.to_string()].into_iter().collect(),
            industries: Default::default(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn compute_all_runs_end_to_end_over_a_mixed_catalog() {
        let now = Utc::now();
        let records: Vec<CanonicalRecord> = (0..20).map(|i| paper(now - chrono::Duration::days(i), "Rust")).collect();
        let snapshot = compute_all(&records, 30, now, None).await;
        assert!(!snapshot.momentum.is_empty());
        assert_eq!(snapshot.window_days, 30);
        assert!(snapshot.predictions.iter().all(|r| r.generated_by == "Template"));
    }
}
