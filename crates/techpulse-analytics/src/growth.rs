//! Industry growth (§4.8): a monthly-bucketed 0–100 score comparing the
//! last three months' average signal volume against earlier months.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use techpulse_signals::Signal;

const EPSILON: f64 = 1e-6;
const RECENT_MONTHS: usize = 3;
const DEFAULT_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryGrowth {
    pub industry: String,
    pub growth_score: f64,
    pub growth_rate: f64,
    pub confidence: f64,
    pub signal_count: usize,
}

/// Bucket signals into `YYYY-MM` keys, sorted chronologically.
fn bucket_by_month(signals: &[Signal]) -> BTreeMap<(i32, u32), usize> {
    let mut buckets: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for s in signals {
        *buckets.entry((s.published.year(), s.published.month())).or_insert(0) += 1;
    }
    buckets
}

/// `growthScore(I)` over `window_days` (default 90, §4.8). Signals are
/// pre-filtered by the caller to the industry and the window; this
/// function only buckets and scores.
pub fn compute_growth(industry: &str, signals: &[Signal]) -> IndustryGrowth {
    let buckets = bucket_by_month(signals);
    let months: Vec<usize> = buckets.values().copied().collect();
    let non_zero_months = months.iter().filter(|&&c| c > 0).count();

    // §8 testable property 7: fewer than two non-zero months ⇒ score 0,
    // confidence ≤ 0.3.
    if non_zero_months < 2 {
        return IndustryGrowth {
            industry: industry.to_string(),
            growth_score: 0.0,
            growth_rate: 0.0,
            confidence: (non_zero_months as f64 / 10.0).min(0.3),
            signal_count: signals.len(),
        };
    }

    let recent: Vec<usize> = months.iter().rev().take(RECENT_MONTHS).copied().collect();
    let older: Vec<usize> = months
        .iter()
        .rev()
        .skip(RECENT_MONTHS)
        .copied()
        .collect();

    let recent_avg = if recent.is_empty() {
        0.0
    } else {
        recent.iter().sum::<usize>() as f64 / recent.len() as f64
    };
    let older_avg = if older.is_empty() {
        0.0
    } else {
        older.iter().sum::<usize>() as f64 / older.len() as f64
    };

    let growth_rate = 100.0 * (recent_avg - older_avg) / older_avg.max(EPSILON);
    let growth_score = (50.0 + growth_rate).clamp(0.0, 100.0);
    let confidence = (months.len() as f64 / 6.0).min(1.0);

    IndustryGrowth {
        industry: industry.to_string(),
        growth_score,
        growth_rate,
        confidence,
        signal_count: signals.len(),
    }
}

/// Ranked growth list across every industry the signal set mentions,
/// restricted to the last `window_days` (default 90) before `now`.
/// Sorted by `growth_score` descending, ties broken by larger
/// `signal_count`, then alphabetically by industry name (§4.8).
pub fn rank_growth(all_signals: &[Signal], window_days: Option<i64>, now: DateTime<Utc>) -> Vec<IndustryGrowth> {
    let window_days = window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
    let floor = now - chrono::Duration::days(window_days);
    let windowed: Vec<Signal> = all_signals.iter().filter(|s| s.published >= floor).cloned().collect();
    let industries = techpulse_signals::industries(&windowed);

    let mut out: Vec<IndustryGrowth> = industries
        .iter()
        .map(|industry| {
            let industry_signals: Vec<Signal> = windowed
                .iter()
                .filter(|s| s.industries.contains(industry))
                .cloned()
                .collect();
            compute_growth(industry, &industry_signals)
        })
        .collect();
    out.sort_by(|a, b| {
        b.growth_score
            .partial_cmp(&a.growth_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.signal_count.cmp(&a.signal_count))
            .then_with(|| a.industry.cmp(&b.industry))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use techpulse_core::RecordType;

    fn signal(published: DateTime<Utc>) -> Signal {
        Signal {
            record_type: RecordType::News,
            published,
            technologies: Default::default(),
            industries: ["Healthcare".to_string()].into_iter().collect(),
            sentiment: 0.0,
            confidence: 1.0,
            citations: 0,
            venue: String::new(),
            title: "t".to_string(),
            id: "id".to_string(),
        }
    }

    #[test]
    fn growth_score_always_in_bounds() {
        let now = Utc::now();
        let signals: Vec<Signal> = (0..200).map(|i| signal(now - chrono::Duration::days(i))).collect();
        let g = compute_growth("Healthcare", &signals);
        assert!((0.0..=100.0).contains(&g.growth_score));
    }

    #[test]
    fn fewer_than_two_nonzero_months_yields_zero_score_low_confidence() {
        let now = Utc::now();
        let signals = vec![signal(now), signal(now)];
        let g = compute_growth("Healthcare", &signals);
        assert_eq!(g.growth_score, 0.0);
        assert!(g.confidence <= 0.3);
    }

    #[test]
    fn growth_rate_positive_when_recent_busier_than_older() {
        let now = Utc::now();
        let mut signals = Vec::new();
        for _ in 0..20 {
            signals.push(signal(now));
        }
        for _ in 0..2 {
            signals.push(signal(now - chrono::Duration::days(150)));
        }
        let g = compute_growth("Healthcare", &signals);
        assert!(g.growth_rate > 0.0);
        assert!(g.growth_score > 50.0);
    }
}
