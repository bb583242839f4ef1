//! Technology momentum (§4.8): a velocity-weighted 0–100 score of recent
//! activity per technology, blended across source types by the fixed
//! weights `RecordType::momentum_weight` carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use techpulse_core::RecordType;
use techpulse_signals::Signal;

/// The five source types that contribute to momentum, in the order §4.8
/// lists their weights. `Job` carries weight 0 and never contributes.
const MOMENTUM_SOURCES: &[RecordType] = &[
    RecordType::Paper,
    RecordType::Patent,
    RecordType::News,
    RecordType::Podcast,
    RecordType::Github,
];

/// Sum of the five momentum weights (§4.8's `Σ w_s`): fixed at 1.0 by
/// construction (0.30 + 0.25 + 0.20 + 0.15 + 0.10), computed here instead
/// of hardcoded so a future reweighting of `momentum_weight` stays correct.
fn total_weight() -> f64 {
    MOMENTUM_SOURCES.iter().map(|t| t.momentum_weight()).sum()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologyMomentum {
    pub technology: String,
    pub momentum: f64,
    pub confidence: f64,
    pub signal_count: usize,
}

/// `velocity_s = (recent_s − older_s) / max(older_s, 1)` (§4.8). The
/// `older_s = 0` special case the spec calls out ("or 1 if older_s = 0 and
/// recent_s > 0") is already what `max(older_s, 1)` computes.
fn velocity(recent: usize, older: usize) -> f64 {
    (recent as f64 - older as f64) / (older as f64).max(1.0)
}

/// Compute momentum for one technology given its signals, a window `W`
/// (days), and the instant `now` is measured from.
///
/// `recent(T)` is signals published in the last `W` days; `older(T)` is
/// the prior `W`-day window immediately before that.
pub fn compute_momentum(technology: &str, signals: &[Signal], window_days: i64, now: DateTime<Utc>) -> TechnologyMomentum {
    let recent_floor = now - chrono::Duration::days(window_days);
    let older_floor = now - chrono::Duration::days(window_days * 2);

    let mut weighted_sum = 0.0;
    let mut recent_total = 0usize;
    let mut older_total = 0usize;

    for source in MOMENTUM_SOURCES {
        let recent_count = signals
            .iter()
            .filter(|s| s.record_type == *source && s.published >= recent_floor)
            .count();
        let older_count = signals
            .iter()
            .filter(|s| s.record_type == *source && s.published >= older_floor && s.published < recent_floor)
            .count();
        recent_total += recent_count;
        older_total += older_count;

        let v = velocity(recent_count, older_count);
        let momentum_s = v * (1.0 + v.max(0.0)) * source.momentum_weight();
        weighted_sum += momentum_s;
    }

    let momentum = (100.0 * weighted_sum / total_weight()).clamp(0.0, 100.0);
    let confidence = ((recent_total + older_total) as f64 / 50.0).min(1.0);

    TechnologyMomentum {
        technology: technology.to_string(),
        momentum,
        confidence,
        signal_count: recent_total + older_total,
    }
}

/// Ranked momentum list across every technology the signal set mentions.
/// Sorted by momentum descending, ties broken by larger `signal_count`,
/// then alphabetically by technology name (§4.8 "ordering and tie-breaks").
pub fn rank_momentum(all_signals: &[Signal], window_days: i64, now: DateTime<Utc>) -> Vec<TechnologyMomentum> {
    let techs = techpulse_signals::technologies(all_signals);
    let mut out: Vec<TechnologyMomentum> = techs
        .iter()
        .map(|tech| {
            let tech_signals: Vec<Signal> = all_signals
                .iter()
                .filter(|s| s.technologies.contains(tech))
                .cloned()
                .collect();
            compute_momentum(tech, &tech_signals, window_days, now)
        })
        .collect();
    out.sort_by(|a, b| {
        b.momentum
            .partial_cmp(&a.momentum)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.signal_count.cmp(&a.signal_count))
            .then_with(|| a.technology.cmp(&b.technology))
    });
    out
}
