//! Emerging technology detection (§4.8): low-volume, high-velocity
//! technologies that haven't yet crossed into mainstream signal counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use techpulse_signals::Signal;

const LOW_VOLUME_CEILING: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergingTechnology {
    pub technology: String,
    pub score: f64,
    pub total_signals: usize,
    pub recent_signals: usize,
    pub velocity: f64,
}

fn velocity(recent: usize, older: usize) -> f64 {
    (recent as f64 - older as f64) / (older as f64).max(1.0)
}

/// Does `technology` qualify as emerging: `total_signals < 100` AND
/// `recent_signals / W > 0.5` (§4.8).
fn qualifies(total_signals: usize, recent_signals: usize, window_days: i64) -> bool {
    total_signals < LOW_VOLUME_CEILING && (recent_signals as f64 / window_days as f64) > 0.5
}

/// Score one technology against the emerging-tech formula, given its full
/// signal history, the leader-quote mention count attributed to it, and
/// the window `W` (days). Returns `None` when it does not qualify.
pub fn evaluate_emerging(
    technology: &str,
    signals: &[Signal],
    leader_mentions: usize,
    window_days: i64,
    now: DateTime<Utc>,
) -> Option<EmergingTechnology> {
    let recent_floor = now - chrono::Duration::days(window_days);
    let older_floor = now - chrono::Duration::days(window_days * 2);

    let total_signals = signals.len();
    let recent_signals = signals.iter().filter(|s| s.published >= recent_floor).count();
    let older_signals = signals
        .iter()
        .filter(|s| s.published >= older_floor && s.published < recent_floor)
        .count();

    if !qualifies(total_signals, recent_signals, window_days) {
        return None;
    }

    let v = velocity(recent_signals, older_signals);
    let low_volume_bonus = if total_signals < LOW_VOLUME_CEILING { 0.3 } else { 0.0 };
    let score = 0.4 * v + low_volume_bonus + 0.2 * leader_mentions as f64 + 0.1 * (recent_signals.min(10) as f64);

    Some(EmergingTechnology {
        technology: technology.to_string(),
        score,
        total_signals,
        recent_signals,
        velocity: v,
    })
}

/// Ranked emerging-technology list across every technology the signal set
/// mentions. Sorted by `score` descending, ties broken by larger
/// `recent_signals`, then alphabetically (§4.8 ordering rule).
pub fn rank_emerging(
    all_signals: &[Signal],
    leader_mentions: impl Fn(&str) -> usize,
    window_days: i64,
    now: DateTime<Utc>,
) -> Vec<EmergingTechnology> {
    let techs = techpulse_signals::technologies(all_signals);
    let mut out: Vec<EmergingTechnology> = techs
        .iter()
        .filter_map(|tech| {
            let tech_signals: Vec<Signal> = all_signals
                .iter()
                .filter(|s| s.technologies.contains(tech))
                .cloned()
                .collect();
            evaluate_emerging(tech, &tech_signals, leader_mentions(tech), window_days, now)
        })
        .collect();
    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.recent_signals.cmp(&a.recent_signals))
            .then_with(|| a.technology.cmp(&b.technology))
    });
    out
}
