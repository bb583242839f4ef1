//! Prediction score (§4.8): a ranked list of likely "next big"
//! technologies, blending momentum, early-stage bonus, leader-quote
//! count, and patent count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use techpulse_core::{LlmClient, RecordType};
use techpulse_signals::Signal;

use crate::leader_quotes::{LeaderQuote, mention_count};
use crate::momentum::compute_momentum;

const EARLY_STAGE_CEILING: usize = 100;
/// Leader-quote mentions and patent counts are scaled onto a 0-100 basis
/// so each of the four weighted terms contributes on the same scale as
/// momentum before the final clamp (§4.8's components are not separately
/// normalized in the prose; this is the natural reading of "weighted
/// combination ... clamped to [0,100]").
const LEADER_QUOTES_FOR_FULL_SCORE: f64 = 10.0;
const PATENTS_FOR_FULL_SCORE: f64 = 20.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologyPrediction {
    pub technology: String,
    pub score: f64,
    pub momentum: f64,
    pub leader_quote_count: usize,
    pub patent_count: usize,
    pub signal_count: usize,
}

/// Score one technology's "technology read" prediction.
pub fn compute_prediction(
    technology: &str,
    signals: &[Signal],
    leader_quotes: &[LeaderQuote],
    window_days: i64,
    now: DateTime<Utc>,
) -> TechnologyPrediction {
    let momentum = compute_momentum(technology, signals, window_days, now);
    let total_signals = signals.len();
    let patent_count = signals.iter().filter(|s| s.record_type == RecordType::Patent).count();
    let leader_quote_count = mention_count(leader_quotes, technology);

    let early_stage_bonus = if total_signals < EARLY_STAGE_CEILING { 100.0 } else { 0.0 };
    let leader_quote_score = ((leader_quote_count as f64 / LEADER_QUOTES_FOR_FULL_SCORE) * 100.0).min(100.0);
    let patent_score = ((patent_count as f64 / PATENTS_FOR_FULL_SCORE) * 100.0).min(100.0);

    let score = (0.4 * momentum.momentum + 0.2 * early_stage_bonus + 0.2 * leader_quote_score + 0.2 * patent_score)
        .clamp(0.0, 100.0);

    TechnologyPrediction {
        technology: technology.to_string(),
        score,
        momentum: momentum.momentum,
        leader_quote_count,
        patent_count,
        signal_count: total_signals,
    }
}

/// Ranked prediction list across every technology the signal set
/// mentions. Sorted by `score` descending, ties broken by larger
/// `signal_count`, then alphabetically (§4.8 ordering rule).
pub fn rank_predictions(
    all_signals: &[Signal],
    leader_quotes: &[LeaderQuote],
    window_days: i64,
    now: DateTime<Utc>,
) -> Vec<TechnologyPrediction> {
    let techs = techpulse_signals::technologies(all_signals);
    let mut out: Vec<TechnologyPrediction> = techs
        .iter()
        .map(|tech| {
            let tech_signals: Vec<Signal> = all_signals
                .iter()
                .filter(|s| s.technologies.contains(tech))
                .cloned()
                .collect();
            compute_prediction(tech, &tech_signals, leader_quotes, window_days, now)
        })
        .collect();
    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.signal_count.cmp(&a.signal_count))
            .then_with(|| a.technology.cmp(&b.technology))
    });
    out
}

/// A ranked technology read (§6, S5): the prediction score plus a short
/// narrative, either written by the LLM client or assembled from the
/// same counts when one isn't configured or the call fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologyRead {
    pub technology: String,
    pub score: f64,
    pub momentum: f64,
    pub leader_quote_count: usize,
    pub patent_count: usize,
    pub signal_count: usize,
    pub summary: String,
    #[serde(rename = "fullRead")]
    pub full_read: String,
    #[serde(rename = "generatedBy")]
    pub generated_by: String,
}

/// Ranked technology reads across every technology the signal set
/// mentions, narrative attached per §4.10 step 3's LLM-with-template-
/// fallback idiom. Ordering follows [`rank_predictions`].
pub async fn rank_reads(
    all_signals: &[Signal],
    leader_quotes: &[LeaderQuote],
    window_days: i64,
    now: DateTime<Utc>,
    llm: Option<&dyn LlmClient>,
) -> Vec<TechnologyRead> {
    let predictions = rank_predictions(all_signals, leader_quotes, window_days, now);
    let mut reads = Vec::with_capacity(predictions.len());
    for prediction in predictions {
        reads.push(build_read(prediction, llm).await);
    }
    reads
}

async fn build_read(prediction: TechnologyPrediction, llm: Option<&dyn LlmClient>) -> TechnologyRead {
    if let Some(client) = llm {
        let system = "Write a short technology trend read: a one-sentence summary, then a fuller \
            paragraph covering momentum, adoption signals, and outlook. Separate the summary \
            sentence from the rest with a blank line.";
        let prompt = format!(
            "Technology: {}\nScore: {:.1}\nMomentum: {:.1}\nSignals observed: {}\nLeader quotes: {}\nPatents: {}",
            prediction.technology, prediction.score, prediction.momentum, prediction.signal_count, prediction.leader_quote_count, prediction.patent_count
        );
        match client.complete_text(system, &prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                let full_read = text.trim().to_string();
                let summary = full_read.split("\n\n").next().unwrap_or(&full_read).trim().to_string();
                return TechnologyRead {
                    technology: prediction.technology,
                    score: prediction.score,
                    momentum: prediction.momentum,
                    leader_quote_count: prediction.leader_quote_count,
                    patent_count: prediction.patent_count,
                    signal_count: prediction.signal_count,
                    summary,
                    full_read,
                    generated_by: "LLM".to_string(),
                };
            }
            Ok(_) => warn!(technology = %prediction.technology, "LLM read call returned empty text, falling back"),
            Err(err) => warn!(technology = %prediction.technology, error = %err, "LLM read call failed, falling back"),
        }
    }

    template_read(prediction)
}

fn template_read(prediction: TechnologyPrediction) -> TechnologyRead {
    let summary = format!(
        "{} scores {:.0}/100 with {:.0} momentum across {} signal{}.",
        prediction.technology,
        prediction.score,
        prediction.momentum,
        prediction.signal_count,
        if prediction.signal_count == 1 { "" } else { "s" },
    );
    let full_read = format!(
        "{summary} It has surfaced in {} leader quote{} and {} patent{} in the current window.",
        prediction.leader_quote_count,
        if prediction.leader_quote_count == 1 { "" } else { "s" },
        prediction.patent_count,
        if prediction.patent_count == 1 { "" } else { "s" },
    );
    TechnologyRead {
        technology: prediction.technology,
        score: prediction.score,
        momentum: prediction.momentum,
        leader_quote_count: prediction.leader_quote_count,
        patent_count: prediction.patent_count,
        signal_count: prediction.signal_count,
        summary,
        full_read,
        generated_by: "Template".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patent_signal(now: DateTime<Utc>) -> Signal {
        Signal {
            record_type: RecordType::Patent,
            published: now,
            technologies: ["Rust".to_string()].into_iter().collect(),
            industries: Default::default(),
            sentiment: 0.0,
            confidence: 1.0,
            citations: 0,
            venue: String::new(),
            title: "t".to_string(),
            id: "id".to_string(),
        }
    }

    #[test]
    fn prediction_score_always_in_bounds() {
        let now = Utc::now();
        let signals: Vec<Signal> = (0..30).map(|_| patent_signal(now)).collect();
        let result = compute_prediction("Rust", &signals, &[], 30, now);
        assert!((0.0..=100.0).contains(&result.score));
    }

    #[test]
    fn more_patents_and_quotes_increase_score() {
        let now = Utc::now();
        let few: Vec<Signal> = (0..2).map(|_| patent_signal(now)).collect();
        let many: Vec<Signal> = (0..40).map(|_| patent_signal(now)).collect();
        let low = compute_prediction("Rust", &few, &[], 30, now);
        let high = compute_prediction("Rust", &many, &[], 30, now);
        assert!(high.score >= low.score);
    }

    /// §6/S5: with no LLM client, every read still carries a non-empty
    /// `summary` and `full_read`, and `generated_by` is exactly "Template".
    #[tokio::test]
    async fn rank_reads_falls_back_to_template_without_an_llm_client() {
        let now = Utc::now();
        let signals: Vec<Signal> = (0..5).map(|_| patent_signal(now)).collect();
        let reads = rank_reads(&signals, &[], 30, now, None).await;
        assert_eq!(reads.len(), 1);
        let read = &reads[0];
        assert_eq!(read.generated_by, "Template");
        assert!(!read.summary.is_empty());
        assert!(!read.full_read.is_empty());
        assert!(read.full_read.contains(&read.technology));
    }
}
