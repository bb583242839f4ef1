//! Step 2 (§4.10): per-segment insight extraction via an LLM JSON call,
//! discarding shallow insights, with a keyword-based fallback built on
//! `techpulse_textsignals::predictions`.

use serde::Deserialize;
use techpulse_core::{Insight, InsightType, LlmClient, Segment};
use techpulse_textsignals::contains_prediction_keyword;

/// Insights below this depth are discarded regardless of source (§4.10 step 2).
const MIN_DEPTH_SCORE: f64 = 0.4;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmInsight {
    #[serde(rename = "type")]
    insight_type: String,
    text: String,
    depth_score: f64,
    #[serde(default)]
    speaker: Option<String>,
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LlmInsightResponse {
    insights: Vec<LlmInsight>,
}

pub async fn extract_insights(segment: &Segment, llm: Option<&dyn LlmClient>) -> (Vec<Insight>, bool) {
    if let Some(client) = llm {
        let system = "You extract insights from one transcript segment. \
            Respond with JSON only: {\"insights\": [{\"type\": \"framework\"|\"tactical_advice\"|\"tradeoff\"|\"personal_experience\"|\"quantitative_claim\"|\"nuanced_opinion\", \"text\": string, \"depthScore\": number, \"speaker\": string|null, \"timestamp\": number, \"context\": string|null}]}.";
        let prompt = format!(
            "Segment title: {}\nTranscript: {}",
            segment.title, segment.transcript_snippet
        );
        match client.complete_json(system, &prompt).await {
            Ok(raw) => match parse_llm_insights(&raw, segment) {
                Some(insights) => return (insights, true),
                None => tracing::warn!("LLM insight response failed validation, falling back"),
            },
            Err(err) => tracing::warn!(error = %err, "LLM insight extraction failed, falling back"),
        }
    }
    (keyword_insights(segment), false)
}

fn parse_llm_insights(raw: &str, segment: &Segment) -> Option<Vec<Insight>> {
    let parsed: LlmInsightResponse = serde_json::from_str(raw).ok()?;
    let mut out = Vec::new();
    for i in parsed.insights {
        if i.depth_score < MIN_DEPTH_SCORE {
            continue;
        }
        let insight_type = parse_insight_type(&i.insight_type)?;
        out.push(Insight {
            insight_type,
            text: i.text,
            depth_score: i.depth_score.clamp(0.0, 1.0),
            speaker: i.speaker,
            timestamp: i.timestamp.unwrap_or(segment.start_time),
            context: i.context,
        });
    }
    Some(out)
}

fn parse_insight_type(s: &str) -> Option<InsightType> {
    match s {
        "framework" => Some(InsightType::Framework),
        "tactical_advice" => Some(InsightType::TacticalAdvice),
        "tradeoff" => Some(InsightType::Tradeoff),
        "personal_experience" => Some(InsightType::PersonalExperience),
        "quantitative_claim" => Some(InsightType::QuantitativeClaim),
        "nuanced_opinion" => Some(InsightType::NuancedOpinion),
        _ => None,
    }
}

/// A sentence-level heuristic: sentences containing a prediction keyword
/// become `nuanced_opinion` insights, sentences with a number become
/// `quantitative_claim` insights. Depth is a simple function of sentence
/// length, clamped so degenerate one-word sentences never pass the floor.
fn keyword_insights(segment: &Segment) -> Vec<Insight> {
    let mut out = Vec::new();
    for sentence in split_sentences(&segment.transcript_snippet) {
        let trimmed = sentence.trim();
        if trimmed.is_empty() {
            continue;
        }
        let word_count = trimmed.split_whitespace().count();
        let depth_score = (word_count as f64 / 40.0).min(1.0);
        if depth_score < MIN_DEPTH_SCORE {
            continue;
        }
        let insight_type = if contains_prediction_keyword(trimmed) {
            InsightType::NuancedOpinion
        } else if trimmed.chars().any(|c| c.is_ascii_digit()) {
            InsightType::QuantitativeClaim
        } else {
            continue;
        };
        out.push(Insight {
            insight_type,
            text: trimmed.to_string(),
            depth_score,
            speaker: None,
            timestamp: segment.start_time,
            context: None,
        });
    }
    out
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?']).map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(snippet: &str) -> Segment {
        Segment {
            title: "seg".to_string(),
            start_time: 0.0,
            end_time: 60.0,
            summary: String::new(),
            topics: vec![],
            transcript_snippet: snippet.to_string(),
            insights: vec![],
            key_takeaways: vec![],
        }
    }

    #[tokio::test]
    async fn keyword_fallback_flags_prediction_sentences() {
        let seg = segment(
            "I predict that this architecture will become the dominant paradigm within the next five years of industry adoption",
        );
        let (insights, used_llm) = extract_insights(&seg, None).await;
        assert!(!used_llm);
        assert!(insights.iter().any(|i| i.insight_type == InsightType::NuancedOpinion));
    }

    #[tokio::test]
    async fn short_sentences_never_pass_the_depth_floor() {
        let seg = segment("Yes. No. Maybe.");
        let (insights, _) = extract_insights(&seg, None).await;
        assert!(insights.is_empty());
    }
}
