//! Leader quotes (§4.8): predictions mined from podcast breakdowns, where
//! a segment mentions a technology and contains a prediction keyword.
//! Sorted by confidence then recency; top 20 returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use techpulse_core::{CanonicalRecord, RecordType};
use techpulse_textsignals::{contains_prediction_keyword, extract_technologies};

const TOP_N: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderQuote {
    pub technology: String,
    pub quote: String,
    pub speaker: Option<String>,
    pub video_id: String,
    pub video_title: String,
    pub timestamp: f64,
    pub confidence: f64,
    pub published: DateTime<Utc>,
}

/// Scan every podcast record's `metadata.breakdown` for segments that
/// mention a technology and contain a prediction keyword, one quote per
/// matching (segment, technology) pair. Records lacking a parseable
/// breakdown are skipped silently — breakdown construction is optional
/// per §4.10, and a missing/invalid payload here is not an error.
pub fn extract_leader_quotes(records: &[CanonicalRecord]) -> Vec<LeaderQuote> {
    let mut quotes = Vec::new();
    for record in records {
        if record.record_type != RecordType::Podcast {
            continue;
        }
        let Some(breakdown_value) = record.metadata.get("breakdown") else {
            continue;
        };
        let Ok(breakdown) = serde_json::from_value::<techpulse_core::Breakdown>(breakdown_value.clone()) else {
            continue;
        };
        for segment in &breakdown.segments {
            let text = format!("{} {}", segment.summary, segment.transcript_snippet);
            if !contains_prediction_keyword(&text) {
                continue;
            }
            let mentioned = extract_technologies(&segment.title, &text);
            if mentioned.is_empty() {
                continue;
            }
            let speaker = segment.insights.iter().find_map(|i| i.speaker.clone());
            let confidence = segment
                .insights
                .iter()
                .map(|i| i.depth_score)
                .fold(0.0_f64, f64::max)
                .max(0.5);
            for tech in mentioned {
                quotes.push(LeaderQuote {
                    technology: tech,
                    quote: segment.summary.clone(),
                    speaker: speaker.clone(),
                    video_id: record.id.clone(),
                    video_title: record.title.clone(),
                    timestamp: segment.start_time,
                    confidence,
                    published: record.published,
                });
            }
        }
    }
    quotes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.published.cmp(&a.published))
    });
    quotes.truncate(TOP_N);
    quotes
}

/// Count of leader quotes already attributed to `technology`, used by the
/// emerging-technology and prediction-score formulas' `leader_mentions`/
/// `leader-quote count` terms.
pub fn mention_count(quotes: &[LeaderQuote], technology: &str) -> usize {
    quotes.iter().filter(|q| q.technology == technology).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use techpulse_core::{Breakdown, ExternalIds, Insight, InsightType, Metadata, OverallStructure, Segment};

    fn podcast_with_breakdown(segments: Vec<Segment>) -> CanonicalRecord {
        let breakdown = Breakdown {
            segments,
            overall_structure: OverallStructure {
                intro: String::new(),
                main_topics: vec![],
                conclusion: String::new(),
            },
            generated_by: "LLM".to_string(),
        };
        let mut metadata = Metadata::new();
        metadata.insert("breakdown".to_string(), serde_json::to_value(&breakdown).unwrap());
        CanonicalRecord {
            id: "yt:abc".to_string(),
            record_type: RecordType::Podcast,
            title: "A Podcast".to_string(),
            summary: String::new(),
            published: Utc::now(),
            updated: Utc::now(),
            date_fidelity: Default::default(),
            authors: vec![],
            link: "https://youtube.com/watch?v=abc".to_string(),
            pdf_link: None,
            venue: "Some Channel".to_string(),
            tags: Default::default(),
            categories: Default::default(),
            citations: 0,
            external_ids: ExternalIds::new(),
            technologies: Default::default(),
            industries: Default::default(),
            metadata,
        }
    }

    #[test]
    fn extracts_quote_when_segment_predicts_and_mentions_technology() {
        let segment = Segment {
            title: "Rust's future".to_string(),
            start_time: 120.0,
            end_time: 300.0,
            summary: "I predict Rust will become the dominant systems language".to_string(),
            topics: vec!["rust".to_string()],
            transcript_snippet: String::new(),
            insights: vec![Insight {
                insight_type: InsightType::NuancedOpinion,
                text: "Rust adoption is accelerating".to_string(),
                depth_score: 0.8,
                speaker: Some("Host".to_string()),
                timestamp: 125.0,
                context: None,
            }],
            key_takeaways: vec![],
        };
        let record = podcast_with_breakdown(vec![segment]);
        let quotes = extract_leader_quotes(&[record]);
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].technology, "Rust");
        assert_eq!(quotes[0].speaker.as_deref(), Some("Host"));
    }

    #[test]
    fn segments_without_prediction_keyword_are_skipped() {
        let segment = Segment {
            title: "Rust basics".to_string(),
            start_time: 0.0,
            end_time: 60.0,
            summary: "Rust has a borrow checker".to_string(),
            topics: vec![],
            transcript_snippet: String::new(),
            insights: vec![],
            key_takeaways: vec![],
        };
        let record = podcast_with_breakdown(vec![segment]);
        assert!(extract_leader_quotes(&[record]).is_empty());
    }

    #[test]
    fn records_without_breakdown_metadata_are_skipped() {
        let mut record = podcast_with_breakdown(vec![]);
        record.metadata.clear();
        assert!(extract_leader_quotes(&[record]).is_empty());
    }
}
