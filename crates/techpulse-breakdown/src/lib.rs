//! C10 — Breakdown & Insight Extractor: given a transcript (from the
//! Transcript Pipeline, C9) and video metadata, produce a `Breakdown`
//! (§3, §4.10) — segmentation, per-segment insight extraction, an overall
//! summary, and (optionally) knowledge-graph ingestion.

pub mod error;
pub mod insights;
pub mod knowledge_graph;
pub mod segmentation;
pub mod summary;
pub mod transcript;

pub use error::{BreakdownError, Result};
pub use knowledge_graph::{ATOM_INSERT_BATCH_SIZE, CORRELATION_THRESHOLD, build_atoms, correlate_atoms};

use techpulse_core::{Breakdown, LlmClient};

/// Top N insights (by `depth_score`) surfaced as a segment's key takeaways.
const KEY_TAKEAWAYS_PER_SEGMENT: usize = 3;

pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
}

/// Runs steps 1–3 of §4.10 end to end: segmentation, insight extraction,
/// and overall-summary generation. Step 4 (knowledge-graph ingestion) is
/// a separate, explicitly-optional call — see [`build_atoms`] and
/// [`correlate_atoms`] — since it additionally requires an
/// `EmbeddingClient` and `VectorStore`.
pub async fn build_breakdown(
    video: &VideoMetadata,
    transcript: &str,
    llm: Option<&dyn LlmClient>,
) -> Result<Breakdown> {
    if transcript.trim().is_empty() {
        return Err(BreakdownError::EmptyTranscript);
    }

    let lines = segmentation::lines_from(transcript);
    let seg_outcome = segmentation::segment_transcript(transcript, llm, &lines).await;
    let mut segments = seg_outcome.segments;
    let mut all_insights_from_llm = seg_outcome.used_llm;

    for segment in &mut segments {
        let (mut insights, used_llm) = insights::extract_insights(segment, llm).await;
        all_insights_from_llm &= used_llm;
        insights.sort_by(|a, b| b.depth_score.partial_cmp(&a.depth_score).unwrap());
        segment.key_takeaways = insights
            .iter()
            .take(KEY_TAKEAWAYS_PER_SEGMENT)
            .map(|i| i.text.clone())
            .collect();
        segment.insights = insights;
    }

    let (overall_structure, summary_used_llm) =
        summary::build_overall_structure(&video.title, &segments, llm).await;

    let generated_by = if all_insights_from_llm && summary_used_llm && llm.is_some() {
        "LLM"
    } else {
        "Template"
    };

    Ok(Breakdown { segments, overall_structure, generated_by: generated_by.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transcript() -> &'static str {
        "00:00:00 [Alice]: Today we are going to talk about the future of distributed systems.\n\
         00:00:05 [Bob]: I predict that consensus protocols will become the dominant paradigm within the next five years.\n\
         00:05:10 [Alice]: Now let's cover observability, which grew by 40 percent in adoption last year.\n\
         00:05:20 [Bob]: Tracing is now table stakes for production services."
    }

    #[tokio::test]
    async fn template_path_produces_a_complete_breakdown() {
        let video = VideoMetadata { video_id: "v1".to_string(), title: "Systems Roundtable".to_string() };
        let breakdown = build_breakdown(&video, sample_transcript(), None).await.unwrap();
        assert_eq!(breakdown.generated_by, "Template");
        assert!(!breakdown.segments.is_empty());
        assert!(breakdown.segments.iter().any(|s| !s.insights.is_empty()));
    }

    #[tokio::test]
    async fn empty_transcript_is_rejected() {
        let video = VideoMetadata { video_id: "v1".to_string(), title: "Empty".to_string() };
        let err = build_breakdown(&video, "   ", None).await.unwrap_err();
        assert!(matches!(err, BreakdownError::EmptyTranscript));
    }
}
