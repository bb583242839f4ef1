//! Step 3 (§4.10): a short overall summary of the video, either from the
//! LLM client or assembled from counts when unavailable.

use techpulse_core::{LlmClient, OverallStructure, Segment};

pub async fn build_overall_structure(
    video_title: &str,
    segments: &[Segment],
    llm: Option<&dyn LlmClient>,
) -> (OverallStructure, bool) {
    let main_topics = collect_main_topics(segments);

    if let Some(client) = llm {
        let system = "Write a two-to-three sentence conclusion summarizing the main takeaways of this video.";
        let prompt = format!(
            "Title: {}\nSegment summaries:\n{}",
            video_title,
            segments.iter().map(|s| format!("- {}", s.summary)).collect::<Vec<_>>().join("\n")
        );
        match client.complete_text(system, &prompt).await {
            Ok(conclusion) if !conclusion.trim().is_empty() => {
                let intro = segments
                    .first()
                    .map(|s| s.summary.clone())
                    .unwrap_or_else(|| format!("An overview of {video_title}."));
                return (
                    OverallStructure { intro, main_topics, conclusion: conclusion.trim().to_string() },
                    true,
                );
            }
            Ok(_) => tracing::warn!("LLM summary call returned an empty conclusion, falling back"),
            Err(err) => tracing::warn!(error = %err, "LLM summary call failed, falling back"),
        }
    }

    (template_overall_structure(video_title, segments, main_topics), false)
}

fn collect_main_topics(segments: &[Segment]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut topics = Vec::new();
    for segment in segments {
        for topic in &segment.topics {
            if seen.insert(topic.clone()) {
                topics.push(topic.clone());
            }
        }
    }
    topics
}

fn template_overall_structure(video_title: &str, segments: &[Segment], main_topics: Vec<String>) -> OverallStructure {
    let insight_count: usize = segments.iter().map(|s| s.insights.len()).sum();
    let intro = format!("{video_title} is covered across {} segments.", segments.len());
    let conclusion = format!(
        "This video spans {} segments and yields {} extracted insight{} across {} topic{}.",
        segments.len(),
        insight_count,
        if insight_count == 1 { "" } else { "s" },
        main_topics.len(),
        if main_topics.len() == 1 { "" } else { "s" },
    );
    OverallStructure { intro, main_topics, conclusion }
}

#[cfg(test)]
mod tests {
    use super::*;
    use techpulse_core::{Insight, InsightType};

    fn segment_with(insight_count: usize, topics: &[&str]) -> Segment {
        Segment {
            title: "t".to_string(),
            start_time: 0.0,
            end_time: 1.0,
            summary: "summary".to_string(),
            topics: topics.iter().map(|s| s.to_string()).collect(),
            transcript_snippet: String::new(),
            insights: (0..insight_count)
                .map(|i| Insight {
                    insight_type: InsightType::Framework,
                    text: format!("insight {i}"),
                    depth_score: 0.9,
                    speaker: None,
                    timestamp: 0.0,
                    context: None,
                })
                .collect(),
            key_takeaways: vec![],
        }
    }

    #[tokio::test]
    async fn template_fallback_counts_segments_insights_and_topics() {
        let segments = vec![segment_with(2, &["rust", "async"]), segment_with(1, &["rust"])];
        let (structure, used_llm) = build_overall_structure("My Talk", &segments, None).await;
        assert!(!used_llm);
        assert!(structure.conclusion.contains('2'));
        assert_eq!(structure.main_topics, vec!["rust".to_string(), "async".to_string()]);
    }
}
