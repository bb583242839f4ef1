//! Step 1 (§4.10): topic segmentation via an LLM call with JSON-schema
//! validation, falling back to ~5-minute time-based buckets when the LLM
//! is unconfigured, errors, or returns a shape we can't trust.

use chrono::Duration as ChronoDuration;
use serde::Deserialize;
use techpulse_core::{LlmClient, Segment};

use crate::transcript::{TranscriptLine, parse_transcript, total_duration};

/// Transcripts are truncated before reaching the LLM prompt (§4.10 step 1).
const MAX_TRANSCRIPT_CHARS: usize = 50_000;

/// Fallback bucket width when no LLM is configured or its output is unusable.
const FALLBACK_BUCKET_SECONDS: f64 = 300.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSegment {
    title: String,
    start_time: f64,
    end_time: f64,
    summary: String,
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LlmSegmentResponse {
    segments: Vec<LlmSegment>,
}

pub struct SegmentationOutcome {
    pub segments: Vec<Segment>,
    pub used_llm: bool,
}

pub async fn segment_transcript(
    transcript: &str,
    llm: Option<&dyn LlmClient>,
    transcript_lines: &[TranscriptLine],
) -> SegmentationOutcome {
    if let Some(client) = llm {
        let truncated: String = transcript.chars().take(MAX_TRANSCRIPT_CHARS).collect();
        let system = "You segment a video transcript by topic shift. \
            Respond with JSON only: {\"segments\": [{\"title\": string, \"startTime\": number, \"endTime\": number, \"summary\": string, \"topics\": [string]}]}.";
        match client.complete_json(system, &truncated).await {
            Ok(raw) => match parse_llm_segments(&raw, transcript_lines) {
                Some(segments) => return SegmentationOutcome { segments, used_llm: true },
                None => tracing::warn!("LLM segmentation response failed validation, falling back"),
            },
            Err(err) => tracing::warn!(error = %err, "LLM segmentation call failed, falling back"),
        }
    }
    SegmentationOutcome { segments: time_based_segments(transcript_lines), used_llm: false }
}

fn parse_llm_segments(raw: &str, transcript_lines: &[TranscriptLine]) -> Option<Vec<Segment>> {
    let parsed: LlmSegmentResponse = serde_json::from_str(raw).ok()?;
    if parsed.segments.is_empty() {
        return None;
    }
    let mut segments = Vec::with_capacity(parsed.segments.len());
    for s in parsed.segments {
        if s.title.trim().is_empty() || s.end_time < s.start_time || s.start_time < 0.0 {
            return None;
        }
        segments.push(Segment {
            title: s.title,
            start_time: s.start_time,
            end_time: s.end_time,
            summary: s.summary,
            topics: s.topics,
            transcript_snippet: snippet_for_window(transcript_lines, s.start_time, s.end_time),
            insights: Vec::new(),
            key_takeaways: Vec::new(),
        });
    }
    Some(segments)
}

fn time_based_segments(lines: &[TranscriptLine]) -> Vec<Segment> {
    if lines.is_empty() {
        return Vec::new();
    }
    let duration = total_duration(lines).max(FALLBACK_BUCKET_SECONDS);
    let bucket_count = (duration / FALLBACK_BUCKET_SECONDS).ceil().max(1.0) as usize;

    let mut segments = Vec::with_capacity(bucket_count);
    for i in 0..bucket_count {
        let start_time = i as f64 * FALLBACK_BUCKET_SECONDS;
        let end_time = ((i + 1) as f64 * FALLBACK_BUCKET_SECONDS).min(duration);
        let snippet = snippet_for_window(lines, start_time, end_time);
        let title = format!(
            "{} – {}",
            format_timestamp(start_time),
            format_timestamp(end_time)
        );
        let summary = first_sentence(&snippet);
        segments.push(Segment {
            title,
            start_time,
            end_time,
            summary,
            topics: Vec::new(),
            transcript_snippet: snippet,
            insights: Vec::new(),
            key_takeaways: Vec::new(),
        });
    }
    segments
}

fn snippet_for_window(lines: &[TranscriptLine], start_time: f64, end_time: f64) -> String {
    lines
        .iter()
        .filter(|l| l.time_seconds >= start_time && l.time_seconds < end_time)
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_sentence(text: &str) -> String {
    match text.find(['.', '!', '?']) {
        Some(idx) => text[..=idx].trim().to_string(),
        None => text.chars().take(160).collect(),
    }
}

fn format_timestamp(seconds: f64) -> String {
    let total = ChronoDuration::seconds(seconds.round() as i64);
    let h = total.num_hours();
    let m = total.num_minutes() % 60;
    let s = total.num_seconds() % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Exposed for the orchestrating `build_breakdown` call, which needs the
/// parsed lines for both segmentation and (via `transcript_snippet`) insight
/// extraction fallbacks.
pub fn lines_from(transcript: &str) -> Vec<TranscriptLine> {
    parse_transcript(transcript)
}
