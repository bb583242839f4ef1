//! The fallback chain's common output shape (§4.9): `HH:MM:SS [Speaker]: text`,
//! one line per segment.

use chrono::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start_seconds: f64,
    pub speaker: Option<String>,
    pub text: String,
}

pub fn format_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| {
            let ts = format_timestamp(s.start_seconds);
            match &s.speaker {
                Some(speaker) => format!("{ts} [{speaker}]: {}", s.text),
                None => format!("{ts}: {}", s.text),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_timestamp(seconds: f64) -> String {
    let total = Duration::seconds(seconds.round().max(0.0) as i64);
    let h = total.num_hours();
    let m = total.num_minutes() % 60;
    let s = total.num_seconds() % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
