//! Parses the Transcript Pipeline's emitted format, `HH:MM:SS [Speaker]: text`
//! (§4.9), into timestamped lines the segmentation stage buckets.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2}):(\d{2}):(\d{2})\s*(?:\[([^\]]*)\])?:\s*(.*)$").expect("static pattern"));

#[derive(Debug, Clone)]
pub struct TranscriptLine {
    pub time_seconds: f64,
    pub speaker: Option<String>,
    pub text: String,
}

/// Lines that don't match the expected format are kept with `time_seconds`
/// carried over from the previous line (transcripts occasionally wrap a
/// sentence across an emitted line) rather than dropped.
pub fn parse_transcript(transcript: &str) -> Vec<TranscriptLine> {
    let mut lines = Vec::new();
    let mut last_time = 0.0_f64;
    for raw in transcript.lines() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if let Some(caps) = LINE_PATTERN.captures(raw) {
            let h: f64 = caps[1].parse().unwrap_or(0.0);
            let m: f64 = caps[2].parse().unwrap_or(0.0);
            let s: f64 = caps[3].parse().unwrap_or(0.0);
            let time_seconds = h * 3600.0 + m * 60.0 + s;
            let speaker = caps.get(4).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty());
            let text = caps[5].to_string();
            last_time = time_seconds;
            lines.push(TranscriptLine { time_seconds, speaker, text });
        } else {
            lines.push(TranscriptLine { time_seconds: last_time, speaker: None, text: raw.to_string() });
        }
    }
    lines
}

pub fn total_duration(lines: &[TranscriptLine]) -> f64 {
    lines.last().map(|l| l.time_seconds).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_lines() {
        let input = "00:00:05 [Alice]: Welcome to the show\n00:01:30 [Bob]: Thanks for having me";
        let lines = parse_transcript(input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].time_seconds, 5.0);
        assert_eq!(lines[0].speaker.as_deref(), Some("Alice"));
        assert_eq!(lines[1].time_seconds, 90.0);
    }

    #[test]
    fn handles_lines_without_a_speaker_tag() {
        let lines = parse_transcript("00:02:00: a line with no speaker");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].speaker, None);
        assert_eq!(lines[0].text, "a line with no speaker");
    }

    #[test]
    fn non_matching_lines_inherit_the_prior_timestamp() {
        let input = "00:00:10 [Alice]: first\ncontinuation with no timestamp";
        let lines = parse_transcript(input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].time_seconds, 10.0);
    }
}
