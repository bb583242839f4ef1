//! Fallback method 3 (§4.9): download audio, split it if oversized, and
//! transcribe each chunk with a configured speech-to-text client,
//! reassembling chunk-offset-adjusted timestamps.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::audio::{AudioExtractor, MAX_DURATION_SECONDS};
use crate::error::Result;
use crate::format::{TranscriptSegment, format_segments};
use crate::method::TranscriptMethod;

/// A speech-to-text backend, transcribing one audio chunk at a time. Chunk
/// boundaries and timestamp-offset adjustment are this method's concern,
/// not the client's — implementations only need to transcribe what they're
/// handed, starting from zero.
#[async_trait]
pub trait SpeechToTextClient: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>>;
}

pub struct SpeechToTextMethod {
    extractor: AudioExtractor,
    client: Arc<dyn SpeechToTextClient>,
}

impl SpeechToTextMethod {
    pub fn new(extractor: AudioExtractor, client: Arc<dyn SpeechToTextClient>) -> Self {
        Self { extractor, client }
    }
}

#[async_trait]
impl TranscriptMethod for SpeechToTextMethod {
    fn name(&self) -> &'static str {
        "speech-to-text"
    }

    async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        let clip = self.extractor.download(video_id).await?;
        if clip.duration_seconds > MAX_DURATION_SECONDS {
            debug!(video_id, duration_seconds = clip.duration_seconds, "skipping speech-to-text: over the 2h limit");
            return Ok(None);
        }

        let chunks = self.extractor.split_into_chunks(&clip).await?;
        let mut all_segments = Vec::new();
        for chunk in chunks {
            let mut segments = self.client.transcribe(&chunk.path).await?;
            for segment in &mut segments {
                segment.start_seconds += chunk.offset_seconds;
            }
            all_segments.extend(segments);
        }

        if all_segments.is_empty() {
            Ok(None)
        } else {
            Ok(Some(format_segments(&all_segments)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioChunk;
    use std::path::PathBuf;

    struct StubClient;

    #[async_trait]
    impl SpeechToTextClient for StubClient {
        async fn transcribe(&self, path: &Path) -> Result<Vec<TranscriptSegment>> {
            let tag = path.file_stem().and_then(|s| s.to_str()).unwrap_or("chunk").to_string();
            Ok(vec![TranscriptSegment { start_seconds: 0.0, speaker: None, text: format!("chunk {tag}") }])
        }
    }

    #[tokio::test]
    async fn chunk_timestamps_are_offset_adjusted() {
        let a = AudioChunk { path: PathBuf::from("a"), offset_seconds: 0.0 };
        let b = AudioChunk { path: PathBuf::from("b"), offset_seconds: 300.0 };
        let client = StubClient;
        let mut all = Vec::new();
        for chunk in [a, b] {
            let mut segs = client.transcribe(&chunk.path).await.unwrap();
            for s in &mut segs {
                s.start_seconds += chunk.offset_seconds;
            }
            all.extend(segs);
        }
        assert_eq!(all[0].start_seconds, 0.0);
        assert_eq!(all[1].start_seconds, 300.0);
    }
}
