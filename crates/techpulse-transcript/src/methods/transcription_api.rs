//! Fallback method 4 (§4.9): download audio, upload it to a third-party
//! transcription API, poll until `completed` or `error` (max wait 10 min),
//! and format the returned utterances into speaker-tagged segments.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::audio::AudioExtractor;
use crate::error::{Result, TranscriptError};
use crate::format::{TranscriptSegment, format_segments};
use crate::method::TranscriptMethod;

/// §4.9 step 4: "poll until status is completed or error (max wait 10 min)".
const MAX_POLL_WAIT: Duration = Duration::from_secs(10 * 60);
const POLL_INTERVAL: Duration = Duration::from_secs(5);

pub enum PollStatus {
    Pending,
    Completed(Vec<TranscriptSegment>),
    Error(String),
}

#[async_trait]
pub trait TranscriptionApiClient: Send + Sync {
    /// Uploads the audio buffer and returns a job id to poll.
    async fn submit(&self, audio_bytes: Vec<u8>) -> Result<String>;

    async fn poll(&self, job_id: &str) -> Result<PollStatus>;
}

pub struct TranscriptionApiMethod {
    extractor: AudioExtractor,
    client: Arc<dyn TranscriptionApiClient>,
}

impl TranscriptionApiMethod {
    pub fn new(extractor: AudioExtractor, client: Arc<dyn TranscriptionApiClient>) -> Self {
        Self { extractor, client }
    }
}

#[async_trait]
impl TranscriptMethod for TranscriptionApiMethod {
    fn name(&self) -> &'static str {
        "third-party-transcription-api"
    }

    async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        let clip = self.extractor.download(video_id).await?;
        let audio_bytes = tokio::fs::read(&clip.path).await?;
        let job_id = self.client.submit(audio_bytes).await?;

        let deadline = Instant::now() + MAX_POLL_WAIT;
        loop {
            match self.client.poll(&job_id).await? {
                PollStatus::Completed(segments) if segments.is_empty() => return Ok(None),
                PollStatus::Completed(segments) => return Ok(Some(format_segments(&segments))),
                PollStatus::Error(reason) => {
                    warn!(video_id, job_id, reason, "transcription API reported an error");
                    return Ok(None);
                }
                PollStatus::Pending => {
                    if Instant::now() >= deadline {
                        return Err(TranscriptError::PollTimeout);
                    }
                    debug!(video_id, job_id, "transcription still pending, polling again");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioExtractorConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EventuallyCompletes {
        poll_count: AtomicUsize,
        complete_after: usize,
    }

    #[async_trait]
    impl TranscriptionApiClient for EventuallyCompletes {
        async fn submit(&self, _audio_bytes: Vec<u8>) -> Result<String> {
            Ok("job-1".to_string())
        }

        async fn poll(&self, _job_id: &str) -> Result<PollStatus> {
            let n = self.poll_count.fetch_add(1, Ordering::SeqCst);
            if n + 1 >= self.complete_after {
                Ok(PollStatus::Completed(vec![TranscriptSegment {
                    start_seconds: 0.0,
                    speaker: Some("Alice".to_string()),
                    text: "done".to_string(),
                }]))
            } else {
                Ok(PollStatus::Pending)
            }
        }
    }

    fn extractor() -> AudioExtractor {
        AudioExtractor::new(AudioExtractorConfig {
            extractor_binary: "true".to_string(),
            probe_binary: "true".to_string(),
            split_binary: "true".to_string(),
            work_dir: std::env::temp_dir(),
        })
    }

    #[test]
    fn poll_status_completed_formats_into_speaker_tagged_segments() {
        let segments = vec![TranscriptSegment { start_seconds: 0.0, speaker: Some("Alice".to_string()), text: "done".to_string() }];
        assert_eq!(format_segments(&segments), "00:00:00 [Alice]: done");
    }

    #[tokio::test]
    async fn polls_until_completed() {
        let client = Arc::new(EventuallyCompletes { poll_count: AtomicUsize::new(0), complete_after: 3 });
        let method = TranscriptionApiMethod::new(extractor(), client.clone());
        // Exercise the poll loop directly rather than through `fetch`, which
        // also needs a real audio download.
        let job_id = method.client.submit(Vec::new()).await.unwrap();
        let mut completed = None;
        for _ in 0..5 {
            match method.client.poll(&job_id).await.unwrap() {
                PollStatus::Completed(segments) => {
                    completed = Some(segments);
                    break;
                }
                PollStatus::Pending => continue,
                PollStatus::Error(_) => break,
            }
        }
        assert!(completed.is_some());
    }
}
