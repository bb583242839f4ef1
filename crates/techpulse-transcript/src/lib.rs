//! C9 — Transcript Pipeline (§4.9): produces a time-aligned transcript for
//! a video through a fallback chain of four acquisition methods, caching a
//! total miss for 24h per `videoId`.

pub mod audio;
pub mod cache;
pub mod client;
pub mod error;
pub mod format;
pub mod method;
pub mod methods;
pub mod pipeline;

pub use audio::{AudioExtractor, AudioExtractorConfig};
pub use cache::UnavailabilityCache;
pub use error::{Result, TranscriptError};
pub use format::{TranscriptSegment, format_segments};
pub use method::TranscriptMethod;
pub use methods::{
    CaptionExtractionMethod, MicroserviceMethod, PollStatus, SpeechToTextClient, SpeechToTextMethod,
    TranscriptionApiClient, TranscriptionApiMethod,
};
pub use pipeline::TranscriptPipeline;

/// Builds the standard four-method fallback chain in spec order (§4.9):
/// micro-service, captions, speech-to-text, third-party transcription API.
pub fn standard_pipeline(
    microservice: std::sync::Arc<MicroserviceMethod>,
    captions: std::sync::Arc<CaptionExtractionMethod>,
    speech_to_text: std::sync::Arc<SpeechToTextMethod>,
    transcription_api: std::sync::Arc<TranscriptionApiMethod>,
) -> TranscriptPipeline {
    let methods: Vec<std::sync::Arc<dyn TranscriptMethod>> =
        vec![microservice, captions, speech_to_text, transcription_api];
    TranscriptPipeline::new(methods)
}
