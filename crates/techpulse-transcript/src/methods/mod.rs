//! The four fallback-chain methods (§4.9), in the order the pipeline tries them.

pub mod captions;
pub mod microservice;
pub mod speech_to_text;
pub mod transcription_api;

pub use captions::CaptionExtractionMethod;
pub use microservice::MicroserviceMethod;
pub use speech_to_text::{SpeechToTextClient, SpeechToTextMethod};
pub use transcription_api::{PollStatus, TranscriptionApiClient, TranscriptionApiMethod};
