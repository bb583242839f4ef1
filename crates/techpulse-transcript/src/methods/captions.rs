//! Fallback method 2 (§4.9): pull existing captions in a preferred
//! language list (en, en-US, en-GB), then any language, from a caption
//! extraction service queried over HTTP.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{Result, TranscriptError};
use crate::format::{TranscriptSegment, format_segments};
use crate::method::TranscriptMethod;

/// Preference order for caption tracks (§4.9 step 2).
const PREFERRED_LANGUAGES: &[&str] = &["en", "en-US", "en-GB"];

#[derive(Debug, Deserialize)]
struct CaptionCue {
    start: f64,
    #[serde(default)]
    speaker: Option<String>,
    text: String,
}

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    cues: Vec<CaptionCue>,
}

pub struct CaptionExtractionMethod {
    client: Client,
    base_url: String,
}

impl CaptionExtractionMethod {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn fetch_language(&self, video_id: &str, lang: &str) -> Result<Option<CaptionResponse>> {
        let response = self
            .client
            .get(format!("{}/captions", self.base_url))
            .query(&[("videoId", video_id), ("lang", lang)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::FORBIDDEN => Err(TranscriptError::AccessBlocked(
                "caption extraction returned 403".to_string(),
            )),
            status => Err(TranscriptError::Upstream { status: status.as_u16() }),
        }
    }
}

#[async_trait]
impl TranscriptMethod for CaptionExtractionMethod {
    fn name(&self) -> &'static str {
        "caption-extraction"
    }

    async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        for lang in PREFERRED_LANGUAGES {
            if let Some(resp) = self.fetch_language(video_id, lang).await? {
                return Ok(Some(format_captions(resp)));
            }
        }
        // No preferred-language track; ask for whatever the track list has.
        if let Some(resp) = self.fetch_language(video_id, "any").await? {
            return Ok(Some(format_captions(resp)));
        }
        Ok(None)
    }
}

fn format_captions(resp: CaptionResponse) -> String {
    let segments: Vec<TranscriptSegment> = resp
        .cues
        .into_iter()
        .map(|c| TranscriptSegment { start_seconds: c.start, speaker: c.speaker, text: c.text })
        .collect();
    format_segments(&segments)
}
