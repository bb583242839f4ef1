//! YouTube adapter (§4.2): JSON Data API v3 `playlistItems` listing over a
//! channel's uploads playlist, channel rotation, page-token pagination.
//! Emits `RecordType::Podcast` records; transcript/breakdown attachment
//! happens later in the pipeline (§4.9, §4.10), not here.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use techpulse_core::{CanonicalRecord, DateFidelity, ExternalIds, Metadata, RecordType, Result, SourceAdapter};
use techpulse_ratelimit::RateLimiter;
use tracing::warn;

use crate::common::{admits, enrich_tags, with_identity};

const PAGE_SIZE: usize = 50;

pub struct YoutubeAdapter {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    api_key: Option<String>,
    channel_playlists: Vec<String>,
    rotation: AtomicUsize,
}

impl YoutubeAdapter {
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>, channel_playlists: Vec<String>, api_key: Option<String>) -> Self {
        Self::with_base_url(
            client,
            rate_limiter,
            "https://www.googleapis.com/youtube/v3/playlistItems".to_string(),
            channel_playlists,
            api_key,
        )
    }

    pub fn with_base_url(
        client: Client,
        rate_limiter: Arc<RateLimiter>,
        base_url: String,
        channel_playlists: Vec<String>,
        api_key: Option<String>,
    ) -> Self {
        Self { client, rate_limiter, base_url, api_key, channel_playlists, rotation: AtomicUsize::new(0) }
    }

    fn next_playlist(&self) -> Option<&str> {
        if self.channel_playlists.is_empty() {
            return None;
        }
        let idx = self.rotation.fetch_add(1, Ordering::Relaxed) % self.channel_playlists.len();
        Some(self.channel_playlists[idx].as_str())
    }

    async fn fetch_page(&self, playlist_id: &str, page_token: &str, max_results: usize) -> crate::error::Result<PlaylistResponse> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let mut query = vec![
                ("part".to_string(), "snippet,contentDetails".to_string()),
                ("playlistId".to_string(), playlist_id.to_string()),
                ("maxResults".to_string(), max_results.to_string()),
            ];
            if !page_token.is_empty() {
                query.push(("pageToken".to_string(), page_token.to_string()));
            }
            if let Some(key) = &self.api_key {
                query.push(("key".to_string(), key.clone()));
            }
            let resp = self.client.get(&self.base_url).query(&query).send().await?;
            crate::client::check_status(&resp)?;
            Ok(resp.json().await?)
        })
        .await
    }
}

#[async_trait]
impl SourceAdapter for YoutubeAdapter {
    fn name(&self) -> &str {
        "youtube"
    }

    async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let Some(playlist_id) = self.next_playlist() else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        let mut page_token = String::new();

        while records.len() < limit {
            let page_size = PAGE_SIZE.min(limit - records.len()).max(1);
            let page = match self.fetch_page(playlist_id, &page_token, page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(source = "youtube", playlist_id, error = %e, "query failed, skipping");
                    break;
                }
            };
            let got = page.items.len();
            for item in page.items {
                if let Some(record) = to_record(item, date_threshold) {
                    records.push(record);
                }
            }
            match page.next_page_token {
                Some(token) if got == page_size => page_token = token,
                _ => break,
            }
        }

        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct PlaylistResponse {
    #[serde(default)]
    items: Vec<PlaylistItemPayload>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemPayload {
    snippet: SnippetPayload,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetailsPayload,
}

#[derive(Debug, Deserialize)]
struct SnippetPayload {
    title: String,
    description: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetailsPayload {
    #[serde(rename = "videoId")]
    video_id: String,
}

fn to_record(item: PlaylistItemPayload, date_threshold: DateTime<Utc>) -> Option<CanonicalRecord> {
    let title = item.snippet.title;
    let summary = item.snippet.description;
    let published = DateTime::parse_from_rfc3339(&item.snippet.published_at).ok()?.with_timezone(&Utc);

    if !admits(&title, published, date_threshold) {
        return None;
    }

    let video_id = item.content_details.video_id;
    let mut external_ids = ExternalIds::new();
    external_ids.insert("youtube".to_string(), video_id.clone());

    let tags = std::collections::BTreeSet::new();
    let (technologies, industries) = enrich_tags(&title, &summary, &tags);

    with_identity(CanonicalRecord {
        id: String::new(),
        record_type: RecordType::Podcast,
        title,
        summary,
        published,
        updated: published,
        date_fidelity: DateFidelity::Day,
        authors: Vec::new(),
        link: format!("https://www.youtube.com/watch?v={video_id}"),
        pdf_link: None,
        venue: item.snippet.channel_title,
        tags,
        categories: std::collections::BTreeSet::new(),
        citations: 0,
        external_ids,
        technologies,
        industries,
        metadata: Metadata::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_latest_parses_playlist_item_as_podcast() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "items": [{
                "snippet": {
                    "title": "Scaling Inference with Rust",
                    "description": "A deep dive into serving LLMs in production.",
                    "channelTitle": "Systems Weekly",
                    "publishedAt": "2024-03-10T00:00:00Z"
                },
                "contentDetails": {"videoId": "abc123"}
            }]
        });
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_json(body)).mount(&server).await;

        let client = reqwest::Client::new();
        let limiter = Arc::new(RateLimiter::new("youtube", 1000.0));
        let adapter = YoutubeAdapter::with_base_url(client, limiter, server.uri(), vec!["UUxyz".to_string()], None);

        let threshold = Utc::now() - chrono::Duration::days(365);
        let records = adapter.fetch_latest(10, threshold).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type, RecordType::Podcast);
        assert_eq!(records[0].external_ids.get("youtube").unwrap(), "abc123");
    }

    #[tokio::test]
    async fn fetch_latest_returns_empty_when_no_channels_configured() {
        let client = reqwest::Client::new();
        let limiter = Arc::new(RateLimiter::new("youtube", 1000.0));
        let adapter = YoutubeAdapter::new(client, limiter, vec![], None);
        let records = adapter.fetch_latest(10, Utc::now()).await.unwrap();
        assert!(records.is_empty());
    }
}
