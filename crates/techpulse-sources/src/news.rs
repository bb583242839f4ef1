//! News adapter (§4.2): rotates across a configured list of RSS/Atom tech
//! feeds plus the Hacker News Algolia search API, both counting against
//! the shared "News aggregators" rate bucket (§4.1).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use serde::Deserialize;
use techpulse_core::{CanonicalRecord, DateFidelity, ExternalIds, Metadata, RecordType, Result, SourceAdapter};
use techpulse_ratelimit::RateLimiter;
use tracing::warn;

use crate::common::{admits, enrich_tags, with_identity};

enum Source {
    Rss(String),
    HackerNews,
}

pub struct NewsAdapter {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    sources: Vec<Source>,
    hn_base_url: String,
    rotation: AtomicUsize,
}

impl NewsAdapter {
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>, feed_urls: Vec<String>) -> Self {
        Self::with_hn_url(client, rate_limiter, feed_urls, "https://hn.algolia.com/api/v1/search_by_date".to_string())
    }

    pub fn with_hn_url(client: Client, rate_limiter: Arc<RateLimiter>, feed_urls: Vec<String>, hn_base_url: String) -> Self {
        let mut sources: Vec<Source> = feed_urls.into_iter().map(Source::Rss).collect();
        sources.push(Source::HackerNews);
        Self { client, rate_limiter, sources, hn_base_url, rotation: AtomicUsize::new(0) }
    }

    fn next_source(&self) -> &Source {
        let idx = self.rotation.fetch_add(1, Ordering::Relaxed) % self.sources.len();
        &self.sources[idx]
    }

    async fn fetch_rss(&self, url: &str) -> crate::error::Result<String> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let resp = self.client.get(url).send().await?;
            crate::client::check_status(&resp)?;
            Ok(resp.text().await?)
        })
        .await
    }

    async fn fetch_hn(&self, limit: usize) -> crate::error::Result<HnResponse> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let resp = self
                .client
                .get(&self.hn_base_url)
                .query(&[("tags", "story".to_string()), ("hitsPerPage", limit.to_string())])
                .send()
                .await?;
            crate::client::check_status(&resp)?;
            Ok(resp.json().await?)
        })
        .await
    }
}

#[async_trait]
impl SourceAdapter for NewsAdapter {
    fn name(&self) -> &str {
        "news"
    }

    async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let source = self.next_source();
        let mut records = match source {
            Source::Rss(url) => match self.fetch_rss(url).await {
                Ok(xml) => parse_rss(&xml, date_threshold).unwrap_or_else(|e| {
                    warn!(source = "news", feed = %url, error = %e, "malformed feed, skipping");
                    Vec::new()
                }),
                Err(e) => {
                    warn!(source = "news", feed = %url, error = %e, "query failed, skipping");
                    Vec::new()
                }
            },
            Source::HackerNews => match self.fetch_hn(limit).await {
                Ok(resp) => resp.hits.into_iter().filter_map(|h| hn_to_record(h, date_threshold)).collect(),
                Err(e) => {
                    warn!(source = "news", feed = "hackernews", error = %e, "query failed, skipping");
                    Vec::new()
                }
            },
        };
        records.truncate(limit);
        Ok(records)
    }
}

fn parse_rss(xml: &str, date_threshold: DateTime<Utc>) -> crate::error::Result<Vec<CanonicalRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;
    let mut buf = Vec::new();

    let mut records = Vec::new();
    let mut in_item = false;
    let mut current_tag = String::new();

    let mut title = String::new();
    let mut link = String::new();
    let mut description = String::new();
    let mut pub_date = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    in_item = true;
                    title.clear();
                    link.clear();
                    description.clear();
                    pub_date.clear();
                }
                current_tag = name;
            }
            Event::Text(e) => {
                if !in_item {
                    continue;
                }
                let text = e.unescape()?.trim().to_string();
                match current_tag.as_str() {
                    "title" => title = text,
                    "link" => link = text,
                    "description" => description = text,
                    "pubDate" => pub_date = text,
                    _ => {}
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    in_item = false;
                    if let Some(record) = build_rss_record(&title, &link, &description, &pub_date, date_threshold) {
                        records.push(record);
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

fn build_rss_record(title: &str, link: &str, description: &str, pub_date: &str, date_threshold: DateTime<Utc>) -> Option<CanonicalRecord> {
    if title.is_empty() {
        return None;
    }
    let published = DateTime::parse_from_rfc2822(pub_date).ok()?.with_timezone(&Utc);

    if !admits(title, published, date_threshold) {
        return None;
    }

    let mut external_ids = ExternalIds::new();
    external_ids.insert("url".to_string(), link.to_string());
    let tags = std::collections::BTreeSet::new();
    let (technologies, industries) = enrich_tags(title, description, &tags);

    with_identity(CanonicalRecord {
        id: String::new(),
        record_type: RecordType::News,
        title: title.to_string(),
        summary: description.to_string(),
        published,
        updated: published,
        date_fidelity: DateFidelity::Day,
        authors: Vec::new(),
        link: link.to_string(),
        pdf_link: None,
        venue: "RSS".to_string(),
        tags,
        categories: std::collections::BTreeSet::new(),
        citations: 0,
        external_ids,
        technologies,
        industries,
        metadata: Metadata::new(),
    })
}

#[derive(Debug, Deserialize)]
struct HnResponse {
    #[serde(default)]
    hits: Vec<HnHit>,
}

#[derive(Debug, Deserialize)]
struct HnHit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    points: Option<u64>,
    created_at: String,
}

fn hn_to_record(hit: HnHit, date_threshold: DateTime<Utc>) -> Option<CanonicalRecord> {
    let title = hit.title?;
    let published = DateTime::parse_from_rfc3339(&hit.created_at).ok()?.with_timezone(&Utc);

    if !admits(&title, published, date_threshold) {
        return None;
    }

    let mut external_ids = ExternalIds::new();
    external_ids.insert("hackernews".to_string(), hit.object_id.clone());
    let tags = std::collections::BTreeSet::new();
    let (technologies, industries) = enrich_tags(&title, "", &tags);

    with_identity(CanonicalRecord {
        id: String::new(),
        record_type: RecordType::News,
        title,
        summary: String::new(),
        published,
        updated: published,
        date_fidelity: DateFidelity::Day,
        authors: Vec::new(),
        link: hit.url.unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", hit.object_id)),
        pdf_link: None,
        venue: "Hacker News".to_string(),
        tags,
        categories: std::collections::BTreeSet::new(),
        citations: hit.points.unwrap_or(0),
        external_ids,
        technologies,
        industries,
        metadata: Metadata::new(),
    })
}
