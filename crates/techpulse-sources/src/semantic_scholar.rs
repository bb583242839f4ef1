//! Semantic Scholar adapter (§4.2): JSON Graph API, topic rotation by
//! hour-of-day, offset-based pagination.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Timelike, Utc};
use reqwest::Client;
use serde::Deserialize;
use techpulse_core::{CanonicalRecord, DateFidelity, ExternalIds, Metadata, RecordType, Result, SourceAdapter};
use techpulse_ratelimit::RateLimiter;
use tracing::warn;

use crate::common::{admits, enrich_tags, with_identity};

const PAGE_SIZE: usize = 50;
const TOPICS: &[&str] = &[
    "machine learning",
    "distributed systems",
    "computer vision",
    "natural language processing",
    "cryptography",
    "robotics",
];

pub struct SemanticScholarAdapter {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl SemanticScholarAdapter {
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>) -> Self {
        Self::with_base_url(client, rate_limiter, "https://api.semanticscholar.org/graph/v1/paper/search".to_string())
    }

    pub fn with_base_url(client: Client, rate_limiter: Arc<RateLimiter>, base_url: String) -> Self {
        Self { client, rate_limiter, base_url }
    }

    fn topic_for_now(&self) -> &'static str {
        let hour = Utc::now().hour() as usize;
        TOPICS[hour % TOPICS.len()]
    }

    async fn fetch_page(&self, query: &str, offset: usize, limit: usize) -> crate::error::Result<SearchResponse> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("query", query.to_string()),
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                    ("fields", "title,abstract,authors,year,venue,externalIds,citationCount,publicationDate".to_string()),
                ])
                .send()
                .await?;
            crate::client::check_status(&resp)?;
            Ok(resp.json().await?)
        })
        .await
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let topic = self.topic_for_now();
        let mut records = Vec::new();
        let mut offset = 0usize;

        while records.len() < limit {
            let page_size = PAGE_SIZE.min(limit - records.len()).max(1);
            let page = match self.fetch_page(topic, offset, page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(source = "semantic_scholar", topic, error = %e, "query failed, skipping");
                    break;
                }
            };
            let got = page.data.len();
            for paper in page.data {
                if let Some(record) = to_record(paper, date_threshold) {
                    records.push(record);
                }
            }
            offset += page_size;
            if got < page_size {
                break;
            }
        }

        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<PaperPayload>,
}

#[derive(Debug, Deserialize)]
struct PaperPayload {
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Vec<AuthorPayload>,
    year: Option<i32>,
    venue: Option<String>,
    #[serde(default, rename = "externalIds")]
    external_ids: std::collections::BTreeMap<String, serde_json::Value>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u64>,
    #[serde(rename = "publicationDate")]
    publication_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorPayload {
    name: Option<String>,
}

fn to_record(paper: PaperPayload, date_threshold: DateTime<Utc>) -> Option<CanonicalRecord> {
    let title = paper.title?;
    let summary = paper.abstract_text.unwrap_or_default();

    let published = match &paper.publication_date {
        Some(date) => chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt)),
        None => None,
    };
    let (published, fidelity) = match published {
        Some(p) => (p, DateFidelity::Day),
        None => (CanonicalRecord::year_only_instant(paper.year.unwrap_or(1970)), DateFidelity::Year),
    };

    if !admits(&title, published, date_threshold) {
        return None;
    }

    let authors: Vec<String> = paper.authors.into_iter().filter_map(|a| a.name).collect();

    let mut external_ids = ExternalIds::new();
    if let Some(doi) = paper.external_ids.get("DOI").and_then(|v| v.as_str()) {
        external_ids.insert("doi".to_string(), doi.to_string());
    }
    if let Some(arxiv_id) = paper.external_ids.get("ArXiv").and_then(|v| v.as_str()) {
        external_ids.insert("arxiv".to_string(), arxiv_id.to_string());
    }

    let tags = std::collections::BTreeSet::new();
    let (technologies, industries) = enrich_tags(&title, &summary, &tags);
    let authors = CanonicalRecord::dedupe_authors(authors);

    with_identity(CanonicalRecord {
        id: String::new(),
        record_type: RecordType::Paper,
        title,
        summary,
        published,
        updated: published,
        date_fidelity: fidelity,
        authors,
        link: String::new(),
        pdf_link: None,
        venue: paper.venue.unwrap_or_default(),
        tags,
        categories: std::collections::BTreeSet::new(),
        citations: paper.citation_count.unwrap_or(0),
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
    async fn fetch_latest_parses_paper_with_doi() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "data": [{
                "title": "Efficient Attention Mechanisms",
                "abstract": "A survey of attention variants.",
                "authors": [{"name": "Ada Lovelace"}],
                "year": 2024,
                "venue": "NeurIPS",
                "externalIds": {"DOI": "10.1000/abc"},
                "citationCount": 12,
                "publicationDate": "2024-01-05"
            }]
        });
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_json(body)).mount(&server).await;

        let client = reqwest::Client::new();
        let limiter = Arc::new(RateLimiter::new("semantic_scholar", 1000.0));
        let adapter = SemanticScholarAdapter::with_base_url(client, limiter, server.uri());

        let threshold = Utc::now() - chrono::Duration::days(365);
        let records = adapter.fetch_latest(10, threshold).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_ids.get("doi").unwrap(), "10.1000/abc");
        assert_eq!(records[0].citations, 12);
    }

    /// §4.1/§7: a 429 is retried once against the same page before the
    /// adapter advances.
    #[tokio::test(start_paused = true)]
    async fn fetch_page_retries_once_after_too_many_requests() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "data": [{
                "title": "Efficient Attention Mechanisms",
                "abstract": "A survey of attention variants.",
                "authors": [{"name": "Ada Lovelace"}],
                "year": 2024,
                "venue": "NeurIPS",
                "externalIds": {"DOI": "10.1000/abc"},
                "citationCount": 12,
                "publicationDate": "2024-01-05"
            }]
        });
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(429)).up_to_n_times(1).mount(&server).await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_json(body)).mount(&server).await;

        let client = reqwest::Client::new();
        let limiter = Arc::new(RateLimiter::new("semantic_scholar", 1000.0));
        let adapter = SemanticScholarAdapter::with_base_url(client, limiter, server.uri());

        let threshold = Utc::now() - chrono::Duration::days(365);
        let records = adapter.fetch_latest(10, threshold).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
