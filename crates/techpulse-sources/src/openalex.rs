//! OpenAlex adapter (§4.2): JSON Works API, topic rotation, cursor-based
//! pagination (`cursor=*` then the `next_cursor` OpenAlex returns).

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
const TOPICS: &[&str] = &["artificial intelligence", "quantum computing", "renewable energy", "genomics", "materials science"];

pub struct OpenAlexAdapter {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl OpenAlexAdapter {
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>) -> Self {
        Self::with_base_url(client, rate_limiter, "https://api.openalex.org/works".to_string())
    }

    pub fn with_base_url(client: Client, rate_limiter: Arc<RateLimiter>, base_url: String) -> Self {
        Self { client, rate_limiter, base_url }
    }

    fn topic_for_now(&self) -> &'static str {
        let hour = Utc::now().hour() as usize;
        TOPICS[hour % TOPICS.len()]
    }

    async fn fetch_page(&self, topic: &str, cursor: &str, page_size: usize) -> crate::error::Result<WorksResponse> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("search", topic.to_string()),
                    ("per-page", page_size.to_string()),
                    ("cursor", cursor.to_string()),
                    ("sort", "publication_date:desc".to_string()),
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
impl SourceAdapter for OpenAlexAdapter {
    fn name(&self) -> &str {
        "openalex"
    }

    async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let topic = self.topic_for_now();
        let mut records = Vec::new();
        let mut cursor = "*".to_string();

        while records.len() < limit {
            let page_size = PAGE_SIZE.min(limit - records.len()).max(1);
            let page = match self.fetch_page(topic, &cursor, page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(source = "openalex", topic, error = %e, "query failed, skipping");
                    break;
                }
            };
            let got = page.results.len();
            for work in page.results {
                if let Some(record) = to_record(work, date_threshold) {
                    records.push(record);
                }
            }
            match page.meta.next_cursor {
                Some(next) if got == page_size => cursor = next,
                _ => break,
            }
        }

        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    results: Vec<WorkPayload>,
    meta: MetaPayload,
}

#[derive(Debug, Deserialize, Default)]
struct MetaPayload {
    #[serde(default, rename = "next_cursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkPayload {
    id: Option<String>,
    title: Option<String>,
    #[serde(default, rename = "publication_date")]
    publication_date: Option<String>,
    #[serde(default, rename = "host_venue")]
    host_venue: Option<VenuePayload>,
    #[serde(default, rename = "cited_by_count")]
    cited_by_count: Option<u64>,
    #[serde(default, rename = "authorships")]
    authorships: Vec<AuthorshipPayload>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default, rename = "abstract_inverted_index")]
    abstract_inverted_index: Option<std::collections::BTreeMap<String, Vec<u32>>>,
}

#[derive(Debug, Deserialize, Default)]
struct VenuePayload {
    #[serde(default, rename = "display_name")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorshipPayload {
    author: AuthorPayload,
}

#[derive(Debug, Deserialize)]
struct AuthorPayload {
    #[serde(rename = "display_name")]
    display_name: Option<String>,
}

/// OpenAlex serves abstracts as an inverted word→positions index rather
/// than plain text; rebuild the sentence from position order.
fn reconstruct_abstract(index: &std::collections::BTreeMap<String, Vec<u32>>) -> String {
    let mut positions: Vec<(u32, &str)> = index.iter().flat_map(|(word, ps)| ps.iter().map(move |p| (*p, word.as_str()))).collect();
    positions.sort_by_key(|(p, _)| *p);
    positions.into_iter().map(|(_, w)| w).collect::<Vec<_>>().join(" ")
}

fn to_record(work: WorkPayload, date_threshold: DateTime<Utc>) -> Option<CanonicalRecord> {
    let title = work.title?;
    let summary = work.abstract_inverted_index.as_ref().map(reconstruct_abstract).unwrap_or_default();

    let published = match &work.publication_date {
        Some(date) => chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt)),
        None => None,
    };
    let (published, fidelity) = match published {
        Some(p) => (p, DateFidelity::Day),
        None => return None,
    };

    if !admits(&title, published, date_threshold) {
        return None;
    }

    let authors: Vec<String> = work.authorships.into_iter().filter_map(|a| a.author.display_name).collect();

    let mut external_ids = ExternalIds::new();
    if let Some(oa_id) = work.id.as_ref() {
        let short = oa_id.rsplit('/').next().unwrap_or(oa_id);
        external_ids.insert("openAlex".to_string(), short.to_string());
    }
    if let Some(doi) = &work.doi {
        external_ids.insert("doi".to_string(), doi.clone());
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
        link: work.id.unwrap_or_default(),
        pdf_link: None,
        venue: work.host_venue.and_then(|v| v.display_name).unwrap_or_default(),
        tags,
        categories: std::collections::BTreeSet::new(),
        citations: work.cited_by_count.unwrap_or(0),
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
    async fn fetch_latest_reconstructs_abstract_from_inverted_index() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "results": [{
                "id": "https://openalex.org/W123",
                "title": "Materials for Solid State Batteries",
                "publication_date": "2024-02-01",
                "host_venue": {"display_name": "Nature Energy"},
                "cited_by_count": 3,
                "authorships": [{"author": {"display_name": "Marie Curie"}}],
                "doi": "10.1000/battery",
                "abstract_inverted_index": {"Solid": [0], "state": [1], "batteries": [2]}
            }],
            "meta": {"next_cursor": null}
        });
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_json(body)).mount(&server).await;

        let client = reqwest::Client::new();
        let limiter = Arc::new(RateLimiter::new("openalex", 1000.0));
        let adapter = OpenAlexAdapter::with_base_url(client, limiter, server.uri());

        let threshold = Utc::now() - chrono::Duration::days(365);
        let records = adapter.fetch_latest(10, threshold).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].summary, "Solid state batteries");
        assert_eq!(records[0].external_ids.get("openAlex").unwrap(), "W123");
    }
}
