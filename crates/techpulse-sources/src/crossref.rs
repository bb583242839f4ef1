//! Crossref adapter (§4.2): JSON Works API, venue rotation, offset-based
//! pagination, with a polite-contact string in the `mailto` query param
//! (§4.1's "Crossref ≤10 rps with a polite-contact string").

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use techpulse_core::{CanonicalRecord, DateFidelity, ExternalIds, Metadata, RecordType, Result, SourceAdapter};
use techpulse_ratelimit::RateLimiter;
use tracing::warn;

use crate::common::{admits, enrich_tags, with_identity};

const PAGE_SIZE: usize = 50;
const VENUES: &[&str] = &["Nature", "Science", "IEEE Transactions", "ACM Computing Surveys", "Cell"];

pub struct CrossrefAdapter {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    polite_contact: String,
    rotation: AtomicUsize,
}

impl CrossrefAdapter {
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>, polite_contact: String) -> Self {
        Self::with_base_url(client, rate_limiter, "https://api.crossref.org/works".to_string(), polite_contact)
    }

    pub fn with_base_url(client: Client, rate_limiter: Arc<RateLimiter>, base_url: String, polite_contact: String) -> Self {
        Self { client, rate_limiter, base_url, polite_contact, rotation: AtomicUsize::new(0) }
    }

    fn next_venue(&self) -> &'static str {
        let idx = self.rotation.fetch_add(1, Ordering::Relaxed) % VENUES.len();
        VENUES[idx]
    }

    async fn fetch_page(&self, venue: &str, offset: usize, rows: usize) -> crate::error::Result<WorksResponse> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("query.container-title", venue.to_string()),
                    ("sort", "published".to_string()),
                    ("order", "desc".to_string()),
                    ("rows", rows.to_string()),
                    ("offset", offset.to_string()),
                    ("mailto", self.polite_contact.clone()),
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
impl SourceAdapter for CrossrefAdapter {
    fn name(&self) -> &str {
        "crossref"
    }

    async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let venue = self.next_venue();
        let mut records = Vec::new();
        let mut offset = 0usize;

        while records.len() < limit {
            let page_size = PAGE_SIZE.min(limit - records.len()).max(1);
            let page = match self.fetch_page(venue, offset, page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(source = "crossref", venue, error = %e, "query failed, skipping");
                    break;
                }
            };
            let items = page.message.items;
            let got = items.len();
            for item in items {
                if let Some(record) = to_record(item, date_threshold) {
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
struct WorksResponse {
    message: MessagePayload,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    items: Vec<ItemPayload>,
}

#[derive(Debug, Deserialize)]
struct ItemPayload {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    author: Vec<AuthorPayload>,
    #[serde(default, rename = "container-title")]
    container_title: Vec<String>,
    #[serde(rename = "is-referenced-by-count")]
    cited_by: Option<u64>,
    #[serde(rename = "published")]
    published: Option<DatePartsPayload>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorPayload {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatePartsPayload {
    #[serde(rename = "date-parts")]
    date_parts: Vec<Vec<i32>>,
}

fn parse_published(parts: &DatePartsPayload) -> Option<(DateTime<Utc>, DateFidelity)> {
    let parts = parts.date_parts.first()?;
    let year = *parts.first()?;
    match (parts.get(1), parts.get(2)) {
        (Some(&month), Some(&day)) => Utc
            .with_ymd_and_hms(year, month as u32, day as u32, 0, 0, 0)
            .single()
            .map(|dt| (dt, DateFidelity::Day)),
        (Some(&month), None) => Utc
            .with_ymd_and_hms(year, month as u32, 1, 0, 0, 0)
            .single()
            .map(|dt| (dt, DateFidelity::Month)),
        _ => Some((CanonicalRecord::year_only_instant(year), DateFidelity::Year)),
    }
}

fn to_record(item: ItemPayload, date_threshold: DateTime<Utc>) -> Option<CanonicalRecord> {
    let title = item.title.into_iter().next()?;
    let (published, fidelity) = item.published.as_ref().and_then(parse_published)?;

    if !admits(&title, published, date_threshold) {
        return None;
    }

    let authors: Vec<String> = item
        .author
        .into_iter()
        .map(|a| format!("{} {}", a.given.unwrap_or_default(), a.family.unwrap_or_default()).trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    let mut external_ids = ExternalIds::new();
    if let Some(doi) = item.doi {
        external_ids.insert("doi".to_string(), doi);
    }

    let summary = item.abstract_text.unwrap_or_default();
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
        link: external_ids.get("doi").map(|d| format!("https://doi.org/{d}")).unwrap_or_default(),
        pdf_link: None,
        venue: item.container_title.into_iter().next().unwrap_or_default(),
        tags,
        categories: std::collections::BTreeSet::new(),
        citations: item.cited_by.unwrap_or(0),
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
    async fn fetch_latest_parses_doi_and_date_parts() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "message": {
                "items": [{
                    "title": ["Climate Models at Scale"],
                    "DOI": "10.1038/s41586",
                    "author": [{"given": "Rosalind", "family": "Franklin"}],
                    "container-title": ["Nature"],
                    "is-referenced-by-count": 7,
                    "published": {"date-parts": [[2024, 3, 15]]},
                    "abstract": "A new climate modeling approach."
                }]
            }
        });
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_json(body)).mount(&server).await;

        let client = reqwest::Client::new();
        let limiter = Arc::new(RateLimiter::new("crossref", 1000.0));
        let adapter = CrossrefAdapter::with_base_url(client, limiter, server.uri(), "techpulse@example.com".to_string());

        let threshold = Utc::now() - chrono::Duration::days(365);
        let records = adapter.fetch_latest(10, threshold).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_ids.get("doi").unwrap(), "10.1038/s41586");
        assert_eq!(records[0].authors, vec!["Rosalind Franklin".to_string()]);
    }
}
