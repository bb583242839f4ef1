//! Patent adapter (§4.2): JSON search API (PatentsView-shaped), CPC
//! classification-code rotation, offset-based pagination.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use techpulse_core::{CanonicalRecord, DateFidelity, ExternalIds, Metadata, RecordType, Result, SourceAdapter};
use techpulse_ratelimit::RateLimiter;
use tracing::warn;

use crate::common::{admits, enrich_tags, with_identity};

const PAGE_SIZE: usize = 50;
/// CPC section/class codes rotated across cycles: computing, AI, biotech, energy, comms.
const CPC_CODES: &[&str] = &["G06N", "G06F", "C12N", "H01M", "H04W"];

pub struct PatentAdapter {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    rotation: AtomicUsize,
}

impl PatentAdapter {
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>) -> Self {
        Self::with_base_url(client, rate_limiter, "https://search.patentsview.org/api/v1/patent".to_string())
    }

    pub fn with_base_url(client: Client, rate_limiter: Arc<RateLimiter>, base_url: String) -> Self {
        Self { client, rate_limiter, base_url, rotation: AtomicUsize::new(0) }
    }

    fn next_code(&self) -> &'static str {
        let idx = self.rotation.fetch_add(1, Ordering::Relaxed) % CPC_CODES.len();
        CPC_CODES[idx]
    }

    async fn fetch_page(&self, cpc: &str, offset: usize, size: usize) -> crate::error::Result<PatentResponse> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let query = serde_json::json!({"_contains": {"cpc_subclass_id": cpc}});
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("q", query.to_string()),
                    ("o", serde_json::json!({"offset": offset, "size": size}).to_string()),
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
impl SourceAdapter for PatentAdapter {
    fn name(&self) -> &str {
        "patents"
    }

    async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let cpc = self.next_code();
        let mut records = Vec::new();
        let mut offset = 0usize;

        while records.len() < limit {
            let page_size = PAGE_SIZE.min(limit - records.len()).max(1);
            let page = match self.fetch_page(cpc, offset, page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(source = "patents", cpc, error = %e, "query failed, skipping");
                    break;
                }
            };
            let items = page.patents;
            let got = items.len();
            for patent in items {
                if let Some(record) = to_record(patent, cpc, date_threshold) {
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
struct PatentResponse {
    #[serde(default)]
    patents: Vec<PatentPayload>,
}

#[derive(Debug, Deserialize)]
struct PatentPayload {
    patent_id: String,
    patent_title: String,
    patent_abstract: Option<String>,
    patent_date: String,
    #[serde(default)]
    assignees: Vec<AssigneePayload>,
    #[serde(default)]
    inventors: Vec<InventorPayload>,
}

#[derive(Debug, Deserialize)]
struct AssigneePayload {
    assignee_organization: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InventorPayload {
    inventor_name_first: Option<String>,
    inventor_name_last: Option<String>,
}

fn to_record(patent: PatentPayload, cpc: &str, date_threshold: DateTime<Utc>) -> Option<CanonicalRecord> {
    let title = patent.patent_title;
    let summary = patent.patent_abstract.unwrap_or_default();
    let published = chrono::NaiveDate::parse_from_str(&patent.patent_date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))?;

    if !admits(&title, published, date_threshold) {
        return None;
    }

    let authors: Vec<String> = patent
        .inventors
        .into_iter()
        .map(|i| format!("{} {}", i.inventor_name_first.unwrap_or_default(), i.inventor_name_last.unwrap_or_default()).trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    let assignee = patent.assignees.into_iter().find_map(|a| a.assignee_organization).unwrap_or_default();

    let mut external_ids = ExternalIds::new();
    external_ids.insert("patent".to_string(), patent.patent_id.clone());

    let mut tags = std::collections::BTreeSet::new();
    tags.insert(cpc.to_string());
    let (technologies, industries) = enrich_tags(&title, &summary, &tags);
    let authors = CanonicalRecord::dedupe_authors(authors);

    let mut metadata = Metadata::new();
    if !assignee.is_empty() {
        metadata.insert("assignee".to_string(), serde_json::json!(assignee));
    }

    with_identity(CanonicalRecord {
        id: String::new(),
        record_type: RecordType::Patent,
        title,
        summary,
        published,
        updated: published,
        date_fidelity: DateFidelity::Day,
        authors,
        link: format!("https://patents.google.com/patent/{}", patent.patent_id),
        pdf_link: None,
        venue: assignee,
        tags,
        categories: std::collections::BTreeSet::new(),
        citations: 0,
        external_ids,
        technologies,
        industries,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_latest_parses_patent_with_assignee() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "patents": [{
                "patent_id": "US11000000B2",
                "patent_title": "Neural Network Accelerator Circuit",
                "patent_abstract": "A circuit for accelerating matrix multiplication.",
                "patent_date": "2024-01-15",
                "assignees": [{"assignee_organization": "Acme Semiconductor"}],
                "inventors": [{"inventor_name_first": "Grace", "inventor_name_last": "Hopper"}]
            }]
        });
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200).set_body_json(body)).mount(&server).await;

        let client = reqwest::Client::new();
        let limiter = Arc::new(RateLimiter::new("patents", 1000.0));
        let adapter = PatentAdapter::with_base_url(client, limiter, server.uri());

        let threshold = Utc::now() - chrono::Duration::days(365);
        let records = adapter.fetch_latest(10, threshold).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].venue, "Acme Semiconductor");
        assert_eq!(records[0].external_ids.get("patent").unwrap(), "US11000000B2");
    }
}
