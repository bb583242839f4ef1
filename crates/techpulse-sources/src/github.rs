//! GitHub adapter (§4.2): JSON Search Repositories API, topic rotation,
//! page-number pagination.

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
use crate::tagging::github_topic_tags;

const PAGE_SIZE: usize = 50;
const TOPICS: &[&str] = &["machine-learning", "rust", "webassembly", "kubernetes", "llm"];

pub struct GithubAdapter {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    rotation: AtomicUsize,
}

impl GithubAdapter {
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>) -> Self {
        Self::with_base_url(client, rate_limiter, "https://api.github.com/search/repositories".to_string())
    }

    pub fn with_base_url(client: Client, rate_limiter: Arc<RateLimiter>, base_url: String) -> Self {
        Self { client, rate_limiter, base_url, rotation: AtomicUsize::new(0) }
    }

    fn next_topic(&self) -> &'static str {
        let idx = self.rotation.fetch_add(1, Ordering::Relaxed) % TOPICS.len();
        TOPICS[idx]
    }

    async fn fetch_page(&self, topic: &str, page: usize, per_page: usize) -> crate::error::Result<SearchResponse> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("q", format!("topic:{topic}")),
                    ("sort", "updated".to_string()),
                    ("order", "desc".to_string()),
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
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
impl SourceAdapter for GithubAdapter {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let topic = self.next_topic();
        let mut records = Vec::new();
        let mut page = 1usize;

        while records.len() < limit {
            let page_size = PAGE_SIZE.min(limit - records.len()).max(1);
            let resp = match self.fetch_page(topic, page, page_size).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(source = "github", topic, error = %e, "query failed, skipping");
                    break;
                }
            };
            let got = resp.items.len();
            for repo in resp.items {
                if let Some(record) = to_record(repo, topic, date_threshold) {
                    records.push(record);
                }
            }
            page += 1;
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
    items: Vec<RepoPayload>,
}

#[derive(Debug, Deserialize)]
struct RepoPayload {
    id: u64,
    full_name: String,
    name: String,
    description: Option<String>,
    html_url: String,
    stargazers_count: u64,
    forks_count: u64,
    #[serde(default)]
    topics: Vec<String>,
    updated_at: String,
    pushed_at: String,
    language: Option<String>,
}

fn to_record(repo: RepoPayload, query_topic: &str, date_threshold: DateTime<Utc>) -> Option<CanonicalRecord> {
    let title = repo.full_name.clone();
    let summary = repo.description.unwrap_or_default();
    let published = DateTime::parse_from_rfc3339(&repo.pushed_at).ok()?.with_timezone(&Utc);
    let updated = DateTime::parse_from_rfc3339(&repo.updated_at).map(|d| d.with_timezone(&Utc)).unwrap_or(published);

    if !admits(&title, published, date_threshold) {
        return None;
    }

    let mut external_ids = ExternalIds::new();
    external_ids.insert("github".to_string(), repo.id.to_string());

    let mut tags = github_topic_tags(&repo.topics);
    tags.insert(query_topic.to_string());
    if let Some(lang) = &repo.language {
        tags.insert(lang.clone());
    }
    let (technologies, industries) = enrich_tags(&title, &summary, &tags);

    let mut metadata = Metadata::new();
    metadata.insert("stars".to_string(), serde_json::json!(repo.stargazers_count));
    metadata.insert("forks".to_string(), serde_json::json!(repo.forks_count));

    with_identity(CanonicalRecord {
        id: String::new(),
        record_type: RecordType::Github,
        title,
        summary,
        published,
        updated,
        date_fidelity: DateFidelity::Day,
        authors: Vec::new(),
        link: repo.html_url,
        pdf_link: None,
        venue: "GitHub".to_string(),
        tags,
        categories: std::collections::BTreeSet::new(),
        citations: repo.stargazers_count,
        external_ids,
        technologies,
        industries,
        metadata,
    })
}
