//! DBLP adapter (§4.2): XML search API, venue rotation, offset pagination
//! via `h`/`f` (hits per page / first hit).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use techpulse_core::{CanonicalRecord, DateFidelity, ExternalIds, Metadata, RecordType, Result, SourceAdapter};
use techpulse_ratelimit::RateLimiter;
use tracing::warn;

use crate::common::{admits, enrich_tags, with_identity};

const PAGE_SIZE: usize = 30;
const VENUES: &[&str] = &["PLDI", "OSDI", "SOSP", "ICML", "SIGMOD"];

pub struct DblpAdapter {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    rotation: AtomicUsize,
}

impl DblpAdapter {
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>) -> Self {
        Self::with_base_url(client, rate_limiter, "https://dblp.org/search/publ/api".to_string())
    }

    pub fn with_base_url(client: Client, rate_limiter: Arc<RateLimiter>, base_url: String) -> Self {
        Self { client, rate_limiter, base_url, rotation: AtomicUsize::new(0) }
    }

    fn next_venue(&self) -> &'static str {
        let idx = self.rotation.fetch_add(1, Ordering::Relaxed) % VENUES.len();
        VENUES[idx]
    }

    async fn fetch_page(&self, venue: &str, first: usize, hits: usize) -> crate::error::Result<String> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("q", venue.to_string()),
                    ("format", "xml".to_string()),
                    ("h", hits.to_string()),
                    ("f", first.to_string()),
                ])
                .send()
                .await?;
            crate::client::check_status(&resp)?;
            Ok(resp.text().await?)
        })
        .await
    }
}

#[async_trait]
impl SourceAdapter for DblpAdapter {
    fn name(&self) -> &str {
        "dblp"
    }

    async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let venue = self.next_venue();
        let mut records = Vec::new();
        let mut first = 0usize;

        while records.len() < limit {
            let page_size = PAGE_SIZE.min(limit - records.len()).max(1);
            let xml = match self.fetch_page(venue, first, page_size).await {
                Ok(xml) => xml,
                Err(e) => {
                    warn!(source = "dblp", venue, error = %e, "query failed, skipping");
                    break;
                }
            };
            let entries = match parse_hits(&xml, venue, date_threshold) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(source = "dblp", venue, error = %e, "malformed payload, skipping");
                    break;
                }
            };
            let got = entries.len();
            records.extend(entries);
            first += page_size;
            if got < page_size {
                break;
            }
        }

        records.truncate(limit);
        Ok(records)
    }
}

fn parse_hits(xml: &str, venue: &str, date_threshold: DateTime<Utc>) -> crate::error::Result<Vec<CanonicalRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;
    let mut buf = Vec::new();

    let mut records = Vec::new();
    let mut current_tag = String::new();
    let mut in_hit = false;

    let mut key = String::new();
    let mut title = String::new();
    let mut year = String::new();
    let mut authors = Vec::new();
    let mut venue_title = String::new();
    let mut doi = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "hit" {
                    in_hit = true;
                    key.clear();
                    title.clear();
                    year.clear();
                    authors.clear();
                    venue_title.clear();
                    doi.clear();
                    if let Some(id) = e.attributes().flatten().find(|a| a.key.as_ref() == b"id") {
                        if let Ok(val) = id.unescape_value() {
                            key = val.to_string();
                        }
                    }
                }
                current_tag = name;
            }
            Event::Text(e) => {
                if !in_hit {
                    continue;
                }
                let text = e.unescape()?.trim().to_string();
                match current_tag.as_str() {
                    "title" => title = text,
                    "year" => year = text,
                    "author" => authors.push(text),
                    "venue" => venue_title = text,
                    "doi" => doi = text,
                    _ => {}
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "hit" {
                    in_hit = false;
                    if let Some(record) = build_record(&key, &title, &year, &authors, &venue_title, &doi, venue, date_threshold) {
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

#[allow(clippy::too_many_arguments)]
fn build_record(
    key: &str,
    title: &str,
    year: &str,
    authors: &[String],
    venue_title: &str,
    doi: &str,
    query_venue: &str,
    date_threshold: DateTime<Utc>,
) -> Option<CanonicalRecord> {
    if title.is_empty() {
        return None;
    }
    let year_num: i32 = year.parse().ok()?;
    let published = Utc.with_ymd_and_hms(year_num, 1, 1, 0, 0, 0).single()?;

    if !admits(title, published, date_threshold) {
        return None;
    }

    let mut external_ids = ExternalIds::new();
    if !key.is_empty() {
        external_ids.insert("dblp".to_string(), key.to_string());
    }
    if !doi.is_empty() {
        external_ids.insert("doi".to_string(), doi.to_string());
    }

    let mut tags = std::collections::BTreeSet::new();
    tags.insert(query_venue.to_string());
    let (technologies, industries) = enrich_tags(title, "", &tags);
    let authors = CanonicalRecord::dedupe_authors(authors.to_vec());
    let venue = if venue_title.is_empty() { query_venue.to_string() } else { venue_title.to_string() };

    with_identity(CanonicalRecord {
        id: String::new(),
        record_type: RecordType::Paper,
        title: title.to_string(),
        summary: String::new(),
        published,
        updated: published,
        date_fidelity: DateFidelity::Year,
        authors,
        link: format!("https://dblp.org/rec/{key}"),
        pdf_link: None,
        venue,
        tags,
        categories: std::collections::BTreeSet::new(),
        citations: 0,
        external_ids,
        technologies,
        industries,
        metadata: Metadata::new(),
    })
}
