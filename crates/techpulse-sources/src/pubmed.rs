//! PubMed adapter (§4.2): NCBI eutils, two-step `esearch` (ids) then
//! `efetch` (XML records), term rotation across cycles.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use serde::Deserialize;
use techpulse_core::{CanonicalRecord, DateFidelity, ExternalIds, Metadata, RecordType, Result, SourceAdapter};
use techpulse_ratelimit::RateLimiter;
use tracing::warn;

use crate::common::{admits, enrich_tags, with_identity};
use crate::tagging::pubmed_subject_tags;

const TERMS: &[&str] = &["genomics", "oncology", "neuroscience", "cardiology", "immunology"];

pub struct PubmedAdapter {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    esearch_url: String,
    efetch_url: String,
    rotation: AtomicUsize,
}

impl PubmedAdapter {
    pub fn new(client: Client, rate_limiter: Arc<RateLimiter>) -> Self {
        Self::with_base_urls(
            client,
            rate_limiter,
            "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi".to_string(),
            "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi".to_string(),
        )
    }

    pub fn with_base_urls(client: Client, rate_limiter: Arc<RateLimiter>, esearch_url: String, efetch_url: String) -> Self {
        Self { client, rate_limiter, esearch_url, efetch_url, rotation: AtomicUsize::new(0) }
    }

    fn next_term(&self) -> &'static str {
        let idx = self.rotation.fetch_add(1, Ordering::Relaxed) % TERMS.len();
        TERMS[idx]
    }

    async fn esearch(&self, term: &str, limit: usize) -> crate::error::Result<Vec<String>> {
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let resp = self
                .client
                .get(&self.esearch_url)
                .query(&[
                    ("db", "pubmed".to_string()),
                    ("term", term.to_string()),
                    ("retmax", limit.to_string()),
                    ("sort", "date".to_string()),
                    ("retmode", "json".to_string()),
                ])
                .send()
                .await?;
            crate::client::check_status(&resp)?;
            let parsed: EsearchResponse = resp.json().await?;
            Ok(parsed.esearchresult.idlist)
        })
        .await
    }

    async fn efetch(&self, ids: &[String]) -> crate::error::Result<String> {
        if ids.is_empty() {
            return Ok(String::new());
        }
        crate::client::with_retry(1, || async {
            let _permit = self.rate_limiter.acquire().await;
            let resp = self
                .client
                .get(&self.efetch_url)
                .query(&[("db", "pubmed"), ("id", &ids.join(",")), ("retmode", "xml")])
                .send()
                .await?;
            crate::client::check_status(&resp)?;
            Ok(resp.text().await?)
        })
        .await
    }
}

#[async_trait]
impl SourceAdapter for PubmedAdapter {
    fn name(&self) -> &str {
        "pubmed"
    }

    async fn fetch_latest(&self, limit: usize, date_threshold: DateTime<Utc>) -> Result<Vec<CanonicalRecord>> {
        let term = self.next_term();
        let ids = match self.esearch(term, limit).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(source = "pubmed", term, error = %e, "esearch failed, skipping");
                return Ok(Vec::new());
            }
        };
        let xml = match self.efetch(&ids).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(source = "pubmed", term, error = %e, "efetch failed, skipping");
                return Ok(Vec::new());
            }
        };
        let records = match parse_articles(&xml, date_threshold) {
            Ok(records) => records,
            Err(e) => {
                warn!(source = "pubmed", term, error = %e, "malformed efetch payload, skipping");
                return Ok(Vec::new());
            }
        };
        let mut records = records;
        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

fn parse_articles(xml: &str, date_threshold: DateTime<Utc>) -> crate::error::Result<Vec<CanonicalRecord>> {
    if xml.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;
    let mut buf = Vec::new();

    let mut records = Vec::new();
    let mut path: Vec<String> = Vec::new();

    let mut pmid = String::new();
    let mut title = String::new();
    let mut abstract_text = String::new();
    let mut journal = String::new();
    let mut year = String::new();
    let mut month = String::new();
    let mut day = String::new();
    let mut authors = Vec::new();
    let mut last_name = String::new();
    let mut fore_name = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "PubmedArticle" {
                    pmid.clear();
                    title.clear();
                    abstract_text.clear();
                    journal.clear();
                    year.clear();
                    month.clear();
                    day.clear();
                    authors.clear();
                }
                if name == "Author" {
                    last_name.clear();
                    fore_name.clear();
                }
                path.push(name);
            }
            Event::Text(e) => {
                let text = e.unescape()?.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match path.last().map(|s| s.as_str()) {
                    Some("PMID") if path.iter().rev().nth(1).map(|s| s == "MedlineCitation").unwrap_or(false) => pmid = text,
                    Some("ArticleTitle") => title.push_str(&text),
                    Some("AbstractText") => {
                        if !abstract_text.is_empty() {
                            abstract_text.push(' ');
                        }
                        abstract_text.push_str(&text);
                    }
                    Some("Title") => journal = text,
                    Some("Year") => year = text,
                    Some("Month") => month = text,
                    Some("Day") => day = text,
                    Some("LastName") => last_name = text,
                    Some("ForeName") => fore_name = text,
                    _ => {}
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "Author" && !last_name.is_empty() {
                    authors.push(format!("{fore_name} {last_name}").trim().to_string());
                }
                if name == "PubmedArticle" {
                    if let Some(record) = build_record(
                        &pmid,
                        &title,
                        &abstract_text,
                        &journal,
                        &year,
                        &month,
                        &day,
                        &authors,
                        date_threshold,
                    ) {
                        records.push(record);
                    }
                }
                path.pop();
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

#[allow(clippy::too_many_arguments)]
fn build_record(
    pmid: &str,
    title: &str,
    abstract_text: &str,
    journal: &str,
    year: &str,
    month: &str,
    day: &str,
    authors: &[String],
    date_threshold: DateTime<Utc>,
) -> Option<CanonicalRecord> {
    if pmid.is_empty() || title.is_empty() {
        return None;
    }
    let year_num: i32 = year.parse().ok()?;
    let month_num: u32 = month.parse().unwrap_or(1).clamp(1, 12);
    let day_num: u32 = day.parse().unwrap_or(1).clamp(1, 28);
    let (published, fidelity) = if day.is_empty() {
        if month.is_empty() {
            (CanonicalRecord::year_only_instant(year_num), DateFidelity::Year)
        } else {
            (Utc.with_ymd_and_hms(year_num, month_num, 1, 0, 0, 0).single()?, DateFidelity::Month)
        }
    } else {
        (Utc.with_ymd_and_hms(year_num, month_num, day_num, 0, 0, 0).single()?, DateFidelity::Day)
    };

    if !admits(title, published, date_threshold) {
        return None;
    }

    let mut external_ids = ExternalIds::new();
    external_ids.insert("pubmed".to_string(), pmid.to_string());

    let tags = pubmed_subject_tags(journal);
    let (technologies, industries) = enrich_tags(title, abstract_text, &tags);
    let authors = CanonicalRecord::dedupe_authors(authors.to_vec());

    with_identity(CanonicalRecord {
        id: String::new(),
        record_type: RecordType::Paper,
        title: title.to_string(),
        summary: abstract_text.to_string(),
        published,
        updated: published,
        date_fidelity: fidelity,
        authors,
        link: format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
        pdf_link: None,
        venue: journal.to_string(),
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

    const SAMPLE_ARTICLE: &str = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>12345678</PMID>
      <Article>
        <Journal>
          <JournalIssue>
            <PubDate><Year>2024</Year><Month>2</Month><Day>10</Day></PubDate>
          </JournalIssue>
          <Title>Journal of Genomics</Title>
        </Journal>
        <ArticleTitle>CRISPR Editing Outcomes in Zebrafish</ArticleTitle>
        <Abstract><AbstractText>We characterize edit fidelity.</AbstractText></Abstract>
        <AuthorList>
          <Author><LastName>Doudna</LastName><ForeName>Jennifer</ForeName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn parses_one_article_with_full_date() {
        let threshold = Utc::now() - chrono::Duration::days(365 * 5);
        let records = parse_articles(SAMPLE_ARTICLE, threshold).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_ids.get("pubmed").unwrap(), "12345678");
        assert_eq!(records[0].authors, vec!["Jennifer Doudna".to_string()]);
        assert!(records[0].tags.contains("Genomics"));
    }

    #[test]
    fn empty_payload_yields_no_records() {
        let threshold = Utc::now() - chrono::Duration::days(1);
        assert!(parse_articles("", threshold).unwrap().is_empty());
    }
}
