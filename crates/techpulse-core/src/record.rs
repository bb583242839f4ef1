//! The Canonical Record: the unified schema every source type normalizes into.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// The artifact family a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Paper,
    News,
    Github,
    Patent,
    Job,
    Podcast,
}

impl RecordType {
    /// The source weight used by the momentum formula (§4.8).
    pub fn momentum_weight(self) -> f64 {
        match self {
            RecordType::Paper => 0.30,
            RecordType::Patent => 0.25,
            RecordType::News => 0.20,
            RecordType::Podcast => 0.15,
            RecordType::Github => 0.10,
            RecordType::Job => 0.0,
        }
    }
}

/// How much of the upstream publication date was actually observed.
///
/// Resolves the spec's open question about conflicting dates across
/// sources that only report a publication year: records stamped with
/// coarser fidelity are informational only and do not change window
/// arithmetic, which always operates on the normalized instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateFidelity {
    Year,
    Month,
    #[default]
    Day,
}

/// Recognized external-identifier namespaces, in Identity Rule precedence order.
pub const IDENTITY_NAMESPACE_ORDER: &[&str] = &[
    "arxiv",
    "doi",
    "semanticScholar",
    "openAlex",
    "pubmed",
    "dblp",
    "youtube",
];

/// Mapping from namespace to identifier, e.g. `{"arxiv": "2401.00001"}`.
pub type ExternalIds = BTreeMap<String, String>;

/// Opaque source-specific fields (stars, forks, duration, assignee, transcript, breakdown, ...).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// One research artifact: paper, news item, repository, patent, job posting, or podcast episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub date_fidelity: DateFidelity,
    #[serde(default)]
    pub authors: Vec<String>,
    pub link: String,
    #[serde(default)]
    pub pdf_link: Option<String>,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub citations: u64,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default)]
    pub technologies: BTreeSet<String>,
    #[serde(default)]
    pub industries: BTreeSet<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CanonicalRecord {
    /// Validate the invariants from §3: non-empty title, at least one identifier,
    /// parseable dates (guaranteed by the `DateTime<Utc>` type itself).
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidRecord("title is empty".into()));
        }
        if self.external_ids.values().all(|v| v.trim().is_empty())
            && normalize_title_fingerprint(&self.title).is_empty()
        {
            return Err(Error::InvalidRecord(
                "record has neither an external id nor a usable title fingerprint".into(),
            ));
        }
        Ok(())
    }

    /// Authors deduplicated while preserving first-seen order.
    pub fn dedupe_authors(authors: Vec<String>) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::with_capacity(authors.len());
        for a in authors {
            let key = a.trim().to_lowercase();
            if key.is_empty() || !seen.insert(key) {
                continue;
            }
            out.push(a);
        }
        out
    }

    /// Build an instant from a year-only upstream date: month and day default to 01.
    pub fn year_only_instant(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single().unwrap_or_else(|| {
            Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0)
                .single()
                .expect("epoch is always valid")
        })
    }

    /// First author's last name, lowercase, for fingerprint computation.
    pub fn first_author_lastname(&self) -> String {
        self.authors
            .first()
            .map(|a| {
                a.split_whitespace()
                    .last()
                    .unwrap_or(a)
                    .to_lowercase()
            })
            .unwrap_or_default()
    }
}

/// Lowercase, strip punctuation, collapse whitespace — the normalization
/// the Identity Rules and the Deduplicator's title-fingerprint pass share.
pub fn normalize_title_fingerprint(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compute the deterministic identity key per the Identity Rules (§3):
/// strongest external identifier wins; falls back to a title/author/year
/// fingerprint. Titles under 5 characters (post-normalization) never
/// produce a fingerprint key — callers must reject such records instead.
pub fn compute_identity_key(
    external_ids: &ExternalIds,
    title: &str,
    first_author_lastname: &str,
    year: i32,
) -> Option<String> {
    for ns in IDENTITY_NAMESPACE_ORDER {
        if let Some(id) = external_ids.get(*ns) {
            if !id.trim().is_empty() {
                let prefix = match *ns {
                    "arxiv" => "arxiv",
                    "doi" => "doi",
                    "semanticScholar" => "ss",
                    "openAlex" => "oa",
                    "pubmed" => "pmid",
                    "dblp" => "dblp",
                    "youtube" => "yt",
                    _ => unreachable!(),
                };
                let normalized = if *ns == "doi" {
                    normalize_doi(id)
                } else {
                    id.trim().to_string()
                };
                return Some(format!("{prefix}:{normalized}"));
            }
        }
    }
    let fp = normalize_title_fingerprint(title);
    if fp.len() < 5 {
        return None;
    }
    let mut hasher = Sha1::new();
    hasher.update(fp.as_bytes());
    hasher.update(b"|");
    hasher.update(first_author_lastname.as_bytes());
    hasher.update(b"|");
    hasher.update(year.to_string().as_bytes());
    let digest = hasher.finalize();
    Some(format!("fp:{}", hex_encode(&digest)))
}

fn normalize_doi(doi: &str) -> String {
    doi.trim()
        .trim_start_matches("https://doi.org/")
        .trim_start_matches("http://doi.org/")
        .trim_start_matches("doi:")
        .to_lowercase()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A time-aligned segment of a podcast/video transcript with extracted insights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub title: String,
    pub start_time: f64,
    pub end_time: f64,
    pub summary: String,
    pub topics: Vec<String>,
    pub transcript_snippet: String,
    pub insights: Vec<Insight>,
    pub key_takeaways: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Framework,
    TacticalAdvice,
    Tradeoff,
    PersonalExperience,
    QuantitativeClaim,
    NuancedOpinion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub text: String,
    pub depth_score: f64,
    #[serde(default)]
    pub speaker: Option<String>,
    pub timestamp: f64,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallStructure {
    pub intro: String,
    pub main_topics: Vec<String>,
    pub conclusion: String,
}

/// Attached to podcast records via `metadata.breakdown`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakdown {
    pub segments: Vec<Segment>,
    pub overall_structure: OverallStructure,
    /// "LLM" when segmentation/insights/summary came from the configured
    /// provider, "Template" when any stage fell back (§6, S5).
    pub generated_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Stance {
    Critical,
    Optimistic,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Certainty {
    Low,
    Medium,
    High,
}

/// A single factual claim extracted from a video, eligible for embedding
/// and linking in the optional knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightAtom {
    pub id: String,
    pub video_id: String,
    pub segment_index: usize,
    pub topic: String,
    pub entity: String,
    pub claim: String,
    pub stance: Stance,
    pub certainty: Certainty,
    #[serde(default)]
    pub quote: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AtomEdgeType {
    Corroboration,
    Contradiction,
    Extension,
    PredictionCheck,
    Related,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomLink {
    pub from_atom_id: String,
    pub to_atom_id: String,
    pub edge_type: AtomEdgeType,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_prefers_arxiv_over_doi() {
        let mut ids = ExternalIds::new();
        ids.insert("doi".to_string(), "10.1/x".to_string());
        ids.insert("arxiv".to_string(), "2401.00001".to_string());
        let key = compute_identity_key(&ids, "Title", "smith", 2024).unwrap();
        assert_eq!(key, "arxiv:2401.00001");
    }

    #[test]
    fn identity_falls_back_to_fingerprint() {
        let ids = ExternalIds::new();
        let key = compute_identity_key(&ids, "A Study Of Attention Mechanisms", "vaswani", 2017)
            .unwrap();
        assert!(key.starts_with("fp:"));
    }

    #[test]
    fn short_titles_skip_fingerprint() {
        let ids = ExternalIds::new();
        assert!(compute_identity_key(&ids, "Hi", "x", 2024).is_none());
    }

    #[test]
    fn title_fingerprint_ignores_case_and_punctuation() {
        let a = normalize_title_fingerprint("Attention, Is All You Need!");
        let b = normalize_title_fingerprint("attention is all you need");
        assert_eq!(a, b);
    }

    #[test]
    fn doi_normalization_strips_url_prefix() {
        let mut ids = ExternalIds::new();
        ids.insert(
            "doi".to_string(),
            "https://doi.org/10.1000/ABC".to_string(),
        );
        let key = compute_identity_key(&ids, "t", "a", 2024).unwrap();
        assert_eq!(key, "doi:10.1000/abc");
    }
}
