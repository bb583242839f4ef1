//! Industry classification (§4.2 shared helper): keyword match over
//! `title + summary + tags` against a static industry → keyword map. A
//! record may belong to multiple industries.

use std::collections::BTreeSet;

use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;

/// (industry label, keywords). Keywords are matched case-insensitively as
/// whole tokens are not required — this mirrors the spec's plain
/// substring "keyword match" wording, which several upstream category
/// strings (e.g. "fintech") rely on as true substrings.
static INDUSTRY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Healthcare",
        &["healthcare", "biotech", "pharma", "clinical", "medical", "genomics", "diagnosis"],
    ),
    (
        "Finance",
        &["fintech", "banking", "trading", "payments", "insurance", "blockchain", "cryptocurrency"],
    ),
    (
        "Automotive",
        &["autonomous vehicle", "self-driving", "automotive", "electric vehicle", "ev battery"],
    ),
    (
        "Aerospace",
        &["aerospace", "satellite", "spacecraft", "aviation", "drone"],
    ),
    (
        "Energy",
        &["renewable energy", "solar", "battery storage", "nuclear power", "grid"],
    ),
    (
        "Retail",
        &["e-commerce", "retail", "supply chain", "logistics"],
    ),
    (
        "Manufacturing",
        &["manufacturing", "robotics", "industrial automation", "3d printing"],
    ),
    (
        "Telecommunications",
        &["5g", "telecommunications", "wireless network", "broadband"],
    ),
    (
        "Defense",
        &["defense", "military", "cybersecurity", "surveillance"],
    ),
    (
        "Agriculture",
        &["agriculture", "agtech", "precision farming", "crop"],
    ),
);

struct IndustryMatcher {
    automaton: AhoCorasick,
    industries: Vec<&'static str>,
}

static MATCHER: Lazy<IndustryMatcher> = Lazy::new(|| {
    let mut patterns = Vec::new();
    let mut industries = Vec::new();
    for (industry, keywords) in INDUSTRY_KEYWORDS {
        for kw in *keywords {
            patterns.push(*kw);
            industries.push(*industry);
        }
    }
    let automaton = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(patterns)
        .expect("industry keyword patterns are static and always compile");
    IndustryMatcher { automaton, industries }
});

/// Classify `title + summary + tags` against the static industry map.
pub fn classify(title: &str, summary: &str, tags: &BTreeSet<String>) -> BTreeSet<String> {
    let joined_tags = tags.iter().cloned().collect::<Vec<_>>().join(" ");
    let haystack = format!("{title} {summary} {joined_tags}");
    let mut hits = BTreeSet::new();
    for m in MATCHER.automaton.find_iter(&haystack) {
        hits.insert(MATCHER.industries[m.pattern()].to_string());
    }
    hits
}
