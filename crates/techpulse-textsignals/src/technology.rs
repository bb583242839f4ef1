//! Technology-tag extraction (§3 `technologies`): a static keyword map from
//! normalized technology name to its surface-form aliases, matched over
//! `title + summary` the same way industry classification matches over
//! `title + summary + tags` — one record may carry several technologies.

use std::collections::BTreeSet;

use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;

static TECHNOLOGY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Large Language Models", &["large language model", "llm", "gpt-4", "gpt-5", "chatgpt"]),
    ("Machine Learning", &["machine learning", "deep learning", "neural network"]),
    ("Computer Vision", &["computer vision", "image recognition", "object detection"]),
    ("Reinforcement Learning", &["reinforcement learning", "rlhf", "policy gradient"]),
    ("Quantum Computing", &["quantum computing", "qubit", "quantum algorithm"]),
    ("Blockchain", &["blockchain", "smart contract", "distributed ledger"]),
    ("Robotics", &["robotics", "robotic arm", "autonomous robot"]),
    ("5G", &["5g network", "5g ", " 5g"]),
    ("Edge Computing", &["edge computing", "edge inference"]),
    ("CRISPR", &["crispr", "gene editing"]),
    ("Autonomous Vehicles", &["autonomous vehicle", "self-driving car", "adas"]),
    ("Rust", &["rust programming", "rust language", " rustc", "rust crate"]),
    ("WebAssembly", &["webassembly", "wasm"]),
    ("Kubernetes", &["kubernetes", "k8s"]),
    ("Generative AI", &["generative ai", "diffusion model", "text-to-image"]),
    ("Vector Databases", &["vector database", "vector search", "embedding index"]),
];

struct TechnologyMatcher {
    automaton: AhoCorasick,
    technologies: Vec<&'static str>,
}

static MATCHER: Lazy<TechnologyMatcher> = Lazy::new(|| {
    let mut patterns = Vec::new();
    let mut technologies = Vec::new();
    for (tech, keywords) in TECHNOLOGY_KEYWORDS {
        for kw in *keywords {
            patterns.push(*kw);
            technologies.push(*tech);
        }
    }
    let automaton = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(patterns)
        .expect("technology keyword patterns are static and always compile");
    TechnologyMatcher { automaton, technologies }
});

/// Extract normalized technology tags from `title + summary`.
pub fn extract_technologies(title: &str, summary: &str) -> BTreeSet<String> {
    let haystack = format!("{title} {summary}").to_lowercase();
    let mut hits = BTreeSet::new();
    for m in MATCHER.automaton.find_iter(&haystack) {
        hits.insert(MATCHER.technologies[m.pattern()].to_string());
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_technology() {
        let hits = extract_technologies("Scaling Large Language Models", "");
        assert!(hits.contains("Large Language Models"));
    }

    #[test]
    fn extracts_multiple_technologies_from_summary() {
        let hits = extract_technologies(
            "A survey",
            "We combine reinforcement learning with computer vision for robotics",
        );
        assert!(hits.contains("Reinforcement Learning"));
        assert!(hits.contains("Computer Vision"));
        assert!(hits.contains("Robotics"));
    }

    #[test]
    fn no_match_returns_empty_set() {
        assert!(extract_technologies("A history of 19th century poetry", "").is_empty());
    }
}
