//! Upstream-category → canonical tag mapping (§4.2 "Tagging"). Each adapter
//! maps its own category vocabulary to a human-readable tag; a subject-class
//! prefix (e.g. `cs.*`, `math.*`) additionally contributes one coarse domain
//! tag regardless of which specific subcategory matched.

use std::collections::BTreeSet;

/// arXiv category code → canonical tag, plus the coarse domain tag derived
/// from the prefix before the dot.
pub fn arxiv_category_tags(category: &str) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    if let Some(tag) = arxiv_specific_tag(category) {
        tags.insert(tag.to_string());
    }
    if let Some(domain) = arxiv_domain_tag(category) {
        tags.insert(domain.to_string());
    }
    tags
}

fn arxiv_specific_tag(category: &str) -> Option<&'static str> {
    Some(match category {
        "cs.LG" => "Machine Learning",
        "cs.AI" => "Artificial Intelligence",
        "cs.CL" => "Natural Language Processing",
        "cs.CV" => "Computer Vision",
        "cs.RO" => "Robotics",
        "cs.CR" => "Cryptography and Security",
        "cs.DC" => "Distributed Computing",
        "cs.SE" => "Software Engineering",
        "stat.ML" => "Machine Learning",
        "quant-ph" => "Quantum Computing",
        "q-bio.GN" => "Genomics",
        _ => return None,
    })
}

fn arxiv_domain_tag(category: &str) -> Option<&'static str> {
    let prefix = category.split('.').next().unwrap_or(category);
    Some(match prefix {
        "cs" => "Computer Science",
        "math" => "Mathematics",
        "stat" => "Statistics",
        "physics" | "astro-ph" | "cond-mat" | "quant-ph" | "hep-th" | "hep-ph" => "Physics",
        "q-bio" => "Biology",
        "q-fin" => "Finance",
        "eess" => "Electrical Engineering",
        _ => return None,
    })
}

/// PubMed/MeSH-adjacent broad subject tag from a journal/venue name fragment.
/// PubMed does not expose arXiv-style category codes, so tagging falls back
/// to matching well-known subject keywords in the venue string.
pub fn pubmed_subject_tags(venue: &str) -> BTreeSet<String> {
    let lower = venue.to_lowercase();
    let mut tags = BTreeSet::new();
    let pairs: &[(&str, &str)] = &[
        ("genom", "Genomics"),
        ("neuro", "Neuroscience"),
        ("oncol", "Oncology"),
        ("immunol", "Immunology"),
        ("cardio", "Cardiology"),
        ("bioinformatic", "Bioinformatics"),
    ];
    for (needle, tag) in pairs {
        if lower.contains(needle) {
            tags.insert(tag.to_string());
        }
    }
    tags
}

/// GitHub topic strings pass through as tags directly, title-cased for
/// consistency with the other adapters' human-readable tags.
pub fn github_topic_tags(topics: &[String]) -> BTreeSet<String> {
    topics
        .iter()
        .map(|t| {
            t.split(['-', '_'])
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arxiv_category_contributes_both_specific_and_domain_tag() {
        let tags = arxiv_category_tags("cs.LG");
        assert!(tags.contains("Machine Learning"));
        assert!(tags.contains("Computer Science"));
    }

    #[test]
    fn unknown_arxiv_subcategory_still_yields_domain_tag() {
        let tags = arxiv_category_tags("math.CO");
        assert_eq!(tags, BTreeSet::from(["Mathematics".to_string()]));
    }

    #[test]
    fn github_topics_are_title_cased() {
        let topics = vec!["machine-learning".to_string(), "rust_lang".to_string()];
        let tags = github_topic_tags(&topics);
        assert!(tags.contains("Machine Learning"));
        assert!(tags.contains("Rust Lang"));
    }
}
