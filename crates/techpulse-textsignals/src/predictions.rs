//! Prediction-keyword detection, used by the Analytics Engine's leader-quote
//! extraction (§4.8: "a segment mentions a technology and contains a
//! prediction-keyword") and by the Breakdown Extractor's keyword-based
//! stance/certainty fallback heuristics (§4.10) when the LLM is unavailable.

use once_cell::sync::Lazy;
use regex::RegexSet;

static PREDICTION_PATTERNS: &[&str] = &[
    r"(?i)\bwill become\b",
    r"(?i)\bgoing to (be|replace|transform|disrupt)\b",
    r"(?i)\bnext (big|decade|wave)\b",
    r"(?i)\bin (the next|5|10) years\b",
    r"(?i)\bpredict(s|ion)?\b",
    r"(?i)\bI expect\b",
    r"(?i)\bmark my words\b",
    r"(?i)\bfuture of\b",
    r"(?i)\binevitabl[ey]\b",
];

static PREDICTION_SET: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(PREDICTION_PATTERNS).expect("prediction patterns are static"));

static CERTAINTY_HIGH_PATTERNS: &[&str] =
    &[r"(?i)\bdefinitely\b", r"(?i)\bcertainly\b", r"(?i)\bwithout a doubt\b", r"(?i)\bguarantee\b"];
static CERTAINTY_LOW_PATTERNS: &[&str] =
    &[r"(?i)\bmaybe\b", r"(?i)\bmight\b", r"(?i)\bpossibly\b", r"(?i)\bI think\b", r"(?i)\bnot sure\b"];

static CERTAINTY_HIGH_SET: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(CERTAINTY_HIGH_PATTERNS).expect("certainty patterns are static"));
static CERTAINTY_LOW_SET: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(CERTAINTY_LOW_PATTERNS).expect("certainty patterns are static"));

static STANCE_CRITICAL_WORDS: &[&str] = &[
    "overhyped", "concern", "risk", "skeptical", "problem", "dangerous", "flawed", "fail",
];
static STANCE_OPTIMISTIC_WORDS: &[&str] = &[
    "excited", "promising", "transform", "breakthrough", "opportunity", "powerful", "great",
];

/// Does this text contain a prediction-style keyword or phrase?
pub fn contains_prediction_keyword(text: &str) -> bool {
    PREDICTION_SET.is_match(text)
}

/// Certainty heuristic for the keyword-based insight fallback (§4.10).
pub fn heuristic_certainty(text: &str) -> &'static str {
    if CERTAINTY_HIGH_SET.is_match(text) {
        "High"
    } else if CERTAINTY_LOW_SET.is_match(text) {
        "Low"
    } else {
        "Medium"
    }
}

/// Stance heuristic for the keyword-based insight fallback (§4.10).
pub fn heuristic_stance(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let critical = STANCE_CRITICAL_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let optimistic = STANCE_OPTIMISTIC_WORDS.iter().filter(|w| lower.contains(*w)).count();
    match critical.cmp(&optimistic) {
        std::cmp::Ordering::Greater => "Critical",
        std::cmp::Ordering::Less => "Optimistic",
        std::cmp::Ordering::Equal => "Neutral",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_prediction_phrase() {
        assert!(contains_prediction_keyword(
            "I predict this will become the dominant paradigm within 5 years"
        ));
    }

    #[test]
    fn plain_statement_has_no_prediction_keyword() {
        assert!(!contains_prediction_keyword("The benchmark ran for three hours"));
    }

    #[test]
    fn certainty_heuristics() {
        assert_eq!(heuristic_certainty("This will definitely happen"), "High");
        assert_eq!(heuristic_certainty("It might possibly work"), "Low");
        assert_eq!(heuristic_certainty("It will happen"), "Medium");
    }

    #[test]
    fn stance_heuristics() {
        assert_eq!(heuristic_stance("This is a dangerous, flawed approach"), "Critical");
        assert_eq!(heuristic_stance("This is an exciting breakthrough opportunity"), "Optimistic");
        assert_eq!(heuristic_stance("This is a technology"), "Neutral");
    }
}
