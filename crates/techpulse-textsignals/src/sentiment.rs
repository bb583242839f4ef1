//! Sentiment for the Signal Aggregator (§4.7): a bag-of-words differential
//! over a static positive/negative lexicon, clamped to `[-1, 1]`. Only
//! news records carry a non-zero sentiment; other types always score 0.

static POSITIVE_WORDS: &[&str] = &[
    "breakthrough", "surge", "growth", "record", "success", "innovative", "leading",
    "advance", "accelerate", "boost", "win", "gain", "strong", "soar", "milestone",
    "promising", "efficient", "robust", "outperform", "adoption",
];

static NEGATIVE_WORDS: &[&str] = &[
    "decline", "crash", "failure", "lawsuit", "breach", "layoff", "delay", "recall",
    "controversy", "concern", "risk", "warning", "setback", "struggle", "plunge",
    "shutdown", "fraud", "vulnerability", "criticism", "backlash",
];

fn count_matches(haystack_lower: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| haystack_lower.contains(*w)).count()
}

/// Bag-of-words differential sentiment, clamped to `[-1, 1]`.
pub fn score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let pos = count_matches(&lower, POSITIVE_WORDS) as f64;
    let neg = count_matches(&lower, NEGATIVE_WORDS) as f64;
    let total = pos + neg;
    if total == 0.0 {
        return 0.0;
    }
    ((pos - neg) / total).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_text_scores_above_zero() {
        assert!(score("Company announces breakthrough growth and record adoption") > 0.0);
    }

    #[test]
    fn negative_text_scores_below_zero() {
        assert!(score("Company faces lawsuit over data breach and security vulnerability") < 0.0);
    }

    #[test]
    fn neutral_text_scores_zero() {
        assert_eq!(score("The quarterly report was published on schedule"), 0.0);
    }

    #[test]
    fn score_is_always_clamped() {
        let extreme = POSITIVE_WORDS.join(" ");
        assert!(score(&extreme) <= 1.0);
    }
}
