//! Text Policy — English detection (§4.2, shared by every Source Adapter).
//!
//! Reject a text when it contains characters in a non-Latin script range
//! OR when the ratio of ASCII letters to non-whitespace characters falls
//! below 0.70. Short texts (under 20 characters) are accepted if the ratio
//! exceeds 0.80. When the detector genuinely cannot tell, it accepts —
//! adapters should never drop a record over an ambiguous heuristic.

/// Non-Latin script ranges that disqualify a text outright.
fn contains_non_latin_script(text: &str) -> bool {
    text.chars().any(|c| {
        let cp = c as u32;
        matches!(cp,
            0x4E00..=0x9FFF   // CJK Unified Ideographs
            | 0x3040..=0x30FF // Hiragana/Katakana
            | 0xAC00..=0xD7A3 // Hangul
            | 0x0400..=0x04FF // Cyrillic
            | 0x0600..=0x06FF // Arabic
            | 0x0590..=0x05FF // Hebrew
            | 0x0E00..=0x0E7F // Thai
        )
    })
}

/// English heuristic used by every adapter to reject non-English titles.
pub fn is_english(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        // Nothing to disqualify on; let the caller's emptiness check handle this.
        return true;
    }
    if contains_non_latin_script(trimmed) {
        return false;
    }

    let non_whitespace = trimmed.chars().filter(|c| !c.is_whitespace()).count();
    if non_whitespace == 0 {
        return true;
    }
    let ascii_letters = trimmed.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let ratio = ascii_letters as f64 / non_whitespace as f64;

    if trimmed.chars().count() < 20 {
        return ratio > 0.80;
    }
    ratio >= 0.70
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_english_title_is_accepted() {
        assert!(is_english(
            "Attention Is All You Need: A Study of Transformer Architectures"
        ));
    }

    #[test]
    fn chinese_title_is_rejected() {
        assert!(!is_english("深度学习模型的研究"));
    }

    #[test]
    fn cyrillic_title_is_rejected() {
        assert!(!is_english("Машинное обучение в медицине"));
    }

    #[test]
    fn short_mostly_symbolic_text_is_rejected() {
        assert!(!is_english("3.14159 ± 0.002"));
    }

    #[test]
    fn short_clean_english_text_is_accepted() {
        assert!(is_english("Scaling Laws"));
    }

    #[test]
    fn empty_text_is_accepted_by_default() {
        assert!(is_english(""));
    }

    #[test]
    fn mixed_latin_with_some_numbers_still_passes_long_form() {
        let text = "The 2024 benchmark results for large language models across 15 tasks and 3 domains show consistent gains";
        assert!(is_english(text));
    }
}
