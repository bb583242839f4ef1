//! Keyword- and lexicon-based text signals shared across adapters,
//! the Signal Aggregator, and the Breakdown Extractor's heuristic
//! fallbacks: English-text detection, industry classification, sentiment
//! scoring, and prediction-keyword detection.

pub mod english;
pub mod industry;
pub mod predictions;
pub mod sentiment;
pub mod technology;

pub use english::is_english;
pub use industry::classify as classify_industries;
pub use predictions::{contains_prediction_keyword, heuristic_certainty, heuristic_stance};
pub use sentiment::score as sentiment_score;
pub use technology::extract_technologies;
