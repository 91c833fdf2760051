//! Feature extraction and component scorers for intent matching.
//!
//! Provides pure functions for computing the signals combined by the ranker:
//! - Parameter normalization and fixed-length feature vectors
//! - Embedding cosine similarity (and a hashing fallback embedder)
//! - TF-IDF text similarity with a word-overlap fallback
//! - Location proximity (coordinates, names, metro groups)
//! - Structured parameter overlap and intent compatibility
//! - Price parsing and tolerance scoring
//! - Recency, mutual freshness and urgency
//!
//! Every scorer recovers from malformed input with a documented neutral value
//! instead of returning an error.

pub mod embedding;
pub mod extract;
pub mod location;
pub mod params;
pub mod price;
pub mod temporal;
pub mod text;

use std::collections::HashSet;

pub use embedding::{cosine_similarity, sanitize_text, Embedder, HashingEmbedder, EMBEDDING_DIM};
pub use extract::{detect_intent_verb, extract_params, feature_vector, FEATURE_DIM};
pub use location::{
    distance_km, distance_score, location_score, metro_group, metro_score, name_score, GeoPoint,
};
pub use params::{intent_compatibility, keyword_overlap, parameter_overlap, ATTRIBUTE_WEIGHTS};
pub use price::{parse_price, price_score, price_tolerance};
pub use temporal::{is_urgent, temporal_scores, urgency_score};
pub use text::{text_similarities, TextError, TfIdfVectorizer};

/// Score returned when a signal cannot be computed from the available data.
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Lowercased whitespace-separated words of a text.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard overlap of two sets; 0.0 when both are empty.
pub fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

/// Word-set Jaccard overlap of two raw texts.
pub fn word_overlap(a: &str, b: &str) -> f32 {
    jaccard(&word_set(a), &word_set(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_overlap() {
        assert_eq!(word_overlap("Selling iPhone 13", "selling iphone 13"), 1.0);
        assert_eq!(word_overlap("a b", "c d"), 0.0);
        assert_eq!(word_overlap("", ""), 0.0);
        assert!((word_overlap("a b c", "a b d") - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_word_set_lowercases() {
        let words = word_set("Need  PLUMBER urgently");
        assert!(words.contains("plumber"));
        assert_eq!(words.len(), 3);
    }
}
