//! Lexical similarity via a request-scoped TF-IDF vectorizer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::word_overlap;

/// Vocabulary cap for the vectorizer.
pub const MAX_FEATURES: usize = 1000;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("Empty vocabulary: documents contain only stop words")]
    EmptyVocabulary,
    #[error("Vectorizer used before fit")]
    NotFitted,
}

#[allow(clippy::expect_used)]
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "almost", "alone", "along",
    "already", "also", "although", "always", "am", "among", "an", "and", "another", "any",
    "anyone", "anything", "anyway", "anywhere", "are", "around", "as", "at", "back", "be",
    "became", "because", "become", "been", "before", "being", "below", "beside", "between",
    "both", "but", "by", "can", "cannot", "could", "do", "done", "down", "due", "during", "each",
    "either", "else", "enough", "etc", "even", "ever", "every", "few", "for", "from", "further",
    "get", "give", "go", "had", "has", "have", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "however", "if", "in", "into", "is", "it", "its", "itself", "just",
    "last", "least", "less", "many", "may", "me", "might", "mine", "more", "most", "mostly",
    "much", "must", "my", "myself", "neither", "never", "nevertheless", "next", "no", "nobody",
    "none", "nor", "not", "nothing", "now", "of", "off", "often", "on", "once", "one", "only",
    "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over",
    "own", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seems", "several", "she", "should", "since", "so", "some", "somehow", "someone",
    "something", "sometime", "sometimes", "somewhere", "still", "such", "than", "that", "the",
    "their", "them", "themselves", "then", "there", "therefore", "these", "they", "this",
    "those", "though", "through", "thus", "to", "together", "too", "toward", "towards", "under",
    "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were", "what", "whatever",
    "when", "whenever", "where", "whether", "which", "while", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
    "yourself", "yourselves",
];

static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Unigram and bigram terms of a document, stop words removed.
fn analyze(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !STOP_SET.contains(t))
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    terms.extend(tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])));
    terms
}

/// TF-IDF vectorizer fit jointly over one request's corpus.
///
/// The fitted vocabulary is specific to the documents it was fit on, so an
/// instance belongs to a single match request.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    max_features: usize,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl Default for TfIdfVectorizer {
    fn default() -> Self {
        Self::new(MAX_FEATURES)
    }
}

impl TfIdfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features: max_features.max(1),
            vocabulary: HashMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Fit on `documents` and return their L2-normalised TF-IDF rows.
    pub fn fit_transform(&mut self, documents: &[&str]) -> Result<Vec<Vec<f64>>, TextError> {
        let analyzed: Vec<Vec<String>> = documents.iter().map(|d| analyze(d)).collect();

        let mut corpus_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for terms in &analyzed {
            let mut seen = HashSet::new();
            for term in terms {
                *corpus_counts.entry(term.as_str()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *document_frequency.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }

        if corpus_counts.is_empty() {
            return Err(TextError::EmptyVocabulary);
        }

        // Most frequent terms first; BTreeMap order breaks ties alphabetically.
        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.max_features);
        let mut kept: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort_unstable();

        let n = documents.len() as f64;
        self.idf = kept
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(i, term)| (term.to_string(), i))
            .collect();

        Ok(analyzed.iter().map(|terms| self.weigh(terms)).collect())
    }

    /// Transform a document with the fitted vocabulary.
    pub fn transform(&self, document: &str) -> Result<Vec<f64>, TextError> {
        if self.vocabulary.is_empty() {
            return Err(TextError::NotFitted);
        }
        Ok(self.weigh(&analyze(document)))
    }

    fn weigh(&self, terms: &[String]) -> Vec<f64> {
        let mut row = vec![0.0; self.vocabulary.len()];
        for term in terms {
            if let Some(&idx) = self.vocabulary.get(term) {
                row[idx] += 1.0;
            }
        }
        for (idx, value) in row.iter_mut().enumerate() {
            *value *= self.idf[idx];
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
        row
    }
}

/// Dot product of two L2-normalised rows.
fn row_similarity(a: &[f64], b: &[f64]) -> f32 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (dot as f32).clamp(0.0, 1.0)
}

/// Similarity of `query` against each candidate text, values in [0, 1].
///
/// Fits a fresh vectorizer over `{query, candidates...}`. When the vocabulary
/// is degenerate, falls back to word-set overlap.
pub fn text_similarities(query: &str, candidates: &[&str]) -> Vec<f32> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut corpus = Vec::with_capacity(candidates.len() + 1);
    corpus.push(query);
    corpus.extend_from_slice(candidates);

    let mut vectorizer = TfIdfVectorizer::default();
    match vectorizer.fit_transform(&corpus) {
        Ok(rows) => rows[1..]
            .iter()
            .map(|row| row_similarity(&rows[0], row))
            .collect(),
        Err(err) => {
            tracing::warn!(error = %err, "TF-IDF failed, using word overlap");
            candidates.iter().map(|c| word_overlap(query, c)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_drops_stop_words_and_adds_bigrams() {
        let terms = analyze("Looking for the iPhone 13");
        assert_eq!(terms, vec!["looking", "iphone", "13", "looking iphone", "iphone 13"]);
    }

    #[test]
    fn test_fit_transform_rows_are_normalised() {
        let mut vectorizer = TfIdfVectorizer::default();
        let rows = vectorizer
            .fit_transform(&["buy laptop online", "sell laptop", "plumber needed"])
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(vectorizer.vocabulary_size() > 0);
        for row in rows {
            let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_vocabulary_cap() {
        let mut vectorizer = TfIdfVectorizer::new(3);
        vectorizer
            .fit_transform(&["alpha beta gamma delta", "alpha beta"])
            .unwrap();
        assert_eq!(vectorizer.vocabulary_size(), 3);
    }

    #[test]
    fn test_text_similarities_ranks_related_text_higher() {
        let sims = text_similarities(
            "Looking for iPhone 13 in Whitefield",
            &["Selling iPhone 13 in Whitefield", "Plumber available in HSR Layout"],
        );
        assert_eq!(sims.len(), 2);
        assert!(sims[0] > sims[1]);
        assert!(sims.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_stop_word_corpus_falls_back_to_overlap() {
        let sims = text_similarities("to be or not", &["to be", "a"]);
        assert!((sims[0] - 0.5).abs() < 1e-6);
        assert_eq!(sims[1], 0.0);
    }

    #[test]
    fn test_transform_requires_fit() {
        let vectorizer = TfIdfVectorizer::default();
        assert!(matches!(vectorizer.transform("x"), Err(TextError::NotFitted)));
    }

    #[test]
    fn test_empty_candidates() {
        assert!(text_similarities("anything", &[]).is_empty());
    }
}
