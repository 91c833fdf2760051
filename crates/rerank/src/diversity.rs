//! Near-duplicate suppression over a sorted result list.

use std::collections::HashSet;

use intentmatch_features::{jaccard, word_set};
use intentmatch_model::MatchResult;

use crate::config::DiversityConfig;

/// Greedy diversity pass over results already sorted best-first.
///
/// Runs only when more than `min_candidates` results are present. The top
/// result is always kept; each later result is dropped when its word overlap
/// with any kept result exceeds `max_overlap`. Stops at `max_results`.
pub fn diversify(results: Vec<MatchResult>, config: &DiversityConfig) -> Vec<MatchResult> {
    if results.len() <= config.min_candidates {
        return results;
    }

    let input = results.len();
    let mut kept: Vec<MatchResult> = Vec::with_capacity(config.max_results.min(input));
    let mut kept_words: Vec<HashSet<String>> = Vec::new();

    for result in results {
        if kept.len() >= config.max_results {
            break;
        }
        let words = word_set(&result.raw_text);
        let duplicate = kept_words
            .iter()
            .any(|selected| jaccard(&words, selected) > config.max_overlap);
        if kept.is_empty() || !duplicate {
            kept_words.push(words);
            kept.push(result);
        }
    }

    tracing::debug!(input, kept = kept.len(), "Diversity filter applied");
    kept
}
