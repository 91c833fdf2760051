//! Similarity and location strategy, the last link of the fallback chain.

use chrono::{DateTime, Utc};
use intentmatch_features::{cosine_similarity, location_score, word_overlap};
use intentmatch_model::{Intent, MatchResult, ScoreBreakdown, StrategyKind};
use intentmatch_query::CandidatePredicate;
use rayon::prelude::*;

use crate::config::{BasicConfig, ConfigError};
use crate::{accept_and_sort, exclude_own, weighted, MatchError, Matcher};

#[derive(Debug, Clone)]
pub struct BasicMatcher {
    config: BasicConfig,
    fetch_limit: usize,
}

impl BasicMatcher {
    pub fn new(config: BasicConfig, fetch_limit: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, fetch_limit })
    }
}

/// Embedding cosine when both sides have one, word overlap otherwise.
fn similarity(query: &Intent, candidate: &Intent) -> f32 {
    match (query.embedding.as_deref(), candidate.embedding.as_deref()) {
        (Some(q), Some(c)) => cosine_similarity(Some(q), Some(c)).clamp(0.0, 1.0),
        _ => word_overlap(&query.raw_text, &candidate.raw_text),
    }
}

impl Matcher for BasicMatcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Basic
    }

    fn predicate(
        &self,
        query: &Intent,
        now: DateTime<Utc>,
    ) -> Result<CandidatePredicate, MatchError> {
        Ok(CandidatePredicate::for_intent(query)
            .excluding_owner(query.owner_id.clone())
            .live_at(now)
            .with_limit(self.fetch_limit))
    }

    fn rank(
        &self,
        query: &Intent,
        candidates: Vec<Intent>,
        _now: DateTime<Utc>,
    ) -> Result<Vec<MatchResult>, MatchError> {
        let candidates = exclude_own(query, candidates);

        let scored: Vec<MatchResult> = candidates
            .par_iter()
            .map(|candidate| {
                let similarity = similarity(query, candidate);
                let location = location_score(query, candidate);
                let score = weighted(&[
                    (similarity, self.config.similarity_weight),
                    (location, self.config.location_weight),
                ]);
                MatchResult::new(
                    candidate,
                    ScoreBreakdown::Basic {
                        similarity,
                        location,
                    },
                    score,
                )
            })
            .collect();

        let results = accept_and_sort(scored, self.config.threshold, self.config.top_k);
        tracing::debug!(
            intent_id = %query.intent_id,
            candidates = candidates.len(),
            accepted = results.len(),
            "Basic ranking complete"
        );
        Ok(results)
    }
}
