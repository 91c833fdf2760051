//! Multi-criteria strategy: embeddings, location, parameters and price.

use chrono::{DateTime, Utc};
use intentmatch_features::{
    cosine_similarity, extract_params, location_score, parameter_overlap, price_score,
};
use intentmatch_model::{Intent, MatchResult, ParamSet, ScoreBreakdown, StrategyKind};
use intentmatch_query::CandidatePredicate;
use rayon::prelude::*;

use crate::config::{AdvancedConfig, ConfigError};
use crate::{accept_and_sort, exclude_own, weighted, MatchError, Matcher};

/// First link of the fallback chain.
///
/// Retrieves candidates carrying the complementary intent verb and requires a
/// high composite score.
#[derive(Debug, Clone)]
pub struct AdvancedMatcher {
    config: AdvancedConfig,
    fetch_limit: usize,
}

impl AdvancedMatcher {
    pub fn new(config: AdvancedConfig, fetch_limit: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, fetch_limit })
    }

    fn score(&self, query: &Intent, query_params: &ParamSet, candidate: &Intent) -> MatchResult {
        let candidate_params = extract_params(candidate);

        let semantic = cosine_similarity(query.embedding.as_deref(), candidate.embedding.as_deref())
            .clamp(0.0, 1.0);
        let location = location_score(query, candidate);
        let parameters = parameter_overlap(query_params, &candidate_params);
        let price = price_score(query_params, &candidate_params);

        let score = weighted(&[
            (semantic, self.config.semantic_weight),
            (location, self.config.location_weight),
            (parameters, self.config.parameter_weight),
            (price, self.config.price_weight),
        ]);

        let breakdown = ScoreBreakdown::Advanced {
            semantic,
            location,
            parameters,
            price,
        };
        MatchResult::new(candidate, breakdown, score)
    }
}

impl Matcher for AdvancedMatcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Advanced
    }

    fn predicate(
        &self,
        query: &Intent,
        now: DateTime<Utc>,
    ) -> Result<CandidatePredicate, MatchError> {
        let params = extract_params(query);
        let verb = params.intent.as_deref().unwrap_or_default();
        let predicate = CandidatePredicate::for_intent(query)
            .with_inverted_verb(verb)?
            .excluding_owner(query.owner_id.clone())
            .live_at(now)
            .with_limit(self.fetch_limit);
        Ok(predicate)
    }

    fn rank(
        &self,
        query: &Intent,
        candidates: Vec<Intent>,
        _now: DateTime<Utc>,
    ) -> Result<Vec<MatchResult>, MatchError> {
        let candidates = exclude_own(query, candidates);
        let query_params = extract_params(query);

        let scored: Vec<MatchResult> = candidates
            .par_iter()
            .map(|candidate| self.score(query, &query_params, candidate))
            .collect();

        let results = accept_and_sort(scored, self.config.threshold, self.config.top_k);
        tracing::debug!(
            intent_id = %query.intent_id,
            candidates = candidates.len(),
            accepted = results.len(),
            "Advanced ranking complete"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{demand, now, supply};

    fn matcher() -> AdvancedMatcher {
        AdvancedMatcher::new(AdvancedConfig::default(), 100).unwrap()
    }

    fn params(intent: &str, price: Option<&str>) -> ParamSet {
        ParamSet {
            intent: Some(intent.into()),
            category: Some("phone".into()),
            brand: Some("apple".into()),
            model: Some("iphone 13".into()),
            price: price.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_predicate_uses_inverted_verb() {
        let query = demand("q", "me", "Looking for iPhone 13");
        let predicate = matcher().predicate(&query, now()).unwrap();
        assert_eq!(predicate.verb.as_deref(), Some("sell"));
        assert_eq!(predicate.exclude_owner.as_deref(), Some("me"));
        assert_eq!(predicate.limit, 100);
    }

    #[test]
    fn test_predicate_rejects_unusable_verb() {
        let query = demand("q", "me", "x").with_params(ParamSet {
            intent: Some("want to buy".into()),
            ..Default::default()
        });
        assert!(matches!(
            matcher().predicate(&query, now()),
            Err(MatchError::Query(_))
        ));
    }

    #[test]
    fn test_strong_match_accepted() {
        let embedding = vec![0.6, 0.8, 0.0];
        let query = demand("q", "me", "Looking for iPhone 13")
            .with_location_name("Whitefield")
            .with_params(params("buy", Some("50000")))
            .with_embedding(embedding.clone());
        let candidate = supply("c", "them", "Selling iPhone 13")
            .with_location_name("Whitefield")
            .with_params(params("sell", Some("50000")))
            .with_embedding(embedding);

        let results = matcher().rank(&query, vec![candidate], now()).unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert_eq!(results[0].strategy(), StrategyKind::Advanced);
    }

    #[test]
    fn test_missing_embeddings_fall_below_threshold() {
        let query = demand("q", "me", "Looking for iPhone 13")
            .with_location_name("Whitefield")
            .with_params(params("buy", Some("50000")));
        let candidate = supply("c", "them", "Selling iPhone 13")
            .with_location_name("Whitefield")
            .with_params(params("sell", Some("50000")));

        // semantic 0: 0.2 + 0.3 + 0.1 = 0.6 < 0.75
        assert!(matcher().rank(&query, vec![candidate], now()).unwrap().is_empty());
    }

    #[test]
    fn test_own_candidates_never_returned() {
        let embedding = vec![1.0, 0.0];
        let query = demand("q", "me", "Need phone").with_embedding(embedding.clone());
        let own = supply("own", "me", "Selling phone").with_embedding(embedding.clone());
        let other = supply("other", "you", "Selling phone").with_embedding(embedding);

        let results = matcher().rank(&query, vec![own, other], now()).unwrap();
        assert!(results.iter().all(|r| r.owner_id != "me"));
    }

    #[test]
    fn test_scores_bounded() {
        let query = demand("q", "me", "Need phone").with_embedding(vec![1.0, 0.0]);
        let candidates = vec![
            supply("a", "x", "Selling phone").with_embedding(vec![-1.0, 0.0]),
            supply("b", "y", "Selling phone").with_embedding(vec![1.0, 0.0]),
        ];
        let config = AdvancedConfig {
            threshold: 0.0,
            ..Default::default()
        };
        let results = AdvancedMatcher::new(config, 10)
            .unwrap()
            .rank(&query, candidates, now())
            .unwrap();
        assert_eq!(results.len(), 2);
        for r in results {
            assert!((0.0..=1.0).contains(&r.score));
        }
    }
}
