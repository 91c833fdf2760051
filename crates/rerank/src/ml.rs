//! Feature-based strategy: TF-IDF text, feature vectors, metro location,
//! intent compatibility and temporal signals.

use chrono::{DateTime, Utc};
use intentmatch_features::{
    cosine_similarity, extract_params, feature_vector, intent_compatibility, metro_score,
    temporal_scores, text_similarities,
};
use intentmatch_model::{Intent, MatchQuality, MatchResult, ScoreBreakdown, StrategyKind};
use intentmatch_query::CandidatePredicate;
use rayon::prelude::*;

use crate::config::{ConfigError, MlConfig};
use crate::diversity::diversify;
use crate::{accept_and_sort, exclude_own, weighted, MatchError, Matcher};

/// Spread of component scores at which the consistency penalty saturates.
const SPREAD_SATURATION: f32 = 0.3;

/// Score-consistency confidence.
///
/// `combined * 0.7 * (1 - min(stdev / 0.3, 1) * 0.3)` over the population
/// standard deviation of the components, clamped to [0, 1].
pub fn confidence(combined: f32, components: &[f32]) -> f32 {
    if components.is_empty() {
        return (combined * 0.7).clamp(0.0, 1.0);
    }
    let n = components.len() as f32;
    let mean = components.iter().sum::<f32>() / n;
    let variance = components.iter().map(|c| (c - mean).powi(2)).sum::<f32>() / n;
    let penalty = (variance.sqrt() / SPREAD_SATURATION).min(1.0);
    (combined * 0.7 * (1.0 - penalty * 0.3)).clamp(0.0, 1.0)
}

/// Second link of the fallback chain.
#[derive(Debug, Clone)]
pub struct MlFeatureMatcher {
    config: MlConfig,
    fetch_limit: usize,
}

impl MlFeatureMatcher {
    pub fn new(config: MlConfig, fetch_limit: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, fetch_limit })
    }
}

impl Matcher for MlFeatureMatcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MlFeature
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
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchResult>, MatchError> {
        let candidates = exclude_own(query, candidates);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Batch signals: the vectorizer is fit on this request's pool only.
        let texts: Vec<&str> = candidates.iter().map(|c| c.raw_text.as_str()).collect();
        let text_scores = text_similarities(&query.raw_text, &texts);
        let temporal = temporal_scores(query, &candidates, now);

        let query_features = feature_vector(query);
        let query_params = extract_params(query);

        let scored: Vec<MatchResult> = candidates
            .par_iter()
            .enumerate()
            .map(|(i, candidate)| {
                let candidate_features = feature_vector(candidate);
                let candidate_params = extract_params(candidate);

                let text = text_scores[i];
                let feature = cosine_similarity(
                    Some(query_features.as_slice()),
                    Some(candidate_features.as_slice()),
                )
                .clamp(0.0, 1.0);
                let location = metro_score(
                    query.location_name.as_deref(),
                    candidate.location_name.as_deref(),
                );
                let intent = intent_compatibility(&query_params, &candidate_params);
                let temporal = temporal[i];

                let score = weighted(&[
                    (text, self.config.text_weight),
                    (feature, self.config.feature_weight),
                    (location, self.config.location_weight),
                    (intent, self.config.intent_weight),
                    (temporal, self.config.temporal_weight),
                ]);

                let mut result = MatchResult::new(
                    candidate,
                    ScoreBreakdown::MlFeature {
                        text,
                        feature,
                        location,
                        intent,
                        temporal,
                    },
                    score,
                );
                result.confidence =
                    Some(confidence(score, &[text, feature, location, intent, temporal]));
                result.quality = Some(MatchQuality::from_score(score));
                result
            })
            .collect();

        let ranked = accept_and_sort(scored, self.config.threshold, self.config.top_k);
        let results = diversify(ranked, &self.config.diversity);

        tracing::debug!(
            intent_id = %query.intent_id,
            candidates = candidates.len(),
            accepted = results.len(),
            "ML-feature ranking complete"
        );
        Ok(results)
    }
}
