//! Composite ranking for intent match candidates.
//!
//! Each strategy of the fallback chain implements `Matcher`: it names the
//! candidate predicate it needs and turns a fetched pool into a thresholded,
//! sorted, truncated list of `MatchResult`s.

pub mod advanced;
pub mod basic;
pub mod config;
pub mod diversity;
pub mod ml;

use chrono::{DateTime, Utc};
use intentmatch_model::{Intent, MatchResult, StrategyKind};
use intentmatch_query::{CandidatePredicate, QueryError};
use thiserror::Error;

pub use advanced::AdvancedMatcher;
pub use basic::BasicMatcher;
pub use config::{AdvancedConfig, BasicConfig, ConfigError, DiversityConfig, MatchConfig, MlConfig};
pub use diversity::diversify;
pub use ml::{confidence, MlFeatureMatcher};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid predicate: {0}")]
    Query(#[from] QueryError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// One strategy of the fallback chain.
pub trait Matcher: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Candidate filter for `query`, evaluated at `now`.
    fn predicate(
        &self,
        query: &Intent,
        now: DateTime<Utc>,
    ) -> Result<CandidatePredicate, MatchError>;

    /// Score, threshold, sort and truncate a fetched pool.
    fn rank(
        &self,
        query: &Intent,
        candidates: Vec<Intent>,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchResult>, MatchError>;
}

/// The default chain: advanced, then ML-feature, then basic.
pub fn default_chain(config: &MatchConfig) -> Result<Vec<Box<dyn Matcher>>, ConfigError> {
    config.validate()?;
    Ok(vec![
        Box::new(AdvancedMatcher::new(config.advanced.clone(), config.fetch_limit)?),
        Box::new(MlFeatureMatcher::new(config.ml.clone(), config.fetch_limit)?),
        Box::new(BasicMatcher::new(config.basic.clone(), config.fetch_limit)?),
    ])
}

/// Drop candidates owned by the query's owner.
pub(crate) fn exclude_own(query: &Intent, candidates: Vec<Intent>) -> Vec<Intent> {
    let before = candidates.len();
    let kept: Vec<Intent> = candidates
        .into_iter()
        .filter(|c| c.owner_id != query.owner_id)
        .collect();
    if kept.len() < before {
        tracing::debug!(
            owner_id = %query.owner_id,
            dropped = before - kept.len(),
            "Excluded own intents"
        );
    }
    kept
}

/// Keep results scoring at least `threshold`, sort by score descending, and
/// truncate to `top_k`. Equal scores keep fetch order.
pub(crate) fn accept_and_sort(
    results: Vec<MatchResult>,
    threshold: f32,
    top_k: usize,
) -> Vec<MatchResult> {
    let mut accepted: Vec<MatchResult> = results
        .into_iter()
        .filter(|r| r.score >= threshold)
        .collect();
    accepted.sort_by(|a, b| b.score.total_cmp(&a.score));
    accepted.truncate(top_k);
    accepted
}

/// Weighted sum of components, clamped into [0, 1].
pub(crate) fn weighted(parts: &[(f32, f32)]) -> f32 {
    parts
        .iter()
        .map(|(value, weight)| value * weight)
        .sum::<f32>()
        .clamp(0.0, 1.0)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use intentmatch_model::{Category, Intent, PostType};

    pub fn demand(id: &str, owner: &str, text: &str) -> Intent {
        Intent::new(id, owner, PostType::Demand, Category::Product, text)
            .with_created_at("2024-06-30T10:00:00Z")
    }

    pub fn supply(id: &str, owner: &str, text: &str) -> Intent {
        Intent::new(id, owner, PostType::Supply, Category::Product, text)
            .with_created_at("2024-06-30T09:00:00Z")
    }

    pub fn now() -> chrono::DateTime<chrono::Utc> {
        intentmatch_model::parse_timestamp("2024-06-30T12:00:00Z").unwrap()
    }
}
