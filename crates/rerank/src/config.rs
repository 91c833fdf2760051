//! Strategy weights, thresholds and limits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use intentmatch_query::DEFAULT_FETCH_LIMIT;

const WEIGHT_SUM_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{message}")]
    Validation { message: String },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn check_weights(section: &str, weights: &[(&str, f32)]) -> Result<(), ConfigError> {
    for (name, weight) in weights {
        if !weight.is_finite() || *weight < 0.0 {
            return Err(invalid(format!(
                "{section}.{name} must be a finite number, zero or greater."
            )));
        }
    }
    let sum: f32 = weights.iter().map(|(_, w)| w).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(invalid(format!(
            "{section} weights must sum to 1.0 (got {sum})."
        )));
    }
    Ok(())
}

fn check_threshold(section: &str, threshold: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(invalid(format!(
            "{section}.threshold must be within [0, 1]."
        )));
    }
    Ok(())
}

fn check_top_k(section: &str, top_k: usize) -> Result<(), ConfigError> {
    if top_k == 0 {
        return Err(invalid(format!(
            "{section}.top_k must be greater than zero."
        )));
    }
    Ok(())
}

/// Embedding, location, parameter and price composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    pub semantic_weight: f32,
    pub location_weight: f32,
    pub parameter_weight: f32,
    pub price_weight: f32,
    /// Minimum composite score to accept
    pub threshold: f32,
    pub top_k: usize,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.40,
            location_weight: 0.20,
            parameter_weight: 0.30,
            price_weight: 0.10,
            threshold: 0.75,
            top_k: 7,
        }
    }
}

impl AdvancedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_weights(
            "advanced",
            &[
                ("semantic_weight", self.semantic_weight),
                ("location_weight", self.location_weight),
                ("parameter_weight", self.parameter_weight),
                ("price_weight", self.price_weight),
            ],
        )?;
        check_threshold("advanced", self.threshold)?;
        check_top_k("advanced", self.top_k)
    }
}

/// Near-duplicate suppression for the ML-feature strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    /// Filter only runs when more candidates than this remain
    pub min_candidates: usize,
    /// Stop once this many candidates are kept
    pub max_results: usize,
    /// Word overlap above which a candidate counts as a duplicate
    pub max_overlap: f32,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            min_candidates: 5,
            max_results: 12,
            max_overlap: 0.7,
        }
    }
}

impl DiversityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_results == 0 {
            return Err(invalid("ml.diversity.max_results must be greater than zero."));
        }
        if !(0.0..=1.0).contains(&self.max_overlap) {
            return Err(invalid("ml.diversity.max_overlap must be within [0, 1]."));
        }
        Ok(())
    }
}

/// Text, feature, metro location, intent and temporal composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    pub text_weight: f32,
    pub feature_weight: f32,
    pub location_weight: f32,
    pub intent_weight: f32,
    pub temporal_weight: f32,
    pub threshold: f32,
    /// Results kept before diversity filtering
    pub top_k: usize,
    pub diversity: DiversityConfig,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            text_weight: 0.30,
            feature_weight: 0.25,
            location_weight: 0.20,
            intent_weight: 0.15,
            temporal_weight: 0.10,
            threshold: 0.30,
            top_k: 15,
            diversity: DiversityConfig::default(),
        }
    }
}

impl MlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_weights(
            "ml",
            &[
                ("text_weight", self.text_weight),
                ("feature_weight", self.feature_weight),
                ("location_weight", self.location_weight),
                ("intent_weight", self.intent_weight),
                ("temporal_weight", self.temporal_weight),
            ],
        )?;
        check_threshold("ml", self.threshold)?;
        check_top_k("ml", self.top_k)?;
        self.diversity.validate()
    }
}

/// Similarity and location composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub similarity_weight: f32,
    pub location_weight: f32,
    pub threshold: f32,
    pub top_k: usize,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            similarity_weight: 0.70,
            location_weight: 0.30,
            threshold: 0.30,
            top_k: 10,
        }
    }
}

impl BasicConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_weights(
            "basic",
            &[
                ("similarity_weight", self.similarity_weight),
                ("location_weight", self.location_weight),
            ],
        )?;
        check_threshold("basic", self.threshold)?;
        check_top_k("basic", self.top_k)
    }
}

/// Configuration for all three strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub advanced: AdvancedConfig,
    pub ml: MlConfig,
    pub basic: BasicConfig,
    /// Candidates fetched per strategy attempt
    pub fetch_limit: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            advanced: AdvancedConfig::default(),
            ml: MlConfig::default(),
            basic: BasicConfig::default(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.advanced.validate()?;
        self.ml.validate()?;
        self.basic.validate()?;
        if self.fetch_limit == 0 {
            return Err(invalid("fetch_limit must be greater than zero."));
        }
        Ok(())
    }
}
