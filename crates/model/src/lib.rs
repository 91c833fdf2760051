//! Core domain model for intent matching.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `Intent`: A demand or supply post with text, parameters and location
//! - `ParamSet`: The sparse structured attributes of an intent
//! - `MatchResult`: A ranked candidate with its score breakdown
//! - `MatchQuality` / `StrategyKind`: Labels attached to results

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Side of the market an intent is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    /// Someone asking for something
    Demand,
    /// Someone offering something
    Supply,
}

impl PostType {
    /// The side a matching candidate must be on.
    pub fn opposite(self) -> Self {
        match self {
            Self::Demand => Self::Supply,
            Self::Supply => Self::Demand,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Demand => "demand",
            Self::Supply => "supply",
        }
    }
}

/// Coarse category of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Product,
    Service,
    Social,
    Travel,
    General,
}

impl Category {
    /// All categories in one-hot encoding order.
    pub const ALL: [Category; 5] = [
        Category::Product,
        Category::Service,
        Category::Social,
        Category::Travel,
        Category::General,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Service => "service",
            Self::Social => "social",
            Self::Travel => "travel",
            Self::General => "general",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::General
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "product" => Self::Product,
            "service" => Self::Service,
            "social" => Self::Social,
            "travel" => Self::Travel,
            _ => Self::General,
        }
    }
}

/// Structured attributes of an intent, produced by the query interpreter.
///
/// Every field is optional; scorers treat an absent field as "not comparable"
/// rather than as a mismatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    /// Intent verb (buy, sell, rent, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Fine-grained category text (e.g. "laptop"), not the coarse `Category`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Model year, kept as text so "2019" and 2019 both deserialize
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,

    /// Asking price (supply side)
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<String>,

    /// Budget (demand side)
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget: Option<String>,

    /// Location mentioned in the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_preference: Option<String>,

    /// Ordered specification list ("16GB RAM", ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// All location mentions found by the lexical parser
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,

    /// All price mentions found by the lexical parser
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<String>,

    /// Externally supplied profile features, copied into the feature vector
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile_features: Vec<f32>,
}

impl ParamSet {
    /// Price if set, otherwise budget.
    pub fn price_or_budget(&self) -> Option<&str> {
        self.price
            .as_deref()
            .or(self.budget.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Embedding as a JSON array or as pgvector text (`"[0.1,0.2]"`).
/// Unreadable values become `None`.
fn vector_or_text<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => serde_json::from_str(&s).ok(),
        Some(array @ serde_json::Value::Array(_)) => serde_json::from_value(array).ok(),
        _ => None,
    })
}

fn default_true() -> bool {
    true
}

/// A demand or supply post.
///
/// Field aliases accept the column names used by the intents table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub intent_id: String,

    /// Owner (user) identifier
    #[serde(alias = "user_id")]
    pub owner_id: String,

    /// Owner display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,

    pub post_type: PostType,

    #[serde(default)]
    pub category: Category,

    /// Free text as typed by the user
    #[serde(alias = "raw_query")]
    pub raw_text: String,

    /// Structured parameters from the query interpreter
    #[serde(default, alias = "parsed_data", skip_serializing_if = "Option::is_none")]
    pub params: Option<ParamSet>,

    /// Semantic embedding of `raw_text`
    #[serde(
        default,
        deserialize_with = "vector_or_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub embedding: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,

    /// Geometry text, `POINT(lng lat)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Creation time (ISO 8601)
    #[serde(default)]
    pub created_at: String,

    /// Expiry time (ISO 8601)
    #[serde(default, alias = "expiry_date", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl Intent {
    /// Create a minimal active intent for testing.
    pub fn new(
        intent_id: impl Into<String>,
        owner_id: impl Into<String>,
        post_type: PostType,
        category: Category,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            intent_id: intent_id.into(),
            owner_id: owner_id.into(),
            owner_name: None,
            post_type,
            category,
            raw_text: raw_text.into(),
            params: None,
            embedding: None,
            location_name: None,
            location: None,
            is_active: true,
            created_at: String::new(),
            expires_at: None,
        }
    }

    pub fn with_params(mut self, params: ParamSet) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    /// Active and not past its expiry. An unparseable expiry counts as live.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match self.expires_at.as_deref().and_then(parse_timestamp) {
            Some(expiry) => expiry > now,
            None => true,
        }
    }

    /// Display name of the owner.
    pub fn display_name(&self) -> &str {
        self.owner_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown")
    }
}

/// Parse an ISO 8601 timestamp. Naive timestamps are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Which strategy of the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Embeddings, parameters, price and location
    Advanced,
    /// Text, feature vectors, metro location, intent and time
    MlFeature,
    /// Similarity and location only
    Basic,
}

impl StrategyKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Advanced => "advanced",
            Self::MlFeature => "ml_feature",
            Self::Basic => "basic",
        }
    }
}

/// Per-component scores of a match, one variant per strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ScoreBreakdown {
    Advanced {
        semantic: f32,
        location: f32,
        parameters: f32,
        price: f32,
    },
    MlFeature {
        text: f32,
        feature: f32,
        location: f32,
        intent: f32,
        temporal: f32,
    },
    Basic {
        similarity: f32,
        location: f32,
    },
}

impl ScoreBreakdown {
    pub fn strategy(&self) -> StrategyKind {
        match self {
            Self::Advanced { .. } => StrategyKind::Advanced,
            Self::MlFeature { .. } => StrategyKind::MlFeature,
            Self::Basic { .. } => StrategyKind::Basic,
        }
    }

    /// Named component values in formula order.
    pub fn components(&self) -> Vec<(&'static str, f32)> {
        match *self {
            Self::Advanced {
                semantic,
                location,
                parameters,
                price,
            } => vec![
                ("semantic", semantic),
                ("location", location),
                ("parameters", parameters),
                ("price", price),
            ],
            Self::MlFeature {
                text,
                feature,
                location,
                intent,
                temporal,
            } => vec![
                ("text", text),
                ("feature", feature),
                ("location", location),
                ("intent", intent),
                ("temporal", temporal),
            ],
            Self::Basic {
                similarity,
                location,
            } => vec![("similarity", similarity), ("location", location)],
        }
    }
}

/// Categorical quality label derived from a combined score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl MatchQuality {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            Self::Excellent
        } else if score >= 0.65 {
            Self::Good
        } else if score >= 0.5 {
            Self::Fair
        } else if score >= 0.3 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::VeryPoor => "very_poor",
        }
    }
}

/// A ranked candidate returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Candidate intent identifier
    pub intent_id: String,

    pub owner_id: String,

    /// Candidate owner display name
    pub owner_name: String,

    #[serde(default)]
    pub location_name: String,

    pub category: Category,

    pub post_type: PostType,

    pub raw_text: String,

    /// Per-component scores
    pub scores: ScoreBreakdown,

    /// Weighted composite score in [0, 1]
    pub score: f32,

    /// Consistency-adjusted confidence (ML-feature strategy only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Quality label (ML-feature strategy only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<MatchQuality>,

    #[serde(default)]
    pub created_at: String,
}

impl MatchResult {
    /// Build a result for a scored candidate.
    pub fn new(candidate: &Intent, scores: ScoreBreakdown, score: f32) -> Self {
        Self {
            intent_id: candidate.intent_id.clone(),
            owner_id: candidate.owner_id.clone(),
            owner_name: candidate.display_name().to_string(),
            location_name: candidate.location_name.clone().unwrap_or_default(),
            category: candidate.category,
            post_type: candidate.post_type,
            raw_text: candidate.raw_text.clone(),
            scores,
            score,
            confidence: None,
            quality: None,
            created_at: candidate.created_at.clone(),
        }
    }

    pub fn strategy(&self) -> StrategyKind {
        self.scores.strategy()
    }
}
