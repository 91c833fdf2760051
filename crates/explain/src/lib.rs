//! Explanation generation for intent matches.
//!
//! Converts score breakdowns into human-readable explanations and composes
//! the notification digest handed to downstream sinks.

use chrono::{DateTime, Utc};
use intentmatch_model::{parse_timestamp, Intent, MatchResult, StrategyKind};
use serde::{Deserialize, Serialize};

/// Default minimum score for a result to be notified.
pub const DEFAULT_NOTIFY_THRESHOLD: f32 = 0.75;

/// A structured explanation of one score component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Component name as it appears in the breakdown
    pub component: String,

    /// Short summary (1 line)
    pub summary: String,

    /// Detailed explanation (1-2 sentences)
    pub detail: String,

    /// Component value (0.0 - 1.0)
    pub strength: f32,
}

fn level(value: f32) -> &'static str {
    if value >= 0.8 {
        "strong"
    } else if value >= 0.5 {
        "moderate"
    } else {
        "weak"
    }
}

fn percent(value: f32) -> u32 {
    (value.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Generate explanations for every component of a result.
pub fn explain_match(result: &MatchResult, query_text: &str) -> Vec<Explanation> {
    result
        .scores
        .components()
        .into_iter()
        .map(|(name, value)| explain_component(name, value, query_text, result))
        .collect()
}

/// Generate the explanation for a single component.
pub fn explain_component(
    component: &str,
    value: f32,
    query_text: &str,
    result: &MatchResult,
) -> Explanation {
    let strength = level(value);
    let (summary, detail) = match component {
        "semantic" | "similarity" => (
            format!("{} semantic similarity", capitalize(strength)),
            format!(
                "'{}' and '{}' are {}% similar in meaning.",
                query_text,
                result.raw_text,
                percent(value)
            ),
        ),
        "text" => (
            format!("{} wording overlap", capitalize(strength)),
            format!(
                "The posts share {} vocabulary ({}% term similarity).",
                strength,
                percent(value)
            ),
        ),
        "location" => (
            format!("{} location fit", capitalize(strength)),
            if result.location_name.is_empty() {
                "The candidate has no location, so proximity is neutral.".to_string()
            } else {
                format!(
                    "Posted from {} ({}% proximity).",
                    result.location_name,
                    percent(value)
                )
            },
        ),
        "parameters" => (
            format!("{} attribute overlap", capitalize(strength)),
            format!(
                "Category, brand, model and year agree at {}%.",
                percent(value)
            ),
        ),
        "price" => (
            format!("{} price fit", capitalize(strength)),
            format!("Asking price and budget are {}% compatible.", percent(value)),
        ),
        "feature" => (
            format!("{} profile similarity", capitalize(strength)),
            format!("Post shape and profile features are {}% alike.", percent(value)),
        ),
        "intent" => (
            format!("{} intent compatibility", capitalize(strength)),
            format!("Keywords and mentioned prices line up at {}%.", percent(value)),
        ),
        "temporal" => (
            format!("{} timing fit", capitalize(strength)),
            format!(
                "Freshness and urgency of both posts combine to {}%.",
                percent(value)
            ),
        ),
        other => (
            format!("{} {}", capitalize(strength), other),
            format!("{} scored {}%.", other, percent(value)),
        ),
    };

    Explanation {
        component: component.to_string(),
        summary,
        detail,
        strength: value,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One-line verdict for a result.
pub fn summarize_match(result: &MatchResult) -> String {
    let level = if result.score >= 0.8 {
        "STRONG MATCH"
    } else if result.score >= 0.5 {
        "GOOD MATCH"
    } else {
        "WEAK MATCH"
    };

    let mut strongest: Vec<(&str, f32)> = result.scores.components();
    strongest.sort_by(|a, b| b.1.total_cmp(&a.1));
    let top: Vec<&str> = strongest.iter().take(2).map(|(name, _)| *name).collect();

    let strategy = match result.strategy() {
        StrategyKind::Advanced => "advanced",
        StrategyKind::MlFeature => "ml",
        StrategyKind::Basic => "basic",
    };

    format!(
        "{} ({}%, {}): strongest on {}",
        level,
        percent(result.score),
        strategy,
        top.join(", ")
    )
}

/// Notification payload for new high-scoring matches of one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDigest {
    pub intent_id: String,
    pub owner_id: String,
    pub title: String,
    pub body: String,
    pub best_match_id: String,
    /// Notified results, best first
    pub matches: Vec<MatchResult>,
}

impl MatchDigest {
    /// Build a digest from a ranked list.
    ///
    /// Keeps results scoring at least `threshold` and, when `last_check` is
    /// given, created strictly after it (an unparseable creation time counts
    /// as not new). Returns `None` when nothing qualifies.
    pub fn build(
        query: &Intent,
        results: &[MatchResult],
        threshold: f32,
        last_check: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let matches: Vec<MatchResult> = results
            .iter()
            .filter(|r| r.score >= threshold)
            .filter(|r| match last_check {
                Some(since) => parse_timestamp(&r.created_at).is_some_and(|t| t > since),
                None => true,
            })
            .cloned()
            .collect();

        let best = matches
            .iter()
            .reduce(|best, r| if r.score > best.score { r } else { best })?;

        let count = matches.len();
        let title = format!(
            "{} New Match{} Found!",
            count,
            if count > 1 { "es" } else { "" }
        );
        let body = format!(
            "Your search '{}' has new matches. Best match: {} ({}% match)",
            query.raw_text,
            best.owner_name,
            percent(best.score)
        );

        Some(Self {
            intent_id: query.intent_id.clone(),
            owner_id: query.owner_id.clone(),
            title,
            body,
            best_match_id: best.intent_id.clone(),
            matches,
        })
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}
