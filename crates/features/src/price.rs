//! Price parsing and tolerance scoring.

use std::sync::LazyLock;

use intentmatch_model::ParamSet;
use regex::Regex;

use crate::NEUTRAL_SCORE;

/// Fraction of the query price inside which prices count as matching.
pub const TOLERANCE_RATIO: f64 = 0.1;

/// Fraction of the query price over which the outer decay reaches zero.
const OUTER_DECAY_RATIO: f64 = 0.5;

#[allow(clippy::expect_used)]
static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[₹$£€,]").expect("valid regex"));

#[allow(clippy::expect_used)]
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)(?:\s*(lakhs?|lacs?|k|thousand)\b)?").expect("valid regex")
});

/// Parse a free-form price ("₹45,000", "45k", "1.2 lakh") into a number.
///
/// Returns `None` when no positive amount can be found.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = CURRENCY_RE.replace_all(text, "");
    let caps = AMOUNT_RE.captures(&cleaned)?;
    let amount: f64 = caps[1].parse().ok()?;

    let multiplier = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
        Some(unit) if unit.starts_with("lakh") || unit.starts_with("lac") => 100_000.0,
        Some(_) => 1_000.0,
        None => 1.0,
    };

    let value = amount * multiplier;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Mean of the parseable prices in a list.
pub fn mean_price(prices: &[String]) -> Option<f64> {
    let values: Vec<f64> = prices.iter().filter_map(|p| parse_price(p)).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Compatibility of a candidate price with the query price.
///
/// Linear decay to zero across the tolerance band, then a slower decay
/// floored at zero. Neutral 0.5 when either price is missing or unparseable.
pub fn price_tolerance(query: Option<&str>, candidate: Option<&str>) -> f32 {
    let (Some(q), Some(c)) = (query.and_then(parse_price), candidate.and_then(parse_price)) else {
        return NEUTRAL_SCORE;
    };

    let diff = (q - c).abs();
    let tolerance = q * TOLERANCE_RATIO;

    let score = if diff <= tolerance {
        1.0 - diff / tolerance
    } else {
        (1.0 - diff / (q * OUTER_DECAY_RATIO)).max(0.0)
    };
    score as f32
}

/// Price tolerance of two parameter sets (price, else budget).
pub fn price_score(query: &ParamSet, candidate: &ParamSet) -> f32 {
    price_tolerance(query.price_or_budget(), candidate.price_or_budget())
}
