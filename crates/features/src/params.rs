//! Structured parameter overlap and intent compatibility.

use std::collections::HashSet;

use intentmatch_model::ParamSet;

use crate::price::mean_price;
use crate::{jaccard, NEUTRAL_SCORE};

/// Attributes compared by `parameter_overlap` and their weights.
pub const ATTRIBUTE_WEIGHTS: [(&str, f32); 6] = [
    ("category", 0.30),
    ("sub_category", 0.20),
    ("brand", 0.20),
    ("model", 0.15),
    ("year", 0.10),
    ("fuel_type", 0.05),
];

/// Share of the weight awarded for a year within one of the other.
const YEAR_TOLERANCE_CREDIT: f32 = 0.8;

/// Share of the weight awarded for a substring match.
const PARTIAL_CREDIT: f32 = 0.6;

fn attribute<'a>(params: &'a ParamSet, name: &str) -> Option<&'a str> {
    let value = match name {
        "category" => params.category.as_deref(),
        "sub_category" => params.sub_category.as_deref(),
        "brand" => params.brand.as_deref(),
        "model" => params.model.as_deref(),
        "year" => params.year.as_deref(),
        "fuel_type" => params.fuel_type.as_deref(),
        _ => None,
    };
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn years_within_one(a: &str, b: &str) -> bool {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => (a - b).abs() <= 1,
        _ => false,
    }
}

/// Weighted overlap of the structured attributes present on both sides.
///
/// Returns 0.5 when no attribute is comparable.
pub fn parameter_overlap(query: &ParamSet, candidate: &ParamSet) -> f32 {
    let mut awarded = 0.0_f32;
    let mut considered = 0.0_f32;

    for (name, weight) in ATTRIBUTE_WEIGHTS {
        let (Some(q), Some(c)) = (attribute(query, name), attribute(candidate, name)) else {
            continue;
        };
        considered += weight;

        let (q, c) = (q.to_lowercase(), c.to_lowercase());
        if q == c {
            awarded += weight;
        } else if name == "year" {
            if years_within_one(&q, &c) {
                awarded += weight * YEAR_TOLERANCE_CREDIT;
            }
        } else if q.contains(&c) || c.contains(&q) {
            awarded += weight * PARTIAL_CREDIT;
        }
    }

    if considered > 0.0 {
        (awarded / considered).clamp(0.0, 1.0)
    } else {
        NEUTRAL_SCORE
    }
}

/// Jaccard overlap of two keyword lists; 0.5 when both are empty.
pub fn keyword_overlap(query: &[String], candidate: &[String]) -> f32 {
    let q: HashSet<String> = query.iter().map(|k| k.to_lowercase()).collect();
    let c: HashSet<String> = candidate.iter().map(|k| k.to_lowercase()).collect();
    if q.is_empty() && c.is_empty() {
        return NEUTRAL_SCORE;
    }
    jaccard(&q, &c)
}

/// Closeness of the average mentioned prices; 0.5 when either side has none.
fn price_list_compatibility(query: &[String], candidate: &[String]) -> f32 {
    match (mean_price(query), mean_price(candidate)) {
        (Some(q), Some(c)) => {
            let diff = (q - c).abs() / q.max(c);
            (1.0 - diff).max(0.0) as f32
        }
        _ => NEUTRAL_SCORE,
    }
}

/// Keyword and price-mention compatibility of two intents.
pub fn intent_compatibility(query: &ParamSet, candidate: &ParamSet) -> f32 {
    let keywords = keyword_overlap(&query.keywords, &candidate.keywords);
    let prices = price_list_compatibility(&query.prices, &candidate.prices);
    keywords * 0.7 + prices * 0.3
}
