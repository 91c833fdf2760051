//! Free text → structured parameters.

use std::collections::HashSet;
use std::sync::LazyLock;

use intentmatch_features::detect_intent_verb;
use intentmatch_model::ParamSet;
use regex::Regex;

/// Upstream parser producing a structured parameter set from raw text.
pub trait QueryInterpreter: Send + Sync {
    fn interpret(&self, text: &str, location_hint: Option<&str>) -> ParamSet;
}

/// Maximum number of keywords kept per text.
const MAX_KEYWORDS: usize = 10;

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("laptop", &["laptop", "notebook", "macbook"]),
    ("car", &["car", "vehicle", "sedan", "suv", "hatchback"]),
    ("bike", &["bike", "motorcycle", "scooter"]),
    ("phone", &["phone", "mobile", "smartphone", "iphone"]),
    ("tutor", &["tutor", "teacher", "coaching", "class"]),
];

const FUEL_TYPES: [&str; 5] = ["petrol", "diesel", "cng", "electric", "hybrid"];

const BRANDS: &[&str] = &[
    "hp", "dell", "lenovo", "asus", "apple", "samsung", "honda", "toyota", "maruti", "hyundai",
];

const KEYWORD_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with", "i", "you", "this", "my", "me",
];

#[allow(clippy::expect_used)]
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:₹\s*\d[\d,]*(?:\.\d+)?(?:\s*(?:lakhs?|lacs?|k|thousand)\b)?|\bunder\s*\d[\d,]*(?:\.\d+)?(?:\s*(?:lakhs?|lacs?|k|thousand)\b)?|\b\d[\d,]*(?:\.\d+)?\s*(?:lakhs?|lacs?|k|thousand)\b)",
    )
    .expect("valid regex")
});

#[allow(clippy::expect_used)]
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("valid regex"));

#[allow(clippy::expect_used)]
static AREA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(whitefield|koramangala|hsr layout|indiranagar|electronic city|marathahalli|jayanagar|btm layout|banashankari|rajajinagar)\b",
    )
    .expect("valid regex")
});

/// Keyword- and pattern-based interpreter.
#[derive(Debug, Default, Clone)]
pub struct RuleInterpreter;

impl RuleInterpreter {
    pub fn new() -> Self {
        Self
    }
}

fn first_match(lower: &str, table: &[(&'static str, &[&str])]) -> Option<String> {
    table
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(name, _)| name.to_string())
}

/// Lowercased, punctuation-stripped words longer than two characters.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()).to_string())
        .filter(|w| w.chars().count() > 2 && !KEYWORD_STOP_WORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .take(MAX_KEYWORDS)
        .collect()
}

impl QueryInterpreter for RuleInterpreter {
    fn interpret(&self, text: &str, location_hint: Option<&str>) -> ParamSet {
        let lower = text.to_lowercase();
        let words: HashSet<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let prices: Vec<String> = PRICE_RE
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .collect();

        let mut locations: Vec<String> = AREA_RE
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        let hint = location_hint.map(str::trim).filter(|s| !s.is_empty());
        if let Some(hint) = hint {
            if !locations.iter().any(|l| l.eq_ignore_ascii_case(hint)) {
                locations.push(hint.to_string());
            }
        }

        let params = ParamSet {
            intent: Some(detect_intent_verb(text).to_string()),
            category: first_match(&lower, CATEGORY_KEYWORDS),
            brand: BRANDS
                .iter()
                .find(|b| words.contains(**b))
                .map(|b| b.to_string()),
            year: YEAR_RE.captures(text).map(|c| c[1].to_string()),
            fuel_type: FUEL_TYPES
                .iter()
                .find(|f| lower.contains(**f))
                .map(|f| f.to_string()),
            budget: prices.first().cloned(),
            location: hint
                .map(str::to_string)
                .or_else(|| locations.first().cloned()),
            keywords: extract_keywords(text),
            locations,
            prices,
            ..Default::default()
        };

        tracing::debug!(
            intent = ?params.intent,
            category = ?params.category,
            budget = ?params.budget,
            "Interpreted query text"
        );
        params
    }
}
