//! Parameter normalization and fixed-length feature vectors.

use intentmatch_model::{Category, Intent, ParamSet};

/// Length of the feature vector.
pub const FEATURE_DIM: usize = 20;

/// Number of externally supplied profile feature slots.
pub const PROFILE_SLOTS: usize = 5;

/// Value used for a missing profile feature.
const MISSING_FEATURE: f32 = 0.5;

/// Verb returned when no keyword matches.
pub const DEFAULT_VERB: &str = "looking";

/// Intent verbs and the phrases that signal them, checked in order.
const VERB_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "buy",
        &["buy", "buying", "purchase", "looking for", "want to buy", "need"],
    ),
    ("sell", &["sell", "selling", "sale", "for sale", "offering"]),
    ("rent_out", &["rent out", "renting out", "available for rent"]),
    ("rent", &["rent", "renting", "lease", "for rent"]),
    ("looking", &["looking", "searching", "seeking", "find"]),
    ("offering", &["offering", "providing", "available"]),
];

/// Detect the intent verb of a raw text from keyword phrases.
pub fn detect_intent_verb(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    VERB_KEYWORDS
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(verb, _)| *verb)
        .unwrap_or(DEFAULT_VERB)
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Normalized parameter set of an intent.
///
/// Starts from the structured parameters and fills the verb, category and
/// location from the raw intent when the interpreter left them out.
pub fn extract_params(intent: &Intent) -> ParamSet {
    let mut params = intent.params.clone().unwrap_or_default();

    params.intent = Some(match params.intent.as_deref().map(str::trim) {
        Some(verb) if !verb.is_empty() => verb.to_lowercase(),
        _ => detect_intent_verb(&intent.raw_text).to_string(),
    });

    if is_blank(&params.category) {
        params.category = Some(intent.category.as_str().to_string());
    }
    if is_blank(&params.location) {
        params.location = intent.location_name.clone().filter(|s| !s.trim().is_empty());
    }

    params
}

/// Fixed-length numeric features of an intent.
///
/// Layout: word count, char count, `?` count, `!` count, keyword count,
/// location count, price count, five profile features, one-hot category,
/// zero padding.
pub fn feature_vector(intent: &Intent) -> [f32; FEATURE_DIM] {
    let mut features = [0.0_f32; FEATURE_DIM];
    let text = intent.raw_text.as_str();
    let empty = ParamSet::default();
    let params = intent.params.as_ref().unwrap_or(&empty);

    features[0] = text.split_whitespace().count() as f32;
    features[1] = text.chars().count() as f32;
    features[2] = text.matches('?').count() as f32;
    features[3] = text.matches('!').count() as f32;
    features[4] = params.keywords.len() as f32;
    features[5] = params.locations.len() as f32;
    features[6] = params.prices.len() as f32;

    for slot in 0..PROFILE_SLOTS {
        features[7 + slot] = params
            .profile_features
            .get(slot)
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(MISSING_FEATURE);
    }

    let offset = 7 + PROFILE_SLOTS;
    for (i, category) in Category::ALL.iter().enumerate() {
        features[offset + i] = if *category == intent.category { 1.0 } else { 0.0 };
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentmatch_model::PostType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_intent_verb() {
        assert_eq!(detect_intent_verb("Looking for iPhone 13"), "buy");
        assert_eq!(detect_intent_verb("Selling my old bike"), "sell");
        assert_eq!(detect_intent_verb("Flat available for rent"), "rent_out");
        assert_eq!(detect_intent_verb("Want to lease a car"), "rent");
        assert_eq!(detect_intent_verb("Seeking a tennis partner"), "looking");
        assert_eq!(detect_intent_verb("Hello there"), DEFAULT_VERB);
    }

    #[test]
    fn test_extract_params_fallbacks() {
        let intent = Intent::new(
            "i-1",
            "u-1",
            PostType::Demand,
            Category::Product,
            "Looking for a laptop",
        )
        .with_location_name("Koramangala, Bangalore");

        let params = extract_params(&intent);
        assert_eq!(params.intent.as_deref(), Some("buy"));
        assert_eq!(params.category.as_deref(), Some("product"));
        assert_eq!(params.location.as_deref(), Some("Koramangala, Bangalore"));
    }

    #[test]
    fn test_extract_params_keeps_structured_values() {
        let intent = Intent::new("i-1", "u-1", PostType::Supply, Category::Product, "Selling")
            .with_params(ParamSet {
                intent: Some("SELL".into()),
                category: Some("laptop".into()),
                brand: Some("HP".into()),
                ..Default::default()
            });

        let params = extract_params(&intent);
        assert_eq!(params.intent.as_deref(), Some("sell"));
        assert_eq!(params.category.as_deref(), Some("laptop"));
        assert_eq!(params.brand.as_deref(), Some("HP"));
    }

    #[test]
    fn test_feature_vector_layout() {
        let intent = Intent::new(
            "i-1",
            "u-1",
            PostType::Demand,
            Category::Service,
            "Need plumber? Urgent!",
        )
        .with_params(ParamSet {
            keywords: vec!["plumber".into(), "urgent".into()],
            profile_features: vec![0.9, 0.1],
            ..Default::default()
        });

        let features = feature_vector(&intent);
        assert_eq!(features[0], 3.0);
        assert_eq!(features[1], 21.0);
        assert_eq!(features[2], 1.0);
        assert_eq!(features[3], 1.0);
        assert_eq!(features[4], 2.0);
        assert_eq!(&features[7..12], &[0.9, 0.1, 0.5, 0.5, 0.5]);
        assert_eq!(&features[12..17], &[0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(&features[17..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_feature_vector_deterministic() {
        let intent = Intent::new("i", "u", PostType::Supply, Category::Travel, "Trip to Goa");
        assert_eq!(feature_vector(&intent), feature_vector(&intent));
    }
}
