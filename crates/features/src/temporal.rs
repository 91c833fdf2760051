//! Recency, mutual freshness and urgency alignment.

use chrono::{DateTime, Utc};
use intentmatch_model::{parse_timestamp, Intent};

/// Words that mark an intent as urgent.
pub const URGENCY_KEYWORDS: [&str; 6] = ["urgent", "asap", "immediate", "quickly", "fast", "emergency"];

/// Score assigned to every candidate when a timestamp cannot be parsed.
pub const TEMPORAL_FALLBACK: f32 = 0.6;

/// Days over which recency decays to zero.
const RECENCY_WINDOW_DAYS: f32 = 30.0;

/// Days over which mutual closeness decays to zero.
const MUTUAL_WINDOW_DAYS: f32 = 7.0;

pub fn is_urgent(text: &str) -> bool {
    let lower = text.to_lowercase();
    URGENCY_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn urgency_alignment(query_urgent: bool, candidate_urgent: bool) -> f32 {
    match (query_urgent, candidate_urgent) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.7,
        (false, false) => 0.5,
    }
}

/// 1.0 when both texts are urgent, 0.7 when one is, 0.5 when neither is.
pub fn urgency_score(query: &str, candidate: &str) -> f32 {
    urgency_alignment(is_urgent(query), is_urgent(candidate))
}

fn temporal_score(
    query_created: DateTime<Utc>,
    query_urgent: bool,
    candidate: &Intent,
    candidate_created: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f32 {
    let age_days = (now - candidate_created).num_days() as f32;
    let recency = (1.0 - age_days / RECENCY_WINDOW_DAYS).clamp(0.0, 1.0);

    let gap_days = (query_created - candidate_created).num_days().abs() as f32;
    let mutual = (1.0 - gap_days / MUTUAL_WINDOW_DAYS).max(0.0);

    let urgency = urgency_alignment(query_urgent, is_urgent(&candidate.raw_text));

    0.4 * recency + 0.3 * mutual + 0.3 * urgency
}

/// Temporal compatibility of each candidate with the query, evaluated at `now`.
///
/// If any creation timestamp in the batch cannot be parsed, every candidate
/// gets `TEMPORAL_FALLBACK`.
pub fn temporal_scores(query: &Intent, candidates: &[Intent], now: DateTime<Utc>) -> Vec<f32> {
    let parsed: Option<(DateTime<Utc>, Vec<DateTime<Utc>>)> = parse_timestamp(&query.created_at)
        .and_then(|q| {
            candidates
                .iter()
                .map(|c| parse_timestamp(&c.created_at))
                .collect::<Option<Vec<_>>>()
                .map(|cs| (q, cs))
        });

    let Some((query_created, created)) = parsed else {
        tracing::warn!(
            intent_id = %query.intent_id,
            candidates = candidates.len(),
            "Unparseable timestamp, using fallback temporal score"
        );
        return vec![TEMPORAL_FALLBACK; candidates.len()];
    };

    let query_urgent = is_urgent(&query.raw_text);
    candidates
        .iter()
        .zip(created)
        .map(|(candidate, candidate_created)| {
            temporal_score(query_created, query_urgent, candidate, candidate_created, now)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentmatch_model::{Category, PostType};

    fn intent(id: &str, text: &str, created_at: &str) -> Intent {
        Intent::new(id, "u", PostType::Supply, Category::Product, text).with_created_at(created_at)
    }

    fn now() -> DateTime<Utc> {
        parse_timestamp("2024-06-30T12:00:00Z").unwrap()
    }

    #[test]
    fn test_urgency_levels() {
        assert_eq!(urgency_score("Need plumber urgently", "Available ASAP"), 1.0);
        assert_eq!(urgency_score("Need plumber urgently", "Plumber available"), 0.7);
        assert_eq!(urgency_score("Need plumber", "Plumber available"), 0.5);
    }

    #[test]
    fn test_fresh_same_day_pair() {
        let query = intent("q", "Need a bike", "2024-06-30T10:00:00Z");
        let candidates = vec![intent("c", "Selling bike", "2024-06-30T09:00:00Z")];
        let scores = temporal_scores(&query, &candidates, now());
        // recency 1.0, mutual 1.0, urgency 0.5
        assert!((scores[0] - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_old_candidate_decays() {
        let query = intent("q", "Need a bike", "2024-06-30T10:00:00Z");
        let candidates = vec![
            intent("a", "Selling bike", "2024-06-27T10:00:00Z"),
            intent("b", "Selling bike", "2024-04-01T10:00:00Z"),
        ];
        let scores = temporal_scores(&query, &candidates, now());
        assert!(scores[0] > scores[1]);
        // Long past both windows: only urgency remains.
        assert!((scores[1] - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_bad_timestamp_falls_back_for_whole_batch() {
        let query = intent("q", "Need a bike", "2024-06-30T10:00:00Z");
        let candidates = vec![
            intent("a", "Selling bike", "2024-06-30T10:00:00Z"),
            intent("b", "Selling bike", "last tuesday"),
        ];
        assert_eq!(temporal_scores(&query, &candidates, now()), vec![0.6, 0.6]);
    }

    #[test]
    fn test_scores_bounded() {
        let query = intent("q", "urgent", "2024-06-30T10:00:00Z");
        let candidates = vec![intent("future", "asap", "2024-07-15T10:00:00Z")];
        let scores = temporal_scores(&query, &candidates, now());
        assert!((0.0..=1.0).contains(&scores[0]));
    }
}
