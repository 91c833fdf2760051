//! Location proximity scoring.
//!
//! Coordinates are preferred when both intents carry a `POINT(lng lat)`
//! geometry; otherwise location names are compared.

use std::sync::LazyLock;

use intentmatch_model::Intent;
use regex::Regex;

use crate::NEUTRAL_SCORE;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance assumed when a geometry cannot be parsed.
pub const DEFAULT_DISTANCE_KM: f64 = 50.0;

/// Metro regions and the place names that belong to them.
const METRO_GROUPS: &[(&str, &[&str])] = &[
    (
        "bangalore_metro",
        &["bangalore", "whitefield", "electronic city", "koramangala"],
    ),
    ("mumbai_metro", &["mumbai", "pune", "thane", "navi mumbai"]),
    ("delhi_ncr", &["delhi", "gurgaon", "noida", "faridabad"]),
    (
        "hyderabad_metro",
        &["hyderabad", "secunderabad", "cyberabad"],
    ),
    ("chennai_metro", &["chennai", "tambaram", "velachery"]),
];

#[allow(clippy::expect_used)]
static POINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)POINT\s*\(([^)]+)\)").expect("valid regex"));

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Parse `POINT(lng lat)` geometry text.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = POINT_RE.captures(text)?;
        let mut parts = caps[1].split_whitespace().map(str::parse::<f64>);
        let lng = parts.next()?.ok()?;
        let lat = parts.next()?.ok()?;
        if parts.next().is_some() || !lng.is_finite() || !lat.is_finite() {
            return None;
        }
        Some(Self { lng, lat })
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

/// Distance between two geometry texts, `DEFAULT_DISTANCE_KM` when malformed.
pub fn distance_km(a: &str, b: &str) -> f64 {
    match (GeoPoint::parse(a), GeoPoint::parse(b)) {
        (Some(a), Some(b)) => a.distance_km(&b),
        _ => {
            tracing::debug!(a, b, "Unparseable geometry, using default distance");
            DEFAULT_DISTANCE_KM
        }
    }
}

/// Map a distance onto the proximity bands.
pub fn distance_score(km: f64) -> f32 {
    if km <= 10.0 {
        1.0
    } else if km <= 20.0 {
        0.8
    } else if km <= 50.0 {
        0.5
    } else {
        0.2
    }
}

fn non_blank(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|s| !s.is_empty())
}

/// City part of a location name: text after the last comma, or the whole name.
pub fn extract_city(name: &str) -> &str {
    match name.rsplit_once(',') {
        Some((_, city)) => city.trim(),
        None => name.trim(),
    }
}

/// Compare two location names.
pub fn name_score(a: Option<&str>, b: Option<&str>) -> f32 {
    let (Some(a), Some(b)) = (non_blank(a), non_blank(b)) else {
        return NEUTRAL_SCORE;
    };
    let (a_lower, b_lower) = (a.to_lowercase(), b.to_lowercase());

    if a_lower == b_lower {
        return 1.0;
    }
    if a_lower.contains(&b_lower) || b_lower.contains(&a_lower) {
        return 0.8;
    }

    let (city_a, city_b) = (extract_city(a), extract_city(b));
    if !city_a.is_empty() && city_a.to_lowercase() == city_b.to_lowercase() {
        return 0.6;
    }

    0.2
}

/// Location score of a candidate relative to the query intent.
pub fn location_score(query: &Intent, candidate: &Intent) -> f32 {
    match (non_blank(query.location.as_deref()), non_blank(candidate.location.as_deref())) {
        (Some(a), Some(b)) => distance_score(distance_km(a, b)),
        _ => name_score(
            query.location_name.as_deref(),
            candidate.location_name.as_deref(),
        ),
    }
}

/// Metro region a location name falls into.
pub fn metro_group(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    METRO_GROUPS
        .iter()
        .find(|(_, places)| places.iter().any(|p| lower.contains(p)))
        .map(|(group, _)| *group)
}

/// Name comparison that treats places in the same metro region as close.
pub fn metro_score(query: Option<&str>, candidate: Option<&str>) -> f32 {
    let (Some(query), Some(candidate)) = (non_blank(query), non_blank(candidate)) else {
        return NEUTRAL_SCORE;
    };

    if query.to_lowercase() == candidate.to_lowercase() {
        return 1.0;
    }

    match metro_group(query) {
        Some(group) if metro_group(candidate) == Some(group) => 0.8,
        Some(_) => 0.3,
        None => 0.4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentmatch_model::{Category, PostType};

    #[test]
    fn test_parse_point() {
        let p = GeoPoint::parse("POINT(77.7499 12.9698)").unwrap();
        assert_eq!(p, GeoPoint::new(77.7499, 12.9698));
        assert!(GeoPoint::parse("SRID=4326;POINT(77.1 12.9)").is_some());
        assert!(GeoPoint::parse("POINT(77.1)").is_none());
        assert!(GeoPoint::parse("POINT(a b)").is_none());
        assert!(GeoPoint::parse("garbage").is_none());
    }

    #[test]
    fn test_haversine_known_distance() {
        // Whitefield to Koramangala is roughly 14 km.
        let d = distance_km("POINT(77.7499 12.9698)", "POINT(77.6245 12.9352)");
        assert!(d > 12.0 && d < 16.0, "distance was {d}");
        assert_eq!(distance_km("POINT(77.7 12.9)", "POINT(77.7 12.9)"), 0.0);
    }

    #[test]
    fn test_malformed_geometry_uses_default_distance() {
        assert_eq!(distance_km("POINT(x y)", "POINT(77.7 12.9)"), DEFAULT_DISTANCE_KM);
        assert_eq!(distance_score(distance_km("", "")), 0.5);
    }

    #[test]
    fn test_distance_bands() {
        assert_eq!(distance_score(0.0), 1.0);
        assert_eq!(distance_score(10.0), 1.0);
        assert_eq!(distance_score(10.01), 0.8);
        assert_eq!(distance_score(20.0), 0.8);
        assert_eq!(distance_score(20.01), 0.5);
        assert_eq!(distance_score(50.0), 0.5);
        assert_eq!(distance_score(50.01), 0.2);
        assert_eq!(distance_score(5000.0), 0.2);
    }

    #[test]
    fn test_distance_score_monotonic() {
        let mut previous = f32::INFINITY;
        for km in (0..200).map(|k| k as f64 * 0.5) {
            let score = distance_score(km);
            assert!(score <= previous);
            previous = score;
        }
    }

    #[test]
    fn test_name_score_modes() {
        assert_eq!(name_score(Some("Whitefield"), Some("whitefield")), 1.0);
        assert_eq!(name_score(Some("Whitefield"), Some("Whitefield, Bangalore")), 0.8);
        assert_eq!(
            name_score(Some("Koramangala, Bangalore"), Some("Indiranagar, Bangalore")),
            0.6
        );
        assert_eq!(name_score(Some("Pune"), Some("Chennai")), 0.2);
        assert_eq!(name_score(None, Some("Chennai")), 0.5);
        assert_eq!(name_score(Some("  "), Some("Chennai")), 0.5);
    }

    #[test]
    fn test_location_score_prefers_coordinates() {
        let mut query = Intent::new("q", "u1", PostType::Demand, Category::Product, "x")
            .with_location_name("Pune");
        let mut candidate = Intent::new("c", "u2", PostType::Supply, Category::Product, "y")
            .with_location_name("Chennai");
        assert_eq!(location_score(&query, &candidate), 0.2);

        query.location = Some("POINT(77.7499 12.9698)".into());
        candidate.location = Some("POINT(77.7500 12.9700)".into());
        assert_eq!(location_score(&query, &candidate), 1.0);
    }

    #[test]
    fn test_metro_score() {
        assert_eq!(metro_group("Whitefield"), Some("bangalore_metro"));
        assert_eq!(metro_score(Some("Whitefield"), Some("whitefield")), 1.0);
        assert_eq!(metro_score(Some("Whitefield"), Some("Koramangala")), 0.8);
        assert_eq!(metro_score(Some("Noida"), Some("Gurgaon")), 0.8);
        assert_eq!(metro_score(Some("Whitefield"), Some("Thane")), 0.3);
        assert_eq!(metro_score(Some("Goa"), Some("Thane")), 0.4);
        assert_eq!(metro_score(None, Some("Thane")), 0.5);
    }
}
