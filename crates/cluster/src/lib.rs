//! Profile clustering.
//!
//! Groups user and business profiles so matching can be restricted to
//! similar populations. The pipeline is:
//! 1. Fixed 15-dimensional feature extraction per profile
//! 2. Column standardisation
//! 3. PCA (power iteration with deflation)
//! 4. Seeded k-means++ followed by Lloyd iterations
//!
//! Small or unusable inputs collapse into a single `cluster_0`.

mod kmeans;
mod pca;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Length of the clustering feature vector.
pub const CLUSTER_FEATURE_DIM: usize = 15;

const MAJOR_CITIES: [&str; 5] = ["bangalore", "mumbai", "delhi", "hyderabad", "chennai"];

const PROFILE_FEATURES: usize = 5;

const DEFAULT_SCORE: f64 = 0.5;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Non-finite feature for profile {0}")]
    NonFinite(String),

    #[error("Cannot form {clusters} clusters from {profiles} profiles")]
    TooFewProfiles { clusters: usize, profiles: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    User,
    #[default]
    Business,
}

/// A user or business profile as stored upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    #[serde(alias = "user_id", alias = "business_id")]
    pub id: String,

    pub profile_type: ProfileType,

    /// Free-text city or address
    #[serde(alias = "location", deserialize_with = "city_text")]
    pub city: String,

    pub feature_vector: Option<Vec<f64>>,

    // Users
    pub primary_intent: Option<String>,
    pub tech_savviness: Option<f64>,
    pub price_sensitivity: Option<f64>,

    // Businesses
    pub category: Option<String>,
    #[serde(alias = "service_quality_score")]
    pub service_quality: Option<f64>,
    pub price_competitiveness: Option<f64>,
}

/// Location as stored upstream: plain text or a place object.
#[derive(Deserialize)]
#[serde(untagged)]
enum LocationField {
    Text(String),
    Place {
        #[serde(default)]
        city: String,
    },
}

fn city_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<LocationField>::deserialize(deserializer)? {
        Some(LocationField::Text(text)) => text,
        Some(LocationField::Place { city }) => city,
        None => String::new(),
    })
}

/// Clustering policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Below this many profiles everything lands in one cluster
    pub min_profiles: usize,
    /// One cluster per this many profiles
    pub profiles_per_cluster: usize,
    pub max_clusters: usize,
    pub max_components: usize,
    pub max_iterations: usize,
    /// Squared centroid shift under which k-means stops
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_profiles: 10,
            profiles_per_cluster: 10,
            max_clusters: 8,
            max_components: 10,
            max_iterations: 300,
            tolerance: 1e-8,
            seed: 42,
        }
    }
}

fn primary_intent_code(intent: Option<&str>) -> f64 {
    match intent.unwrap_or("inquiry") {
        "purchase" => 1.0,
        "support" => 0.8,
        "inquiry" => 0.6,
        "service" => 0.4,
        "partnership" => 0.2,
        _ => DEFAULT_SCORE,
    }
}

fn business_category_code(category: Option<&str>) -> f64 {
    match category.unwrap_or("service") {
        "retail" => 1.0,
        "fintech" => 0.8,
        "service" => 0.6,
        "technology" => 0.4,
        "healthcare" => 0.2,
        _ => DEFAULT_SCORE,
    }
}

/// Fixed-length clustering features of a profile.
///
/// Layout: user flag, five major-city flags, five profile features (0.5 when
/// absent), intent or category code, two type-specific scores, zero padding.
pub fn clustering_features(profile: &ProfileRecord) -> [f64; CLUSTER_FEATURE_DIM] {
    let mut features = [0.0; CLUSTER_FEATURE_DIM];
    let is_user = profile.profile_type == ProfileType::User;
    features[0] = if is_user { 1.0 } else { 0.0 };

    let city = profile.city.to_lowercase();
    for (slot, major) in features[1..6].iter_mut().zip(MAJOR_CITIES) {
        *slot = if city.contains(major) { 1.0 } else { 0.0 };
    }

    let supplied = profile.feature_vector.as_deref().unwrap_or_default();
    for (i, slot) in features[6..6 + PROFILE_FEATURES].iter_mut().enumerate() {
        *slot = supplied.get(i).copied().unwrap_or(DEFAULT_SCORE);
    }

    let (code, first, second) = if is_user {
        (
            primary_intent_code(profile.primary_intent.as_deref()),
            profile.tech_savviness,
            profile.price_sensitivity,
        )
    } else {
        (
            business_category_code(profile.category.as_deref()),
            profile.service_quality,
            profile.price_competitiveness,
        )
    };
    features[11] = code;
    features[12] = first.unwrap_or(DEFAULT_SCORE);
    features[13] = second.unwrap_or(DEFAULT_SCORE);

    features
}

fn single_cluster(profiles: &[ProfileRecord]) -> BTreeMap<String, Vec<String>> {
    let ids = profiles.iter().map(|p| p.id.clone()).collect();
    BTreeMap::from([("cluster_0".to_string(), ids)])
}

/// Cluster profiles into `cluster_<label>` groups of profile ids.
///
/// Never fails: small inputs and clustering errors yield a single
/// `cluster_0` holding every profile.
pub fn cluster_profiles(
    profiles: &[ProfileRecord],
    config: &ClusterConfig,
) -> BTreeMap<String, Vec<String>> {
    if profiles.len() < config.min_profiles {
        return single_cluster(profiles);
    }

    match try_cluster(profiles, config) {
        Ok(clusters) => {
            tracing::debug!(
                profiles = profiles.len(),
                clusters = clusters.len(),
                "Created profile clusters"
            );
            clusters
        }
        Err(e) => {
            tracing::warn!(error = %e, profiles = profiles.len(), "Clustering failed, using one cluster");
            single_cluster(profiles)
        }
    }
}

/// Run the full pipeline, surfacing failures.
pub fn try_cluster(
    profiles: &[ProfileRecord],
    config: &ClusterConfig,
) -> Result<BTreeMap<String, Vec<String>>, ClusterError> {
    let mut rows = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let features = clustering_features(profile);
        if features.iter().any(|v| !v.is_finite()) {
            return Err(ClusterError::NonFinite(profile.id.clone()));
        }
        rows.push(features.to_vec());
    }

    let k = config
        .max_clusters
        .min(profiles.len() / config.profiles_per_cluster.max(1));
    if k == 0 || k > profiles.len() {
        return Err(ClusterError::TooFewProfiles {
            clusters: k,
            profiles: profiles.len(),
        });
    }

    pca::standardize(&mut rows);
    let components = config.max_components.min(CLUSTER_FEATURE_DIM);
    let projected = pca::project(&rows, components);
    let labels = kmeans::fit_predict(&projected, k, config);

    let mut clusters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (profile, label) in profiles.iter().zip(labels) {
        clusters
            .entry(format!("cluster_{}", label))
            .or_default()
            .push(profile.id.clone());
    }
    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user(id: &str, city: &str, intent: &str) -> ProfileRecord {
        ProfileRecord {
            id: id.to_string(),
            profile_type: ProfileType::User,
            city: city.to_string(),
            primary_intent: Some(intent.to_string()),
            tech_savviness: Some(0.9),
            price_sensitivity: Some(0.2),
            ..Default::default()
        }
    }

    fn business(id: &str, city: &str, category: &str) -> ProfileRecord {
        ProfileRecord {
            id: id.to_string(),
            profile_type: ProfileType::Business,
            city: city.to_string(),
            category: Some(category.to_string()),
            feature_vector: Some(vec![0.1, 0.9, 0.1, 0.9, 0.1]),
            ..Default::default()
        }
    }

    #[test]
    fn test_clustering_features_layout() {
        let features = clustering_features(&user("u1", "Koramangala, Bangalore", "purchase"));
        assert_eq!(
            features.to_vec(),
            vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5, 0.5, 0.5, 1.0, 0.9, 0.2, 0.0]
        );

        let features = clustering_features(&business("b1", "Mumbai", "fintech"));
        assert_eq!(features[0], 0.0);
        assert_eq!(features[2], 1.0);
        assert_eq!(&features[6..11], &[0.1, 0.9, 0.1, 0.9, 0.1]);
        assert_eq!(&features[11..14], &[0.8, 0.5, 0.5]);
    }

    #[test]
    fn test_unknown_codes_default() {
        let mut profile = user("u", "", "browsing");
        profile.feature_vector = Some(vec![0.3]);
        let features = clustering_features(&profile);
        assert_eq!(features[11], 0.5);
        assert_eq!(&features[6..11], &[0.3, 0.5, 0.5, 0.5, 0.5]);

        let features = clustering_features(&ProfileRecord::default());
        assert_eq!(features[11], 0.6);
    }

    #[test]
    fn test_deserialize_upstream_names() {
        let profile: ProfileRecord = serde_json::from_str(
            r#"{"user_id": "u9", "profile_type": "user", "location": "Chennai", "tech_savviness": 0.7}"#,
        )
        .unwrap();
        assert_eq!(profile.id, "u9");
        assert_eq!(profile.profile_type, ProfileType::User);
        assert_eq!(clustering_features(&profile)[5], 1.0);
    }

    #[test]
    fn test_deserialize_location_object() {
        let profiles: Vec<ProfileRecord> = serde_json::from_str(
            r#"[
                {"business_id": "b1", "location": {"city": "Mumbai", "lat": 19.07, "lng": 72.87}},
                {"business_id": "b2", "location": {"lat": 12.97, "lng": 77.59}},
                {"business_id": "b3", "location": null},
                {"business_id": "b4", "city": "Delhi"}
            ]"#,
        )
        .unwrap();

        let cities: Vec<&str> = profiles.iter().map(|p| p.city.as_str()).collect();
        assert_eq!(cities, vec!["Mumbai", "", "", "Delhi"]);
        assert_eq!(clustering_features(&profiles[0])[2], 1.0);
    }

    #[test]
    fn test_small_input_single_cluster() {
        let profiles: Vec<ProfileRecord> = (0..9)
            .map(|i| user(&format!("u{}", i), "Delhi", "support"))
            .collect();
        let clusters = cluster_profiles(&profiles, &ClusterConfig::default());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters["cluster_0"].len(), 9);
        assert_eq!(clusters["cluster_0"][0], "u0");
    }

    #[test]
    fn test_two_populations_separate() {
        let mut profiles: Vec<ProfileRecord> = (0..10)
            .map(|i| user(&format!("u{}", i), "Bangalore", "purchase"))
            .collect();
        profiles.extend((0..10).map(|i| business(&format!("b{}", i), "Mumbai", "retail")));

        let clusters = cluster_profiles(&profiles, &ClusterConfig::default());
        assert_eq!(clusters.len(), 2);

        let mut groups: Vec<Vec<String>> = clusters.into_values().collect();
        groups.sort();
        let businesses: Vec<String> = (0..10).map(|i| format!("b{}", i)).collect();
        let users: Vec<String> = (0..10).map(|i| format!("u{}", i)).collect();
        assert_eq!(groups, vec![businesses, users]);
    }

    #[test]
    fn test_deterministic() {
        let profiles: Vec<ProfileRecord> = (0..40)
            .map(|i| {
                let mut p = user(&format!("u{}", i), ["Delhi", "Chennai", "Pune"][i % 3], "inquiry");
                p.tech_savviness = Some((i % 7) as f64 / 7.0);
                p
            })
            .collect();
        let config = ClusterConfig::default();
        let first = cluster_profiles(&profiles, &config);
        assert_eq!(first, cluster_profiles(&profiles, &config));
        assert!(first.len() <= 4);
        assert_eq!(first.values().map(Vec::len).sum::<usize>(), 40);
    }

    #[test]
    fn test_non_finite_falls_back() {
        let mut profiles: Vec<ProfileRecord> = (0..12)
            .map(|i| user(&format!("u{}", i), "Delhi", "purchase"))
            .collect();
        profiles[3].tech_savviness = Some(f64::NAN);

        assert!(matches!(
            try_cluster(&profiles, &ClusterConfig::default()),
            Err(ClusterError::NonFinite(id)) if id == "u3"
        ));
        let clusters = cluster_profiles(&profiles, &ClusterConfig::default());
        assert_eq!(clusters.keys().collect::<Vec<_>>(), vec!["cluster_0"]);
        assert_eq!(clusters["cluster_0"].len(), 12);
    }
}
