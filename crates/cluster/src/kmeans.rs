//! Seeded k-means with k-means++ initialisation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ClusterConfig;

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

fn init_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| squared_distance(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        if total <= 0.0 {
            centroids.push(points[rng.random_range(0..points.len())].clone());
            continue;
        }

        let target = rng.random::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = points.len() - 1;
        for (i, weight) in weights.iter().enumerate() {
            cumulative += weight;
            if cumulative >= target && *weight > 0.0 {
                chosen = i;
                break;
            }
        }
        centroids.push(points[chosen].clone());
    }
    centroids
}

fn update(points: &[Vec<f64>], labels: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dim = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dim]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(point) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}

/// Cluster label per point. `k` must be in `1..=points.len()`.
pub(crate) fn fit_predict(points: &[Vec<f64>], k: usize, config: &ClusterConfig) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = init_plus_plus(points, k, &mut rng);

    for iteration in 0..config.max_iterations {
        let labels: Vec<usize> = points.iter().map(|p| nearest(p, &centroids)).collect();
        let updated = update(points, &labels, &centroids);
        let shift: f64 = updated
            .iter()
            .zip(&centroids)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = updated;

        if shift <= config.tolerance {
            tracing::debug!(iterations = iteration + 1, k, "K-means converged");
            break;
        }
    }

    points.iter().map(|p| nearest(p, &centroids)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_separates_two_blobs() {
        let mut points: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64 * 0.01, 0.0]).collect();
        points.extend((0..5).map(|i| vec![10.0 + i as f64 * 0.01, 10.0]));

        let labels = fit_predict(&points, 2, &ClusterConfig::default());
        assert!(labels[..5].iter().all(|&l| l == labels[0]));
        assert!(labels[5..].iter().all(|&l| l == labels[5]));
        assert_ne!(labels[0], labels[5]);
    }

    #[test]
    fn test_single_cluster() {
        let points = vec![vec![1.0], vec![2.0], vec![3.0]];
        assert_eq!(fit_predict(&points, 1, &ClusterConfig::default()), vec![0, 0, 0]);
    }

    #[test]
    fn test_identical_points() {
        let points = vec![vec![1.0, 1.0]; 6];
        let labels = fit_predict(&points, 3, &ClusterConfig::default());
        assert_eq!(labels.len(), 6);
        assert!(labels.iter().all(|&l| l < 3));
    }
}
