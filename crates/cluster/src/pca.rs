//! Column standardisation and principal component projection.

const POWER_ITERATIONS: usize = 500;
const CONVERGENCE: f64 = 1e-12;

/// Eigenvalues below this share of the total variance are treated as zero.
const RELATIVE_FLOOR: f64 = 1e-9;

/// Centre each column and scale it to unit population variance.
///
/// Zero-variance columns are only centred.
pub(crate) fn standardize(rows: &mut [Vec<f64>]) {
    let Some(dim) = rows.first().map(Vec::len) else {
        return;
    };
    let n = rows.len() as f64;

    for col in 0..dim {
        let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
        let variance = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        let scale = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        for row in rows.iter_mut() {
            row[col] = (row[col] - mean) / scale;
        }
    }
}

fn covariance(rows: &[Vec<f64>], dim: usize) -> Vec<Vec<f64>> {
    let n = rows.len().saturating_sub(1).max(1) as f64;
    let mut cov = vec![vec![0.0; dim]; dim];
    for row in rows {
        for i in 0..dim {
            for j in i..dim {
                cov[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..dim {
        for j in i..dim {
            cov[i][j] /= n;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Dominant eigenpair of a symmetric matrix. `None` once its eigenvalue
/// falls under `floor`.
fn dominant_eigen(matrix: &[Vec<f64>], floor: f64) -> Option<(f64, Vec<f64>)> {
    let dim = matrix.len();
    let mut v: Vec<f64> = (0..dim).map(|i| 1.0 + i as f64 / dim as f64).collect();
    let start = norm(&v);
    v.iter_mut().for_each(|x| *x /= start);

    for _ in 0..POWER_ITERATIONS {
        let mut next: Vec<f64> = matrix
            .iter()
            .map(|row| row.iter().zip(&v).map(|(a, b)| a * b).sum())
            .collect();
        let length = norm(&next);
        if length < floor {
            return None;
        }
        next.iter_mut().for_each(|x| *x /= length);

        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if delta < CONVERGENCE {
            break;
        }
    }

    let mv: Vec<f64> = matrix
        .iter()
        .map(|row| row.iter().zip(&v).map(|(a, b)| a * b).sum())
        .collect();
    let eigenvalue: f64 = mv.iter().zip(&v).map(|(a, b)| a * b).sum();
    (eigenvalue > floor).then_some((eigenvalue, v))
}

/// Principal axes of centred rows, strongest first, at most `components`.
pub(crate) fn principal_axes(rows: &[Vec<f64>], components: usize) -> Vec<Vec<f64>> {
    let Some(dim) = rows.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut cov = covariance(rows, dim);
    let trace: f64 = (0..dim).map(|i| cov[i][i]).sum();
    let floor = (trace * RELATIVE_FLOOR).max(CONVERGENCE);
    let mut axes = Vec::new();

    while axes.len() < components.min(dim) {
        let Some((eigenvalue, axis)) = dominant_eigen(&cov, floor) else {
            break;
        };
        for i in 0..dim {
            for j in 0..dim {
                cov[i][j] -= eigenvalue * axis[i] * axis[j];
            }
        }
        axes.push(axis);
    }
    axes
}

/// Project centred rows onto their principal axes.
///
/// Rows with no variance at all project to a single zero coordinate.
pub(crate) fn project(rows: &[Vec<f64>], components: usize) -> Vec<Vec<f64>> {
    let axes = principal_axes(rows, components);
    if axes.is_empty() {
        return vec![vec![0.0]; rows.len()];
    }
    rows.iter()
        .map(|row| {
            axes.iter()
                .map(|axis| axis.iter().zip(row).map(|(a, b)| a * b).sum())
                .collect()
        })
        .collect()
}
