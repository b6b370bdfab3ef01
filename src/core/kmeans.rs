//! Seeded k-means over dense feature vectors
//!
//! Lloyd iterations from a k-means++ initialisation. The generator is seeded so
//! identical input always yields identical labels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct KMeansOptions {
    pub max_iter: usize,
    /// Stop once no centroid moves more than this (squared distance)
    pub tolerance: f64,
    pub seed: u64,
    /// Independent initialisations, the lowest inertia wins
    pub runs: usize,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
            runs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster index per input row
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centroids
    pub inertia: f64,
    pub iterations: usize,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum KMeansError {
    #[error("cannot form {k} clusters from {n} rows")]
    TooFewRows { k: usize, n: usize },
    #[error("row {row} has {found} dimensions, expected {expected}")]
    Ragged {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("cluster count must be positive")]
    ZeroClusters,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(row: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(row, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// k-means++ seeding: each new center is drawn proportionally to its squared
/// distance from the nearest existing center
fn init_centroids(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..data.len())].clone());

    let mut distances: Vec<f64> = data
        .iter()
        .map(|row| squared_distance(row, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();

        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = data.len() - 1;
            for (i, d) in distances.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // every row coincides with a center already
            rng.gen_range(0..data.len())
        };

        let centroid = data[next].clone();
        for (d, row) in distances.iter_mut().zip(data) {
            *d = d.min(squared_distance(row, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Partition `data` into `k` clusters
pub fn fit(data: &[Vec<f64>], k: usize, options: &KMeansOptions) -> Result<KMeansFit, KMeansError> {
    if k == 0 {
        return Err(KMeansError::ZeroClusters);
    }
    if data.len() < k {
        return Err(KMeansError::TooFewRows { k, n: data.len() });
    }

    let dim = data[0].len();
    if let Some((row, found)) = data
        .iter()
        .enumerate()
        .map(|(i, r)| (i, r.len()))
        .find(|(_, len)| *len != dim)
    {
        return Err(KMeansError::Ragged {
            row,
            found,
            expected: dim,
        });
    }

    let mut best: Option<KMeansFit> = None;
    for run in 0..options.runs.max(1) {
        let seed = options.seed.wrapping_add(run as u64);
        let candidate = fit_once(data, k, dim, options, seed);
        if best
            .as_ref()
            .map_or(true, |b| candidate.inertia < b.inertia)
        {
            best = Some(candidate);
        }
    }

    best.ok_or(KMeansError::ZeroClusters)
}

fn fit_once(data: &[Vec<f64>], k: usize, dim: usize, options: &KMeansOptions, seed: u64) -> KMeansFit {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = init_centroids(data, k, &mut rng);
    let mut labels = vec![0usize; data.len()];
    let mut iterations = 0;

    for _ in 0..options.max_iter.max(1) {
        iterations += 1;

        for (label, row) in labels.iter_mut().zip(data) {
            *label = nearest(row, &centroids).0;
        }

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (label, row) in labels.iter().zip(data) {
            counts[*label] += 1;
            for (s, v) in sums[*label].iter_mut().zip(row) {
                *s += v;
            }
        }

        let mut shift: f64 = 0.0;
        for (i, (sum, count)) in sums.into_iter().zip(&counts).enumerate() {
            // an empty cluster keeps its previous centroid
            if *count == 0 {
                continue;
            }
            let updated: Vec<f64> = sum.into_iter().map(|s| s / *count as f64).collect();
            shift = shift.max(squared_distance(&updated, &centroids[i]));
            centroids[i] = updated;
        }

        if shift <= options.tolerance {
            break;
        }
    }

    // labels against the final centroids
    let mut inertia = 0.0;
    for (label, row) in labels.iter_mut().zip(data) {
        let (index, distance) = nearest(row, &centroids);
        *label = index;
        inertia += distance;
    }

    KMeansFit {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.2],
            vec![0.2, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 9.9],
            vec![9.8, 10.2],
        ]
    }

    #[test]
    fn test_separates_obvious_groups() {
        let fit = fit(&blobs(), 2, &KMeansOptions::default()).unwrap();

        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[1], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_eq!(fit.labels[4], fit.labels[5]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert_eq!(fit.centroids.len(), 2);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let data: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i * 37 % 11) as f64, (i * 13 % 7) as f64, (i % 5) as f64])
            .collect();

        let a = fit(&data, 4, &KMeansOptions::default()).unwrap();
        let b = fit(&data, 4, &KMeansOptions::default()).unwrap();
        assert_eq!(a, b);
        assert!(a.labels.iter().all(|l| *l < 4));
    }

    #[test]
    fn test_labels_cover_k_when_rows_are_distinct() {
        let data = vec![vec![0.0], vec![5.0], vec![10.0]];
        let fit = fit(&data, 3, &KMeansOptions::default()).unwrap();

        let mut labels = fit.labels.clone();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_more_runs_never_increase_inertia() {
        let data: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![(i * 17 % 23) as f64, (i * 5 % 9) as f64])
            .collect();

        let single = fit(&data, 3, &KMeansOptions::default()).unwrap();
        let many = fit(
            &data,
            3,
            &KMeansOptions {
                runs: 8,
                ..KMeansOptions::default()
            },
        )
        .unwrap();
        assert!(many.inertia <= single.inertia);
    }

    #[test]
    fn test_identical_rows_do_not_panic() {
        let data = vec![vec![1.0, 1.0]; 4];
        let fit = fit(&data, 2, &KMeansOptions::default()).unwrap();
        assert_eq!(fit.labels.len(), 4);
    }

    #[test]
    fn test_rejects_bad_input() {
        let options = KMeansOptions::default();
        assert_eq!(
            fit(&[vec![1.0]], 2, &options).unwrap_err(),
            KMeansError::TooFewRows { k: 2, n: 1 }
        );
        assert_eq!(
            fit(&[vec![1.0], vec![1.0, 2.0]], 2, &options).unwrap_err(),
            KMeansError::Ragged {
                row: 1,
                found: 2,
                expected: 1
            }
        );
        assert_eq!(fit(&blobs(), 0, &options).unwrap_err(), KMeansError::ZeroClusters);
    }
}
