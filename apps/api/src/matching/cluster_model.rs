//! Cluster Model: k-means over TF-IDF vectors.
//!
//! Algorithm:
//! 1. Seed centroids with k-means++ (first pick uniform, the rest proportional
//!    to squared distance from the nearest chosen centroid)
//! 2. Alternate nearest-centroid assignment and mean recomputation until the
//!    total squared centroid shift drops to `tolerance * mean feature variance`
//!    or `max_iterations` is reached
//! 3. Repeat from `restarts` independent seeds and keep the lowest inertia
//!
//! All randomness comes from one `StdRng` seeded by `ClusterParams::seed`, so a
//! fit is reproducible for identical input.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::MatchError;
use crate::matching::feature_model::FeatureMatrix;
use crate::matching::sparse::SparseVector;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub seed: u64,
    pub restarts: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            seed: 42,
            restarts: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    centroids: Vec<Vec<f64>>,
    centroid_squared_norms: Vec<f64>,
    dimension: usize,
    inertia: f64,
    iterations: usize,
    fingerprint: Uuid,
}

/// Centroids and bookkeeping from a single seeded run.
struct Run {
    centroids: Vec<Vec<f64>>,
    squared_norms: Vec<f64>,
    inertia: f64,
    iterations: usize,
}

impl ClusterModel {
    /// Fits `k` centroids to the rows of `matrix`.
    ///
    /// Fails with `InvalidClusterCount` for `k == 0`, `EmptyCorpus` for an
    /// empty matrix and `InsufficientData` when there are fewer rows than `k`.
    pub fn fit(
        matrix: &FeatureMatrix,
        k: usize,
        params: &ClusterParams,
    ) -> Result<Self, MatchError> {
        if k == 0 {
            return Err(MatchError::InvalidClusterCount);
        }
        if matrix.is_empty() {
            return Err(MatchError::EmptyCorpus);
        }
        if matrix.len() < k {
            return Err(MatchError::InsufficientData {
                rows: matrix.len(),
                clusters: k,
            });
        }

        let rows = matrix.rows();
        let dimension = matrix.dimension();
        let threshold = params.tolerance * mean_feature_variance(rows, dimension);

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut best: Option<Run> = None;
        for restart in 0..params.restarts.max(1) {
            let run_seed: u64 = rng.random();
            let run = run_once(rows, dimension, k, params.max_iterations, threshold, run_seed);
            debug!(
                "Restart {restart}: inertia {:.6} after {} iterations",
                run.inertia, run.iterations
            );
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        let Some(best) = best else {
            return Err(MatchError::InvalidClusterCount);
        };
        info!(
            "Clustered {} vectors into {k} clusters (inertia {:.6}, {} iterations)",
            rows.len(),
            best.inertia,
            best.iterations
        );

        Ok(Self {
            centroids: best.centroids,
            centroid_squared_norms: best.squared_norms,
            dimension,
            inertia: best.inertia,
            iterations: best.iterations,
            fingerprint: matrix.fingerprint(),
        })
    }

    /// Nearest centroid by Euclidean distance; ties go to the lowest index.
    pub fn predict(&self, vector: &SparseVector) -> usize {
        nearest(vector, &self.centroids, &self.centroid_squared_norms).0
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn fingerprint(&self) -> Uuid {
        self.fingerprint
    }

    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    /// Checks that a deserialized model is internally consistent.
    pub(crate) fn check_consistency(&self) -> Result<(), MatchError> {
        if self.centroids.is_empty() {
            return Err(MatchError::InvalidClusterCount);
        }
        if self.centroid_squared_norms.len() != self.centroids.len()
            || self.centroids.iter().any(|c| c.len() != self.dimension)
        {
            return Err(MatchError::VocabularyMismatch(format!(
                "cluster model centroids do not all have dimension {}",
                self.dimension
            )));
        }
        Ok(())
    }
}

fn run_once(
    rows: &[SparseVector],
    dimension: usize,
    k: usize,
    max_iterations: usize,
    threshold: f64,
    seed: u64,
) -> Run {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = init_plus_plus(rows, dimension, k, &mut rng);
    let mut squared_norms = squared_norms_of(&centroids);
    let mut iterations = 0;

    while iterations < max_iterations.max(1) {
        iterations += 1;

        let (labels, distances) = assign(rows, &centroids, &squared_norms);
        let updated = recompute(rows, &labels, &distances, dimension, k);

        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| {
                old.iter()
                    .zip(new)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
            })
            .sum();

        centroids = updated;
        squared_norms = squared_norms_of(&centroids);

        if shift <= threshold {
            break;
        }
    }

    let (_, distances) = assign(rows, &centroids, &squared_norms);
    Run {
        centroids,
        squared_norms,
        inertia: distances.iter().sum(),
        iterations,
    }
}

fn init_plus_plus(
    rows: &[SparseVector],
    dimension: usize,
    k: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    chosen.push(rng.random_range(0..n));

    let first = densify(&rows[chosen[0]], dimension);
    let first_norm = squared_norm(&first);
    let mut closest: Vec<f64> = rows
        .iter()
        .map(|row| row.squared_distance_to(&first, first_norm))
        .collect();

    while chosen.len() < k {
        let total: f64 = closest.iter().sum();
        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = n - 1;
            for (i, d) in closest.iter().enumerate() {
                cumulative += d;
                if cumulative > target {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            // Every point coincides with a chosen centroid.
            let remaining: Vec<usize> = (0..n).filter(|i| !chosen.contains(i)).collect();
            remaining[rng.random_range(0..remaining.len())]
        };
        chosen.push(next);

        let centroid = densify(&rows[next], dimension);
        let norm = squared_norm(&centroid);
        for (row, d) in rows.iter().zip(closest.iter_mut()) {
            *d = d.min(row.squared_distance_to(&centroid, norm));
        }
    }

    chosen
        .into_iter()
        .map(|i| densify(&rows[i], dimension))
        .collect()
}

/// Labels and squared distance to the assigned centroid for every row.
fn assign(
    rows: &[SparseVector],
    centroids: &[Vec<f64>],
    squared_norms: &[f64],
) -> (Vec<usize>, Vec<f64>) {
    rows.iter()
        .map(|row| nearest(row, centroids, squared_norms))
        .unzip()
}

fn nearest(vector: &SparseVector, centroids: &[Vec<f64>], squared_norms: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, (centroid, norm)) in centroids.iter().zip(squared_norms).enumerate() {
        let distance = vector.squared_distance_to(centroid, *norm);
        if distance < best.1 {
            best = (i, distance);
        }
    }
    best
}

/// Mean of each cluster's members. An empty cluster is relocated onto the
/// point currently farthest from its own centroid.
fn recompute(
    rows: &[SparseVector],
    labels: &[usize],
    distances: &[f64],
    dimension: usize,
    k: usize,
) -> Vec<Vec<f64>> {
    let mut sums = vec![vec![0.0; dimension]; k];
    let mut counts = vec![0usize; k];
    for (row, &label) in rows.iter().zip(labels) {
        row.add_to_dense(&mut sums[label]);
        counts[label] += 1;
    }

    let mut by_distance: Vec<usize> = (0..rows.len()).collect();
    by_distance.sort_by(|&a, &b| distances[b].total_cmp(&distances[a]));
    let mut relocations = by_distance.into_iter();

    for (cluster, (sum, count)) in sums.iter_mut().zip(&counts).enumerate() {
        if *count > 0 {
            let count = *count as f64;
            sum.iter_mut().for_each(|v| *v /= count);
        } else if let Some(far) = relocations.next() {
            debug!("Cluster {cluster} is empty; relocating to point {far}");
            *sum = densify(&rows[far], dimension);
        }
    }
    sums
}

fn mean_feature_variance(rows: &[SparseVector], dimension: usize) -> f64 {
    if dimension == 0 || rows.is_empty() {
        return 0.0;
    }
    let n = rows.len() as f64;
    let mut sum = vec![0.0; dimension];
    let mut sum_sq = vec![0.0; dimension];
    for row in rows {
        for (index, value) in row.iter() {
            sum[index] += value;
            sum_sq[index] += value * value;
        }
    }
    let total: f64 = sum
        .iter()
        .zip(&sum_sq)
        .map(|(s, sq)| (sq / n - (s / n) * (s / n)).max(0.0))
        .sum();
    total / dimension as f64
}

fn densify(vector: &SparseVector, dimension: usize) -> Vec<f64> {
    let mut dense = vec![0.0; dimension];
    vector.add_to_dense(&mut dense);
    dense
}

fn squared_norm(dense: &[f64]) -> f64 {
    dense.iter().map(|v| v * v).sum()
}

fn squared_norms_of(centroids: &[Vec<f64>]) -> Vec<f64> {
    centroids.iter().map(|c| squared_norm(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::feature_model::FeatureModel;

    fn matrix_of(texts: &[&str]) -> FeatureMatrix {
        FeatureModel::fit(texts).unwrap().transform_all(texts)
    }

    const TWO_TOPICS: &[&str] = &[
        "python pandas numpy",
        "python numpy scikit",
        "pandas python",
        "java spring hibernate",
        "java spring maven",
        "spring hibernate java",
    ];

    #[test]
    fn test_separates_two_obvious_topics() {
        let matrix = matrix_of(TWO_TOPICS);
        let model = ClusterModel::fit(&matrix, 2, &ClusterParams::default()).unwrap();
        let labels: Vec<usize> = matrix.rows().iter().map(|r| model.predict(r)).collect();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let matrix = matrix_of(TWO_TOPICS);
        let params = ClusterParams::default();
        let a = ClusterModel::fit(&matrix, 3, &params).unwrap();
        let b = ClusterModel::fit(&matrix, 3, &params).unwrap();
        assert_eq!(a.centroids(), b.centroids());
        assert_eq!(a.inertia(), b.inertia());
    }

    #[test]
    fn test_fewer_rows_than_clusters_fails() {
        let matrix = matrix_of(&["python", "java"]);
        let err = ClusterModel::fit(&matrix, 3, &ClusterParams::default()).unwrap_err();
        assert_eq!(
            err,
            MatchError::InsufficientData {
                rows: 2,
                clusters: 3
            }
        );
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let matrix = matrix_of(&["python"]);
        assert_eq!(
            ClusterModel::fit(&matrix, 0, &ClusterParams::default()),
            Err(MatchError::InvalidClusterCount)
        );
    }

    #[test]
    fn test_k_equal_to_rows_gives_zero_inertia() {
        let matrix = matrix_of(&["python", "java", "rust"]);
        let model = ClusterModel::fit(&matrix, 3, &ClusterParams::default()).unwrap();
        assert!(model.inertia() < 1e-12, "inertia was {}", model.inertia());
        let mut labels: Vec<usize> = matrix.rows().iter().map(|r| model.predict(r)).collect();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicate_points_still_produce_k_centroids() {
        let matrix = matrix_of(&["python", "python", "python", "java"]);
        let model = ClusterModel::fit(&matrix, 3, &ClusterParams::default()).unwrap();
        assert_eq!(model.k(), 3);
        assert!(model.check_consistency().is_ok());
    }

    #[test]
    fn test_predict_ties_go_to_lowest_index() {
        let model = ClusterModel {
            centroids: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            centroid_squared_norms: vec![1.0, 1.0],
            dimension: 2,
            inertia: 0.0,
            iterations: 1,
            fingerprint: Uuid::nil(),
        };
        // Equidistant from both centroids.
        assert_eq!(model.predict(&SparseVector::default()), 0);
    }

    #[test]
    fn test_model_inherits_matrix_fingerprint() {
        let matrix = matrix_of(TWO_TOPICS);
        let model = ClusterModel::fit(&matrix, 2, &ClusterParams::default()).unwrap();
        assert_eq!(model.fingerprint(), matrix.fingerprint());
        assert_eq!(model.dimension(), matrix.dimension());
    }

    #[test]
    fn test_more_restarts_never_increase_inertia() {
        let matrix = matrix_of(TWO_TOPICS);
        let single = ClusterParams {
            restarts: 1,
            ..ClusterParams::default()
        };
        let one = ClusterModel::fit(&matrix, 3, &single).unwrap();
        let many = ClusterModel::fit(&matrix, 3, &ClusterParams::default()).unwrap();
        // The first restart draws the same run seed in both fits.
        assert!(many.inertia() <= one.inertia());
    }
}
