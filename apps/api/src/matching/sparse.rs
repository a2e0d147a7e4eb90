use serde::{Deserialize, Serialize};

/// Sparse vector with strictly increasing feature indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    /// Builds a vector from `(index, value)` pairs already sorted by index.
    /// Zero entries are dropped.
    pub fn from_sorted_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (index, value) in pairs {
            debug_assert!(indices.last().map_or(true, |&last| last < index));
            if value != 0.0 {
                indices.push(index);
                values.push(value);
            }
        }
        Self { indices, values }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn squared_norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    pub fn norm(&self) -> f64 {
        self.squared_norm().sqrt()
    }

    /// Scales to unit length. A zero vector stays zero.
    pub fn l2_normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            for value in &mut self.values {
                *value /= norm;
            }
        }
        self
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.iter().map(|(index, value)| value * dense[index]).sum()
    }

    /// Adds this vector into a dense accumulator.
    pub fn add_to_dense(&self, dense: &mut [f64]) {
        for (index, value) in self.iter() {
            dense[index] += value;
        }
    }

    /// Squared Euclidean distance to a dense point whose squared norm is known.
    pub fn squared_distance_to(&self, dense: &[f64], dense_squared_norm: f64) -> f64 {
        (self.squared_norm() - 2.0 * self.dot_dense(dense) + dense_squared_norm).max(0.0)
    }
}

/// Cosine similarity in `[-1, 1]`; zero when either side is the zero vector.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let denominator = a.norm() * b.norm();
    if denominator == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denominator).clamp(-1.0, 1.0)
}
