//! K-Nearest Neighbors implementation
//!
//! Brute-force Euclidean search; queries are answered in parallel and the k
//! closest training rows are kept in a bounded max-heap.

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{ForgeError, Result};

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Weighting scheme
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            weights: WeightScheme::Uniform,
        }
    }
}

/// Stored training set
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NeighborIndex {
    x: Array2<f64>,
    y: Array1<f64>,
}

/// Heap entry ordered by (distance, row index) so equal distances resolve to
/// the earlier training row
#[derive(PartialEq)]
struct Candidate {
    dist: f64,
    row: usize,
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.row.cmp(&other.row))
    }
}

impl NeighborIndex {
    fn new(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ForgeError::target_length(x.nrows(), y.len()));
        }
        if x.nrows() == 0 {
            return Err(ForgeError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }
        Ok(Self {
            x: x.clone(),
            y: y.clone(),
        })
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.x.ncols() {
            return Err(ForgeError::ShapeError {
                expected: format!("{} features", self.x.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// (distance, target) of the k nearest rows, nearest first
    fn nearest(&self, point: ArrayView1<'_, f64>, k: usize) -> Vec<(f64, f64)> {
        let k = k.min(self.x.nrows()).max(1);
        let mut heap = BinaryHeap::with_capacity(k + 1);

        for (row, train) in self.x.rows().into_iter().enumerate() {
            let dist = point
                .iter()
                .zip(train.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            let candidate = Candidate { dist, row };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|top| candidate < *top) {
                heap.pop();
                heap.push(candidate);
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| (c.dist, self.y[c.row]))
            .collect()
    }
}

fn weight_of(dist: f64, scheme: WeightScheme) -> f64 {
    match scheme {
        WeightScheme::Uniform => 1.0,
        WeightScheme::Distance => 1.0 / (dist + 1e-10),
    }
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    index: Option<NeighborIndex>,
    classes: Vec<f64>,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            index: None,
            classes: Vec::new(),
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    /// Fit the classifier (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let index = NeighborIndex::new(x, y)?;
        let mut classes = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();

        self.classes = classes;
        self.index = Some(index);
        Ok(())
    }

    /// Predict class labels; vote ties go to the smallest class
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let index = self.index.as_ref().ok_or(ForgeError::ModelNotFitted)?;
        index.check_width(x)?;

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|row| {
                let mut votes = vec![0.0; self.classes.len()];
                for (dist, label) in index.nearest(row, self.config.n_neighbors) {
                    let class_idx = self.classes.partition_point(|c| *c < label);
                    votes[class_idx] += weight_of(dist, self.config.weights);
                }

                let mut best = 0;
                for (idx, &v) in votes.iter().enumerate() {
                    if v > votes[best] {
                        best = idx;
                    }
                }
                self.classes[best]
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

/// K-Nearest Neighbors Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    config: KNNConfig,
    index: Option<NeighborIndex>,
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            index: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    /// Fit the regressor (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.index = Some(NeighborIndex::new(x, y)?);
        Ok(())
    }

    /// Mean (or inverse-distance weighted mean) of the neighbours' targets
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let index = self.index.as_ref().ok_or(ForgeError::ModelNotFitted)?;
        index.check_width(x)?;

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|row| {
                let (sum, total) = index
                    .nearest(row, self.config.n_neighbors)
                    .into_iter()
                    .fold((0.0, 0.0), |(sum, total), (dist, value)| {
                        let w = weight_of(dist, self.config.weights);
                        (sum + w * value, total + w)
                    });
                sum / total
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}
