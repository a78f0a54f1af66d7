//! Random Forest implementation

use super::decision_tree::{DecisionTree, TreeKind};
use crate::error::{ForgeError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for the number of features drawn per split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => ((n_features as f64).sqrt().floor() as usize).max(1),
            MaxFeatures::All => n_features,
        }
    }
}

/// Bagged ensemble of decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Base seed; tree `i` uses `random_state + i`
    pub random_state: u64,
    kind: TreeKind,
}

impl RandomForest {
    /// Classifier forest (sqrt features per split)
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: n_estimators.max(1),
            max_depth: None,
            max_features: MaxFeatures::Sqrt,
            random_state: 42,
            kind: TreeKind::Classifier,
        }
    }

    /// Regressor forest (all features per split)
    pub fn new_regressor(n_estimators: usize) -> Self {
        Self {
            max_features: MaxFeatures::All,
            kind: TreeKind::Regressor,
            ..Self::new_classifier(n_estimators)
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the forest; trees are grown in parallel on bootstrap samples
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(ForgeError::target_length(n_samples, y.len()));
        }
        if n_samples == 0 {
            return Err(ForgeError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }

        let max_features = self.max_features.resolve(x.ncols());
        let base_seed = self.random_state;
        let kind = self.kind;
        let max_depth = self.max_depth;

        self.trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                let x_boot = x.select(Axis(0), &sample);
                let y_boot = y.select(Axis(0), &sample);

                let mut tree = match kind {
                    TreeKind::Classifier => DecisionTree::new_classifier(),
                    TreeKind::Regressor => DecisionTree::new_regressor(),
                }
                .with_max_features(max_features);
                tree.max_depth = max_depth;

                tree.fit_with_rng(&x_boot, &y_boot, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self)
    }

    /// Majority vote (classifier) or mean (regressor) over the trees
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ForgeError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<_>>()?;

        let n_trees = all_predictions.len() as f64;
        let predictions = (0..x.nrows()).map(|i| {
            let votes = all_predictions.iter().map(|p| p[i]);
            match self.kind {
                TreeKind::Classifier => majority(votes),
                TreeKind::Regressor => votes.sum::<f64>() / n_trees,
            }
        });

        Ok(predictions.collect())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Most frequent value, smallest on ties
fn majority(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);

    let mut best = (f64::NAN, 0usize);
    let mut run = (f64::NAN, 0usize);
    for v in sorted {
        if v == run.0 {
            run.1 += 1;
        } else {
            run = (v, 1);
        }
        if run.1 > best.1 {
            best = run;
        }
    }
    best.0
}
