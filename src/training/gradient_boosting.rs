//! Gradient Boosting implementation
//!
//! Least-squares boosting for regression and log-loss boosting for
//! classification (sigmoid for two classes, softmax with one tree per class and
//! round otherwise). Each round fits a shallow regression tree to the negative
//! gradient.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use crate::error::{ForgeError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio for each round
    pub subsample: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

impl GradientBoostingConfig {
    fn base_tree(&self) -> DecisionTree {
        DecisionTree::new_regressor()
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
    }

    fn round_rows(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        if self.subsample < 1.0 {
            let size = ((n as f64) * self.subsample).ceil().max(1.0) as usize;
            indices.shuffle(rng);
            indices.truncate(size);
            indices.sort_unstable();
        }
        indices
    }

    /// Fit one residual tree on the round's rows and return it with its
    /// predictions over all rows
    fn fit_stage(
        &self,
        x: &Array2<f64>,
        residuals: &Array1<f64>,
        rows: &[usize],
    ) -> Result<(DecisionTree, Array1<f64>)> {
        let mut tree = self.base_tree();
        if rows.len() == x.nrows() {
            tree.fit(x, residuals)?;
        } else {
            tree.fit(&x.select(Axis(0), rows), &residuals.select(Axis(0), rows))?;
        }
        let update = tree.predict(x)?;
        Ok((tree, update))
    }
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_prediction: f64,
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
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

        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        self.trees.clear();
        for _ in 0..self.config.n_estimators {
            let residuals = y - &predictions;
            let rows = self.config.round_rows(n_samples, &mut rng);
            let (tree, update) = self.config.fit_stage(x, &residuals, &rows)?;

            predictions.scaled_add(self.config.learning_rate, &update);
            self.trees.push(tree);
        }

        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ForgeError::ModelNotFitted);
        }

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(predictions)
    }
}

/// Gradient Boosting Classifier (binary and multi-class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    /// One entry per round; each holds one tree per score column
    rounds: Vec<Vec<DecisionTree>>,
    /// Initial raw score per score column
    initial_scores: Vec<f64>,
    classes: Vec<f64>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            rounds: Vec::new(),
            initial_scores: Vec::new(),
            classes: Vec::new(),
        }
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }

    /// Row-wise softmax of raw scores
    fn softmax(scores: &Array2<f64>) -> Array2<f64> {
        let mut probs = scores.clone();
        for mut row in probs.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        probs
    }

    fn probabilities(&self, scores: &Array2<f64>) -> Array2<f64> {
        if self.classes.len() == 2 {
            scores.mapv(Self::sigmoid)
        } else {
            Self::softmax(scores)
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(ForgeError::target_length(n_samples, y.len()));
        }

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        if classes.len() < 2 {
            return Err(ForgeError::InsufficientClassSamples(
                "gradient boosting needs at least 2 distinct classes".to_string(),
            ));
        }

        // Two classes share a single logit column
        let n_columns = if classes.len() == 2 { 1 } else { classes.len() };
        let targets = Array2::<f64>::from_shape_fn((n_samples, n_columns), |(i, k)| {
            let class = if n_columns == 1 { classes[1] } else { classes[k] };
            if y[i] == class { 1.0 } else { 0.0 }
        });

        self.initial_scores = (0..n_columns)
            .map(|k| {
                let prior = targets.column(k).mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
                if n_columns == 1 {
                    (prior / (1.0 - prior)).ln()
                } else {
                    prior.ln()
                }
            })
            .collect();
        self.classes = classes;

        let mut scores = Array2::from_shape_fn((n_samples, n_columns), |(_, k)| self.initial_scores[k]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        self.rounds.clear();
        for _ in 0..self.config.n_estimators {
            let residuals = &targets - &self.probabilities(&scores);
            let rows = self.config.round_rows(n_samples, &mut rng);

            let mut round = Vec::with_capacity(n_columns);
            for k in 0..n_columns {
                let (tree, update) = self.config.fit_stage(x, &residuals.column(k).to_owned(), &rows)?;
                scores.column_mut(k).scaled_add(self.config.learning_rate, &update);
                round.push(tree);
            }
            self.rounds.push(round);
        }

        Ok(())
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let n_columns = self.initial_scores.len();
        let mut scores = Array2::from_shape_fn((x.nrows(), n_columns), |(_, k)| self.initial_scores[k]);
        for round in &self.rounds {
            for (k, tree) in round.iter().enumerate() {
                scores.column_mut(k).scaled_add(self.config.learning_rate, &tree.predict(x)?);
            }
        }
        Ok(scores)
    }

    /// Class probabilities, columns in sorted class order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.rounds.is_empty() {
            return Err(ForgeError::ModelNotFitted);
        }
        let probs = self.probabilities(&self.raw_scores(x)?);
        if self.classes.len() == 2 {
            let p1 = probs.column(0);
            Ok(Array2::from_shape_fn((x.nrows(), 2), |(i, k)| {
                if k == 1 { p1[i] } else { 1.0 - p1[i] }
            }))
        } else {
            Ok(probs)
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (k, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = k;
                    }
                }
                self.classes[best]
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regressor_fits_step() {
        let x = Array2::from_shape_fn((40, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| if v < 20.0 { 1.0 } else { 10.0 });

        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig::default());
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[5.0], [35.0]]).unwrap();
        assert!((pred[0] - 1.0).abs() < 0.5, "got {}", pred[0]);
        assert!((pred[1] - 10.0).abs() < 0.5, "got {}", pred[1]);
    }

    #[test]
    fn test_binary_classifier() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| (i as f64) + j as f64 * 0.5);
        let y = Array1::from_shape_fn(30, |i| if i < 15 { 0.0 } else { 1.0 });

        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        let correct = pred.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        assert!(correct >= 28);

        let proba = model.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_multiclass_classifier() {
        let x = Array2::from_shape_fn((45, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(45, |i| (i / 15) as f64 * 2.0);

        let config = GradientBoostingConfig {
            n_estimators: 30,
            ..Default::default()
        };
        let mut model = GradientBoostingClassifier::new(config);
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[2.0], [22.0], [40.0]]).unwrap();
        assert_eq!(pred.to_vec(), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_subsample_is_seeded() {
        let x = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| v * 0.5);
        let config = GradientBoostingConfig {
            subsample: 0.5,
            n_estimators: 20,
            ..Default::default()
        };

        let mut a = GradientBoostingRegressor::new(config.clone());
        let mut b = GradientBoostingRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        assert!(model.fit(&x, &y).is_err());
    }
}
