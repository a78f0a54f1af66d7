//! Gaussian Naive Bayes

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{ForgeError, Result};

/// Gaussian Naive Bayes Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Per-class feature means, one row per class
    means: Array2<f64>,
    /// Per-class feature variances, one row per class
    variances: Array2<f64>,
    log_priors: Array1<f64>,
    classes: Vec<f64>,
    /// Portion of the largest feature variance added to every variance
    var_smoothing: f64,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            means: Array2::zeros((0, 0)),
            variances: Array2::zeros((0, 0)),
            log_priors: Array1::zeros(0),
            classes: Vec::new(),
            var_smoothing: 1e-9,
        }
    }

    /// Set variance smoothing parameter
    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(ForgeError::target_length(n_samples, y.len()));
        }
        if n_samples == 0 {
            return Err(ForgeError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }

        let mut classes = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();

        // Smoothing is relative to the widest feature so it is unit-free
        let max_var = x
            .var_axis(Axis(0), 0.0)
            .fold(0.0_f64, |m, &v| m.max(v));
        let epsilon = self.var_smoothing * max_var.max(f64::MIN_POSITIVE);

        let n_classes = classes.len();
        let mut means = Array2::zeros((n_classes, n_features));
        let mut variances = Array2::zeros((n_classes, n_features));
        let mut log_priors = Array1::zeros(n_classes);

        for (k, &class) in classes.iter().enumerate() {
            let rows: Vec<usize> = (0..n_samples).filter(|&i| y[i] == class).collect();

            // Single-pass Welford's algorithm for mean and variance
            let mut mean = vec![0.0; n_features];
            let mut m2 = vec![0.0; n_features];
            for (count, &idx) in rows.iter().enumerate() {
                let seen = (count + 1) as f64;
                for (j, &val) in x.row(idx).iter().enumerate() {
                    let delta = val - mean[j];
                    mean[j] += delta / seen;
                    m2[j] += delta * (val - mean[j]);
                }
            }

            let n_class = rows.len() as f64;
            for j in 0..n_features {
                means[[k, j]] = mean[j];
                variances[[k, j]] = m2[j] / n_class + epsilon;
            }
            log_priors[k] = (n_class / n_samples as f64).ln();
        }

        self.means = means;
        self.variances = variances;
        self.log_priors = log_priors;
        self.classes = classes;
        Ok(())
    }

    /// Unnormalized joint log likelihood, one column per class
    fn joint_log_likelihood(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.classes.is_empty() {
            return Err(ForgeError::ModelNotFitted);
        }
        if x.ncols() != self.means.ncols() {
            return Err(ForgeError::ShapeError {
                expected: format!("{} features", self.means.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let n_classes = self.classes.len();
        Ok(Array2::from_shape_fn((x.nrows(), n_classes), |(i, k)| {
            let row = x.row(i);
            let log_likelihood: f64 = row
                .iter()
                .zip(self.means.row(k).iter().zip(self.variances.row(k).iter()))
                .map(|(&v, (&mean, &var))| -0.5 * (2.0 * PI * var).ln() - (v - mean).powi(2) / (2.0 * var))
                .sum();
            self.log_priors[k] + log_likelihood
        }))
    }

    /// Class probabilities via log-sum-exp, columns in sorted class order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let mut jll = self.joint_log_likelihood(x)?;
        for mut row in jll.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            let log_sum = max + row.mapv(|v| (v - max).exp()).sum().ln();
            row.mapv_inplace(|v| (v - log_sum).exp());
        }
        Ok(jll)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let jll = self.joint_log_likelihood(x)?;
        Ok(jll
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (k, &v) in row.iter().enumerate() {
                    if v > row[best] {
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
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_gaussian_nb() {
        let x = array![[1.0, 2.0], [1.2, 1.8], [0.9, 2.1], [5.0, 6.0], [5.1, 5.9], [4.9, 6.2]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = GaussianNaiveBayes::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&array![[1.0, 2.0]]).unwrap();
        assert!(proba[[0, 0]] > 0.99);
        assert_abs_diff_eq!(proba.row(0).sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_feature_is_smoothed() {
        // Second feature is constant within each class
        let x = array![[1.0, 0.0], [2.0, 0.0], [8.0, 1.0], [9.0, 1.0]];
        let y = array![3.0, 3.0, 7.0, 7.0];

        let mut model = GaussianNaiveBayes::new();
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[1.5, 0.0], [8.5, 1.0]]).unwrap();
        assert_eq!(pred.to_vec(), vec![3.0, 7.0]);
        assert!(model.predict_proba(&x).unwrap().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_unfitted() {
        let model = GaussianNaiveBayes::new();
        assert!(matches!(model.predict(&array![[1.0]]), Err(ForgeError::ModelNotFitted)));
    }
}
