//! Support Vector Machine implementations
//!
//! Classifier trained with SMO (one-vs-rest for more than two classes) and an
//! epsilon-insensitive regressor trained by dual coordinate descent. Both use a
//! precomputed kernel matrix.

use crate::error::{ForgeError, Result};
use crate::preprocessing::{StandardScaler, TargetScaler};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training returns an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// K(x, y) = x · y
    Linear,
    /// K(x, y) = exp(-γ ||x - y||²); `None` picks γ = 1 / (n_features · Var(X))
    Rbf { gamma: Option<f64> },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Rbf { gamma: None }
    }
}

/// Kernel with its parameters resolved against the training data
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum Kernel {
    Linear,
    Rbf(f64),
}

impl Kernel {
    fn resolve(kind: KernelType, x: &Array2<f64>) -> Self {
        match kind {
            KernelType::Linear => Kernel::Linear,
            KernelType::Rbf { gamma: Some(g) } => Kernel::Rbf(g),
            KernelType::Rbf { gamma: None } => {
                let var = x.var(0.0);
                let denom = x.ncols() as f64 * var;
                Kernel::Rbf(if denom > 0.0 && denom.is_finite() { 1.0 / denom } else { 1.0 })
            }
        }
    }

    fn eval(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf(gamma) => {
                let sq: f64 = a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum();
                (-gamma * sq).exp()
            }
        }
    }

    /// Gram matrix, rows computed in parallel
    fn matrix(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let n = x.nrows();
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(ForgeError::ComputationError(format!(
                "{} samples exceed the SVM kernel matrix limit of {}",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        let values: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let row_i = x.row(i);
                (0..n).map(move |j| self.eval(row_i, x.row(j)))
            })
            .collect();
        Ok(Array2::from_shape_vec((n, n), values)?)
    }

    /// Σ coef_i · K(sv_i, point)
    fn expand(&self, support: &Array2<f64>, coefs: &Array1<f64>, point: ArrayView1<'_, f64>) -> f64 {
        support
            .rows()
            .into_iter()
            .zip(coefs.iter())
            .map(|(sv, c)| c * self.eval(sv, point))
            .sum()
    }
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Kernel function
    pub kernel: KernelType,
    /// Tolerance for stopping criterion
    pub tol: f64,
    /// Maximum number of passes over the data
    pub max_iter: usize,
    /// Random seed
    pub random_state: u64,
    /// Epsilon for regression (SVR tube width, in target standard deviations)
    pub epsilon: f64,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::default(),
            tol: 1e-3,
            max_iter: 1000,
            random_state: 42,
            epsilon: 0.1,
        }
    }
}

/// Separating function of one binary problem: Σ αᵢyᵢ K(svᵢ, x) + b
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinarySVM {
    support_vectors: Array2<f64>,
    /// αᵢ · yᵢ per support vector
    dual_coefs: Array1<f64>,
    bias: f64,
}

impl BinarySVM {
    fn decision(&self, kernel: &Kernel, point: ArrayView1<'_, f64>) -> f64 {
        kernel.expand(&self.support_vectors, &self.dual_coefs, point) + self.bias
    }
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    kernel: Option<Kernel>,
    /// One model for two classes (positive = classes[1]), one per class otherwise
    models: Vec<BinarySVM>,
    classes: Vec<f64>,
}

impl SVMClassifier {
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            kernel: None,
            models: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Fit the classifier (binary directly, multi-class via one-vs-rest)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(ForgeError::target_length(x.nrows(), y.len()));
        }

        let mut classes = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        if classes.len() < 2 {
            return Err(ForgeError::InsufficientClassSamples(
                "SVM requires at least 2 distinct classes".to_string(),
            ));
        }

        let kernel = Kernel::resolve(self.config.kernel, x);
        let gram = kernel.matrix(x)?;

        let positives: Vec<f64> = if classes.len() == 2 {
            vec![classes[1]]
        } else {
            classes.clone()
        };

        self.models = positives
            .iter()
            .map(|&positive| {
                let y_binary = y.mapv(|v| if v == positive { 1.0 } else { -1.0 });
                self.smo_train(x, &y_binary, &gram)
            })
            .collect::<Result<_>>()?;
        self.kernel = Some(kernel);
        self.classes = classes;
        Ok(())
    }

    /// Simplified SMO with a cached error vector
    fn smo_train(&self, x: &Array2<f64>, y: &Array1<f64>, k: &Array2<f64>) -> Result<BinarySVM> {
        let n = x.nrows();
        let c = self.config.c;
        let tol = self.config.tol;

        let mut alphas = Array1::<f64>::zeros(n);
        let mut bias = 0.0;
        // errors[i] = f(x_i) - y_i with all alphas at zero
        let mut errors = -y;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        let mut passes = 0;
        let mut total_iter = 0;
        while n > 1 && passes < 5 && total_iter < self.config.max_iter {
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = errors[i];
                let violates = (y[i] * e_i < -tol && alphas[i] < c) || (y[i] * e_i > tol && alphas[i] > 0.0);
                if !violates {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };
                let e_j = errors[j];
                let (a_i_old, a_j_old) = (alphas[i], alphas[j]);

                let (low, high) = if y[i] != y[j] {
                    ((a_j_old - a_i_old).max(0.0), (c + a_j_old - a_i_old).min(c))
                } else {
                    ((a_i_old + a_j_old - c).max(0.0), (a_i_old + a_j_old).min(c))
                };
                if high - low < 1e-10 {
                    continue;
                }

                let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                let a_j = (a_j_old - y[j] * (e_i - e_j) / eta).clamp(low, high);
                if (a_j - a_j_old).abs() < 1e-5 {
                    continue;
                }
                let a_i = a_i_old + y[i] * y[j] * (a_j_old - a_j);

                let d_i = y[i] * (a_i - a_i_old);
                let d_j = y[j] * (a_j - a_j_old);
                let b1 = bias - e_i - d_i * k[[i, i]] - d_j * k[[i, j]];
                let b2 = bias - e_j - d_i * k[[i, j]] - d_j * k[[j, j]];
                let new_bias = if a_i > 0.0 && a_i < c {
                    b1
                } else if a_j > 0.0 && a_j < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                let d_b = new_bias - bias;
                for m in 0..n {
                    errors[m] += d_i * k[[i, m]] + d_j * k[[j, m]] + d_b;
                }
                alphas[i] = a_i;
                alphas[j] = a_j;
                bias = new_bias;
                num_changed += 1;
            }

            total_iter += 1;
            passes = if num_changed == 0 { passes + 1 } else { 0 };
        }

        let support: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
        Ok(BinarySVM {
            support_vectors: x.select(Axis(0), &support),
            dual_coefs: support.iter().map(|&i| alphas[i] * y[i]).collect(),
            bias,
        })
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let kernel = self.kernel.as_ref().ok_or(ForgeError::ModelNotFitted)?;

        let predictions = x.rows().into_iter().map(|row| {
            if let [model] = self.models.as_slice() {
                if model.decision(kernel, row) >= 0.0 {
                    self.classes[1]
                } else {
                    self.classes[0]
                }
            } else {
                let mut best = (f64::NEG_INFINITY, 0usize);
                for (k, model) in self.models.iter().enumerate() {
                    let score = model.decision(kernel, row);
                    if score > best.0 {
                        best = (score, k);
                    }
                }
                self.classes[best.1]
            }
        });

        Ok(predictions.collect())
    }

    /// Total number of support vectors across the binary problems
    pub fn n_support_vectors(&self) -> usize {
        self.models.iter().map(|m| m.support_vectors.nrows()).sum()
    }
}

/// Support Vector Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMRegressor {
    config: SVMConfig,
    kernel: Option<Kernel>,
    support_vectors: Array2<f64>,
    dual_coefs: Array1<f64>,
    bias: f64,
    features: Option<StandardScaler>,
    target: Option<TargetScaler>,
}

impl SVMRegressor {
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            kernel: None,
            support_vectors: Array2::zeros((0, 0)),
            dual_coefs: Array1::zeros(0),
            bias: 0.0,
            features: None,
            target: None,
        }
    }

    /// Fit by coordinate descent on the dual of the epsilon-insensitive loss.
    ///
    /// The bias is folded into the kernel (K + 1). Features and target are
    /// standardized so `epsilon` and `C` do not depend on their units.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(ForgeError::target_length(n, y.len()));
        }
        if n == 0 {
            return Err(ForgeError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }

        let (features, xs) = StandardScaler::fit_transform(x)?;
        let target = TargetScaler::fit(y);
        let ys = target.transform(y);
        let kernel = Kernel::resolve(self.config.kernel, &xs);
        let gram = kernel.matrix(&xs)? + 1.0;

        let c = self.config.c;
        let eps = self.config.epsilon;
        let mut beta = Array1::<f64>::zeros(n);
        // f = gram · beta
        let mut f = Array1::<f64>::zeros(n);

        for _ in 0..self.config.max_iter {
            let mut max_delta: f64 = 0.0;

            for i in 0..n {
                let kii = gram[[i, i]];
                let z = kii * beta[i] - (f[i] - ys[i]);
                let shrunk = z.signum() * (z.abs() - eps).max(0.0);
                let updated = (shrunk / kii).clamp(-c, c);
                let delta = updated - beta[i];

                if delta.abs() > 1e-12 {
                    f.scaled_add(delta, &gram.row(i));
                    beta[i] = updated;
                    max_delta = max_delta.max(delta.abs());
                }
            }

            if max_delta < self.config.tol {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i].abs() > 1e-8).collect();
        self.support_vectors = xs.select(Axis(0), &support);
        self.dual_coefs = support.iter().map(|&i| beta[i]).collect();
        self.bias = self.dual_coefs.sum();
        self.kernel = Some(kernel);
        self.features = Some(features);
        self.target = Some(target);
        Ok(())
    }

    /// Predict target values
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (kernel, features, target) = match (&self.kernel, &self.features, &self.target) {
            (Some(k), Some(f), Some(t)) => (k, f, t),
            _ => return Err(ForgeError::ModelNotFitted),
        };

        let xs = features.transform(x)?;
        let scaled: Array1<f64> = xs
            .rows()
            .into_iter()
            .map(|row| kernel.expand(&self.support_vectors, &self.dual_coefs, row) + self.bias)
            .collect();
        Ok(target.inverse(&scaled))
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 1.0],
            [1.5, 1.2],
            [1.2, 1.8],
            [2.0, 1.5],
            [6.0, 6.0],
            [6.5, 5.8],
            [5.8, 6.4],
            [7.0, 6.5],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_svm_classifier_linear() {
        let (x, y) = separable();
        let mut model = SVMClassifier::new(SVMConfig {
            kernel: KernelType::Linear,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        assert!(model.n_support_vectors() > 0);
    }

    #[test]
    fn test_svm_classifier_rbf_scale_gamma() {
        let (x, y) = separable();
        let mut model = SVMClassifier::new(SVMConfig::default());
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[1.3, 1.3], [6.2, 6.1]]).unwrap();
        assert_eq!(pred.to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_svm_classifier_multiclass() {
        let x = array![
            [0.0, 0.0],
            [0.3, 0.2],
            [0.1, 0.4],
            [5.0, 0.0],
            [5.2, 0.3],
            [4.8, 0.1],
            [0.0, 5.0],
            [0.2, 5.3],
            [0.4, 4.9],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];

        let mut model = SVMClassifier::new(SVMConfig::default());
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[0.1, 0.1], [5.1, 0.2], [0.1, 5.1]]).unwrap();
        assert_eq!(pred.to_vec(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_svm_regressor_linear_trend() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| 3.0 * v + 100.0);

        let mut model = SVMRegressor::new(SVMConfig {
            kernel: KernelType::Linear,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[5.0], [15.0]]).unwrap();
        assert!((pred[0] - 115.0).abs() < 5.0, "got {}", pred[0]);
        assert!((pred[1] - 145.0).abs() < 5.0, "got {}", pred[1]);
    }

    #[test]
    fn test_svm_regressor_rbf_is_finite() {
        let x = Array2::from_shape_fn((25, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = Array1::from_shape_fn(25, |i| (i as f64).sin() * 10.0);

        let mut model = SVMRegressor::new(SVMConfig::default());
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&x).unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_single_class_rejected() {
        let mut model = SVMClassifier::new(SVMConfig::default());
        let err = model.fit(&array![[1.0], [2.0]], &array![3.0, 3.0]).unwrap_err();
        assert!(matches!(err, ForgeError::InsufficientClassSamples(_)));
    }
}
