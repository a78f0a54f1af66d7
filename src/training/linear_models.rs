//! Linear model implementations

use crate::error::{ForgeError, Result};
use crate::preprocessing::StandardScaler;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Cholesky factorization of a symmetric positive-definite matrix, lower factor
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                // Relative threshold so rounding noise on a singular matrix is not
                // mistaken for a positive pivot
                if diag <= 1e-12 * a[[i, i]].abs() || diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Some(l)
}

/// Solve L Lᵀ x = b given the lower Cholesky factor
fn cholesky_substitute(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    let mut y = Array1::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    x
}

/// Solve a symmetric positive semi-definite system `A x = b`.
///
/// A rank-deficient `A` (collinear or constant features) gets a growing ridge on
/// the diagonal until the factorization succeeds.
fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return Err(ForgeError::ShapeError {
            expected: format!("{n}x{n} system"),
            actual: format!("{}x{} matrix, rhs {}", a.nrows(), a.ncols(), b.len()),
        });
    }

    if let Some(l) = cholesky(a) {
        return Ok(cholesky_substitute(&l, b));
    }

    let scale = (a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64).max(1e-12);
    let mut ridge = 1e-10 * scale;
    for _ in 0..12 {
        let mut reg = a.clone();
        reg.diag_mut().mapv_inplace(|d| d + ridge);
        if let Some(l) = cholesky(&reg) {
            return Ok(cholesky_substitute(&l, b));
        }
        ridge *= 10.0;
    }

    Err(ForgeError::ComputationError(
        "normal equations are singular".to_string(),
    ))
}

/// Ordinary least squares with intercept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// L2 penalty added to the normal equations (0 = plain OLS)
    pub alpha: f64,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            alpha: 0.0,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Solve the normal equations on centered data
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

        let (x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| ForgeError::ComputationError("empty matrix".to_string()))?;
            (x_mean, y.mean().unwrap_or(0.0))
        } else {
            (Array1::zeros(x.ncols()), 0.0)
        };

        let x_centered = x - &x_mean;
        let y_centered = y - y_mean;

        let mut xtx = x_centered.t().dot(&x_centered);
        if self.alpha > 0.0 {
            xtx.diag_mut().mapv_inplace(|d| d + self.alpha);
        }
        let xty = x_centered.t().dot(&y_centered);
        let coefficients = solve_spd(&xtx, &xty)?;

        self.intercept = y_mean - coefficients.dot(&x_mean);
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(ForgeError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(ForgeError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept)
    }
}

/// Logistic regression (sigmoid for two classes, multinomial softmax otherwise)
///
/// Features are standardized internally; weights are fitted by full-batch
/// gradient descent with an L2 penalty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Weights, one column per score (1 column for binary)
    weights: Option<Array2<f64>>,
    intercepts: Array1<f64>,
    scaler: Option<StandardScaler>,
    classes: Vec<f64>,
    /// Regularization strength (L2), scaled by 1/n
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Stop when the gradient norm falls below this
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            weights: None,
            intercepts: Array1::zeros(0),
            scaler: None,
            classes: Vec::new(),
            alpha: 1.0,
            max_iter: 200,
            tol: 1e-6,
            learning_rate: 0.5,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }

    fn link(&self, scores: &mut Array2<f64>) {
        if scores.ncols() == 1 {
            scores.mapv_inplace(Self::sigmoid);
        } else {
            for mut row in scores.rows_mut() {
                let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
                row.mapv_inplace(|v| (v - max).exp());
                let sum = row.sum();
                row.mapv_inplace(|v| v / sum);
            }
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(ForgeError::target_length(n_samples, y.len()));
        }

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        if classes.len() < 2 {
            return Err(ForgeError::InsufficientClassSamples(
                "logistic regression needs at least 2 distinct classes".to_string(),
            ));
        }

        let (scaler, xs) = StandardScaler::fit_transform(x)?;
        let n_columns = if classes.len() == 2 { 1 } else { classes.len() };
        let targets = Array2::from_shape_fn((n_samples, n_columns), |(i, k)| {
            let class = if n_columns == 1 { classes[1] } else { classes[k] };
            if y[i] == class { 1.0 } else { 0.0 }
        });

        let n = n_samples as f64;
        let penalty = self.alpha / n;
        let mut weights = Array2::<f64>::zeros((x.ncols(), n_columns));
        let mut intercepts = Array1::<f64>::zeros(n_columns);

        for _ in 0..self.max_iter {
            let mut probs = xs.dot(&weights) + &intercepts;
            self.link(&mut probs);

            let errors = probs - &targets;
            let grad_w = xs.t().dot(&errors) / n + &weights * penalty;
            let grad_b = errors.sum_axis(Axis(0)) / n;

            let grad_norm = (grad_w.mapv(|v| v * v).sum() + grad_b.mapv(|v| v * v).sum()).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights.scaled_add(-self.learning_rate, &grad_w);
            intercepts.scaled_add(-self.learning_rate, &grad_b);
        }

        self.weights = Some(weights);
        self.intercepts = intercepts;
        self.scaler = Some(scaler);
        self.classes = classes;
        Ok(self)
    }

    /// Class probabilities, columns in sorted class order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (weights, scaler) = match (&self.weights, &self.scaler) {
            (Some(w), Some(s)) => (w, s),
            _ => return Err(ForgeError::ModelNotFitted),
        };

        let xs = scaler.transform(x)?;
        let mut probs = xs.dot(weights) + &self.intercepts;
        self.link(&mut probs);

        if probs.ncols() == 1 {
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
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_linear_regression_recovers_plane() {
        // y = 2*x1 + 3*x2 + 1
        let x = array![[1.0, 1.0], [2.0, 1.0], [1.0, 2.0], [2.0, 2.0], [3.0, 1.0]];
        let y = array![6.0, 8.0, 9.0, 11.0, 10.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert_abs_diff_eq!(coef[0], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(coef[1], 3.0, epsilon = 1e-8);
        assert_abs_diff_eq!(model.intercept, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_linear_regression_collinear_features() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]];
        let y = array![3.0, 5.0, 7.0, 9.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[5.0, 10.0]]).unwrap();
        assert_abs_diff_eq!(pred[0], 11.0, epsilon = 1e-3);
    }

    #[test]
    fn test_linear_regression_unfitted() {
        let model = LinearRegression::new();
        assert!(matches!(model.predict(&array![[1.0]]), Err(ForgeError::ModelNotFitted)));
    }

    #[test]
    fn test_ridge_shrinks() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![2.0, 4.0, 6.0];

        let mut ols = LinearRegression::new();
        let mut ridge = LinearRegression::new().with_alpha(10.0);
        ols.fit(&x, &y).unwrap();
        ridge.fit(&x, &y).unwrap();

        let c_ols = ols.coefficients.as_ref().unwrap()[0];
        let c_ridge = ridge.coefficients.as_ref().unwrap()[0];
        assert!(c_ridge.abs() < c_ols.abs());
    }

    #[test]
    fn test_logistic_regression_binary() {
        let x = array![[1.0, 1.0], [1.5, 1.5], [2.0, 2.0], [5.0, 5.0], [5.5, 5.5], [6.0, 6.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&array![[0.0, 0.0], [10.0, 10.0]]).unwrap();
        assert!(proba[[0, 1]] < 0.5);
        assert!(proba[[1, 1]] > 0.5);
    }

    #[test]
    fn test_logistic_regression_multiclass() {
        let x = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(30, |i| (i / 10) as f64);

        let mut model = LogisticRegression::new().with_max_iter(500);
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[1.0], [28.0]]).unwrap();
        assert_eq!(pred.to_vec(), vec![0.0, 2.0]);

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 3);
        for row in proba.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
    }
}
