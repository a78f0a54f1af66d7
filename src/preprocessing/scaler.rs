//! Feature standardization for the scale-sensitive estimators

use crate::error::{ForgeError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Z-score scaler over matrix columns: (x - mean) / std.
///
/// Constant columns keep a scale of 1 so they map to zero instead of NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(ForgeError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }

        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ForgeError::ComputationError("empty matrix".to_string()))?;
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });

        Ok(Self { means, scales })
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.means.len() {
            return Err(ForgeError::ShapeError {
                expected: format!("{} columns", self.means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok((x - &self.means) / &self.scales)
    }

    pub fn fit_transform(x: &Array2<f64>) -> Result<(Self, Array2<f64>)> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }
}

/// Mean/std standardization of a target vector
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetScaler {
    mean: f64,
    scale: f64,
}

impl TargetScaler {
    pub fn fit(y: &Array1<f64>) -> Self {
        let mean = y.mean().unwrap_or(0.0);
        let std = y.std(0.0);
        Self {
            mean,
            scale: if std > 1e-12 { std } else { 1.0 },
        }
    }

    pub fn transform(&self, y: &Array1<f64>) -> Array1<f64> {
        y.mapv(|v| (v - self.mean) / self.scale)
    }

    pub fn inverse(&self, y: &Array1<f64>) -> Array1<f64> {
        y.mapv(|v| v * self.scale + self.mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&x).unwrap();

        let col_mean = scaled.column(0).mean().unwrap();
        assert_abs_diff_eq!(col_mean, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scaled.column(0).std(0.0), 1.0, epsilon = 1e-12);
        // Constant column maps to zero
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));

        let other = array![[2.0, 10.0]];
        let t = scaler.transform(&other).unwrap();
        assert_abs_diff_eq!(t[[0, 0]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_column_mismatch() {
        let scaler = StandardScaler::fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_target_scaler_inverse() {
        let y = array![100.0, 200.0, 300.0];
        let scaler = TargetScaler::fit(&y);
        let back = scaler.inverse(&scaler.transform(&y));
        for (a, b) in back.iter().zip(y.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }
}
