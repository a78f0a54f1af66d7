//! Evaluation metrics for the held-out split

use super::config::TaskType;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics computed on the held-out test subset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy (classification)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Macro-averaged precision (classification)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
    /// Macro-averaged recall (classification)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recall: Option<f64>,
    /// Macro-averaged F1 score (classification)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f1_score: Option<f64>,
    /// Mean Squared Error (regression)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mse: Option<f64>,
    /// Root Mean Squared Error (regression)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmse: Option<f64>,
    /// Mean Absolute Error (regression)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mae: Option<f64>,
    /// R-squared (regression)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r2: Option<f64>,
    /// Rows used for fitting
    pub n_train: usize,
    /// Rows used for scoring
    pub n_test: usize,
    /// Wall time spent fitting, in seconds
    pub training_time_secs: f64,
}

impl ModelMetrics {
    /// Accuracy plus macro precision/recall/F1 over the classes seen in either vector
    pub fn compute_classification(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len();
        let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
        let accuracy = if n > 0 { correct as f64 / n as f64 } else { 0.0 };

        let mut classes: Vec<f64> = y_true.iter().chain(y_pred.iter()).copied().collect();
        classes.sort_by(f64::total_cmp);
        classes.dedup();

        let mut precision_sum = 0.0;
        let mut recall_sum = 0.0;
        let mut f1_sum = 0.0;
        for &class in &classes {
            let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
            for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                match (t == class, p == class) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            precision_sum += precision;
            recall_sum += recall;
            f1_sum += if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
        }

        let k = classes.len().max(1) as f64;
        Self {
            accuracy: Some(accuracy),
            precision: Some(precision_sum / k),
            recall: Some(recall_sum / k),
            f1_score: Some(f1_sum / k),
            n_test: n,
            ..Default::default()
        }
    }

    /// MSE, RMSE, MAE and R² (0 when the targets have no variance)
    pub fn compute_regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len().max(1) as f64;
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae: f64 = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean: f64 = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Self {
            mse: Some(mse),
            rmse: Some(mse.sqrt()),
            mae: Some(mae),
            r2: Some(r2),
            n_test: y_true.len(),
            ..Default::default()
        }
    }

    /// Primary score for the task: accuracy or R²
    pub fn primary(&self, task: TaskType) -> f64 {
        match task {
            TaskType::Classification => self.accuracy,
            TaskType::Regression => self.r2,
        }
        .unwrap_or(0.0)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}
