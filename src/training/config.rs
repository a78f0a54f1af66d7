//! Training configuration

use crate::error::ForgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of ML task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Predict a discrete label
    Classification,
    /// Predict a continuous value
    Regression,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Classification => "classification",
            TaskType::Regression => "regression",
        }
    }

    /// Name of the primary score reported for this task
    pub fn metric_name(&self) -> &'static str {
        match self {
            TaskType::Classification => "accuracy",
            TaskType::Regression => "r2",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classification" => Ok(TaskType::Classification),
            "regression" => Ok(TaskType::Regression),
            _ => Err(ForgeError::InvalidTask(s.to_string())),
        }
    }
}

/// Algorithm family selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    RandomForest,
    GradientBoosting,
    LogisticRegression,
    LinearRegression,
    Knn,
    Svm,
    NaiveBayes,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::RandomForest,
        Algorithm::GradientBoosting,
        Algorithm::LogisticRegression,
        Algorithm::LinearRegression,
        Algorithm::Knn,
        Algorithm::Svm,
        Algorithm::NaiveBayes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RandomForest => "random_forest",
            Algorithm::GradientBoosting => "gradient_boosting",
            Algorithm::LogisticRegression => "logistic_regression",
            Algorithm::LinearRegression => "linear_regression",
            Algorithm::Knn => "knn",
            Algorithm::Svm => "svm",
            Algorithm::NaiveBayes => "naive_bayes",
        }
    }

    /// Case-insensitive lookup, surrounding whitespace ignored
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|alg| alg.as_str() == wanted)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for model training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation
    pub validation_split: f64,

    /// Seed for the split and for model-internal randomness
    pub random_state: u64,

    // Tree ensembles
    /// Number of trees (forest) or boosting rounds
    pub n_estimators: usize,

    /// Maximum depth of forest trees (None = grow until pure)
    pub max_depth: Option<usize>,

    /// Learning rate (for boosting)
    pub learning_rate: f64,

    /// Depth of each boosted tree
    pub gb_max_depth: usize,

    /// Row subsample ratio per boosting round
    pub subsample: f64,

    // Linear / distance / kernel / probabilistic
    /// Iteration cap for logistic regression
    pub max_iter: usize,

    /// Number of neighbours for knn
    pub n_neighbors: usize,

    /// SVM regularization parameter
    pub svm_c: f64,

    /// Portion of the largest feature variance added to every variance (naive Bayes)
    pub var_smoothing: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            validation_split: 0.2,
            random_state: 42,
            n_estimators: 100,
            max_depth: None,
            learning_rate: 0.1,
            gb_max_depth: 3,
            subsample: 1.0,
            max_iter: 200,
            n_neighbors: 5,
            svm_c: 1.0,
            var_smoothing: 1e-9,
        }
    }
}

impl TrainingConfig {
    /// Builder method to set the held-out fraction
    pub fn with_validation_split(mut self, split: f64) -> Self {
        self.validation_split = split;
        self
    }

    /// Builder method to set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set number of estimators
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set max depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Builder method to set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_gb_max_depth(mut self, depth: usize) -> Self {
        self.gb_max_depth = depth;
        self
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_n_neighbors(mut self, k: usize) -> Self {
        self.n_neighbors = k;
        self
    }

    pub fn with_svm_c(mut self, c: f64) -> Self {
        self.svm_c = c;
        self
    }

    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }
}
