//! Error types for ModelForge

use thiserror::Error;

/// Result type alias for ModelForge operations
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Main error type for training and prediction
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Invalid task '{0}': expected 'classification' or 'regression'")]
    InvalidTask(String),

    #[error("Unsupported algorithm '{algorithm}' for {task}; supported: {}", .supported.join(", "))]
    UnsupportedAlgorithm {
        algorithm: String,
        task: String,
        supported: Vec<String>,
    },

    #[error("Column '{0}' not found in dataset")]
    UnknownColumn(String),

    #[error("Insufficient class samples: {0}")]
    InsufficientClassSamples(String),

    #[error("Model not trained yet")]
    ModelNotTrained,

    #[error("Expected {expected} feature values, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("Invalid input format: {0}")]
    InvalidInputFormat(String),

    #[error("Dataset has no feature columns besides target '{0}'")]
    NoFeatures(String),

    #[error("Feature column '{column}' is not numeric (dtype {dtype})")]
    NonNumericFeature { column: String, dtype: String },

    #[error("Column '{column}' contains {count} missing values")]
    MissingValues { column: String, count: usize },

    #[error("Column '{column}' contains {count} non-finite values (NaN or infinity)")]
    NonFiniteValues { column: String, count: usize },

    #[error("Classification target '{0}' has non-integral numeric values; use the regression task")]
    ContinuousTarget(String),

    #[error("Insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Feature value at position {position} is not finite: {value}")]
    InvalidFeatureValue { position: usize, value: f64 },

    #[error("Model produced class code {0} outside the label encoding")]
    UnknownClassCode(i64),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Data error: {0}")]
    DataError(#[from] polars::error::PolarsError),
}

impl ForgeError {
    /// Stable snake_case name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ForgeError::InvalidTask(_) => "invalid_task",
            ForgeError::UnsupportedAlgorithm { .. } => "unsupported_algorithm",
            ForgeError::UnknownColumn(_) => "unknown_column",
            ForgeError::InsufficientClassSamples(_) => "insufficient_class_samples",
            ForgeError::ModelNotTrained => "model_not_trained",
            ForgeError::FeatureCountMismatch { .. } => "feature_count_mismatch",
            ForgeError::InvalidInputFormat(_) => "invalid_input_format",
            ForgeError::NoFeatures(_) => "no_features",
            ForgeError::NonNumericFeature { .. } => "non_numeric_feature",
            ForgeError::MissingValues { .. } => "missing_values",
            ForgeError::NonFiniteValues { .. } => "non_finite_values",
            ForgeError::ContinuousTarget(_) => "continuous_target",
            ForgeError::InsufficientSamples { .. } => "insufficient_samples",
            ForgeError::InvalidFeatureValue { .. } => "invalid_feature_value",
            ForgeError::UnknownClassCode(_) => "unknown_class_code",
            ForgeError::ShapeError { .. } => "shape_error",
            ForgeError::ModelNotFitted => "model_not_fitted",
            ForgeError::ComputationError(_) => "computation_error",
            ForgeError::DataError(_) => "data_error",
        }
    }

    /// Shape mismatch between a feature matrix and its target vector
    pub(crate) fn target_length(n_rows: usize, n_targets: usize) -> Self {
        ForgeError::ShapeError {
            expected: format!("y length = {}", n_rows),
            actual: format!("y length = {}", n_targets),
        }
    }
}

impl From<ndarray::ShapeError> for ForgeError {
    fn from(err: ndarray::ShapeError) -> Self {
        ForgeError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
