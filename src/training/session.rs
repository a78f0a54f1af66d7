//! Training/prediction session
//!
//! [`train`] turns a dataset into an immutable [`TrainedArtifact`] that records
//! the fitted model, the ordered feature schema and (for string targets) the
//! label encoding. [`predict`] rebuilds a single row against that schema and
//! decodes the model output. [`Session`] holds the single active artifact.

use super::config::{Algorithm, TaskType, TrainingConfig};
use super::metrics::ModelMetrics;
use super::models::Model;
use super::registry::AlgorithmRegistry;
use super::split::train_test_split;
use crate::error::{ForgeError, Result};
use crate::preprocessing::LabelEncoder;
use crate::utils::data_loader::{column_names, column_to_vec, columns_to_array2, is_numeric, single_row_frame};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use parking_lot::{Mutex, RwLock};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Parameters of one training call, as received from a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub target_column: String,
    pub algorithm: String,
    pub task: String,
}

impl TrainingRequest {
    pub fn new(
        target_column: impl Into<String>,
        algorithm: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            target_column: target_column.into(),
            algorithm: algorithm.into(),
            task: task.into(),
        }
    }

    /// Parsed task, case-insensitive
    pub fn task_type(&self) -> Result<TaskType> {
        self.task.parse()
    }
}

/// Result of one successful training call. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArtifact {
    model: Model,
    feature_schema: Vec<String>,
    task: TaskType,
    algorithm: Algorithm,
    label_encoder: Option<LabelEncoder>,
    metrics: ModelMetrics,
    trained_at: DateTime<Utc>,
}

impl TrainedArtifact {
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Feature column names in the order `predict` expects values
    pub fn feature_schema(&self) -> &[String] {
        &self.feature_schema
    }

    pub fn task(&self) -> TaskType {
        self.task
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Present only for classification on a non-numeric target
    pub fn label_encoder(&self) -> Option<&LabelEncoder> {
        self.label_encoder.as_ref()
    }

    pub fn metrics(&self) -> &ModelMetrics {
        &self.metrics
    }

    /// Accuracy (classification) or R² (regression) on the held-out rows
    pub fn score(&self) -> f64 {
        self.metrics.primary(self.task)
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

/// Output of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionValue {
    /// Decoded class label
    Label(String),
    /// Class value of a numeric classification target
    Class(i64),
    /// Regression output
    Value(f64),
}

impl fmt::Display for PredictionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionValue::Label(label) => f.write_str(label),
            PredictionValue::Class(class) => write!(f, "{}", class),
            PredictionValue::Value(value) => write!(f, "{}", value),
        }
    }
}

/// Train with default hyperparameters. Returns the artifact and its score.
pub fn train(
    dataset: &DataFrame,
    target_column: &str,
    algorithm: &str,
    task: TaskType,
) -> Result<(TrainedArtifact, f64)> {
    train_with_config(dataset, target_column, algorithm, task, &TrainingConfig::default())
}

/// Validate, split, fit and score one model
pub fn train_with_config(
    dataset: &DataFrame,
    target_column: &str,
    algorithm: &str,
    task: TaskType,
    config: &TrainingConfig,
) -> Result<(TrainedArtifact, f64)> {
    let start = Instant::now();

    let target = dataset
        .column(target_column)
        .map_err(|_| ForgeError::UnknownColumn(target_column.to_string()))?;
    let nulls = target.null_count();
    if nulls > 0 {
        return Err(ForgeError::MissingValues {
            column: target_column.to_string(),
            count: nulls,
        });
    }

    let feature_schema: Vec<String> = column_names(dataset)
        .into_iter()
        .filter(|name| name != target_column)
        .collect();
    if feature_schema.is_empty() {
        return Err(ForgeError::NoFeatures(target_column.to_string()));
    }

    info!(
        algorithm = %algorithm.trim(),
        task = %task,
        rows = dataset.height(),
        features = feature_schema.len(),
        "Training started"
    );

    let x = columns_to_array2(dataset, &feature_schema)?;
    let (y, label_encoder) = match task {
        TaskType::Classification => classification_target(target_column, target)?,
        TaskType::Regression => (regression_target(target_column, target)?, None),
    };

    let split = train_test_split(&y, task, config.validation_split, config.random_state)?;
    let (x_train, x_test, y_train, y_test) = split.apply(&x, &y);
    debug!(train = x_train.nrows(), test = x_test.nrows(), "Split dataset");

    let mut model = AlgorithmRegistry::global().resolve(task, algorithm, config)?;
    let algorithm = model.algorithm();
    debug!(estimator = model.name(), "Resolved estimator");

    let fit_start = Instant::now();
    model.fit(&x_train, &y_train)?;
    let fit_secs = fit_start.elapsed().as_secs_f64();

    let y_pred = model.predict(&x_test)?;
    let mut metrics = match task {
        TaskType::Classification => ModelMetrics::compute_classification(&y_test, &y_pred),
        TaskType::Regression => ModelMetrics::compute_regression(&y_test, &y_pred),
    };
    metrics.n_train = x_train.nrows();
    metrics.training_time_secs = fit_secs;
    let score = metrics.primary(task);
    if !score.is_finite() {
        return Err(ForgeError::ComputationError(format!(
            "{} produced a non-finite {} on the held-out split",
            algorithm,
            task.metric_name()
        )));
    }

    info!(
        algorithm = %algorithm,
        task = %task,
        metric = task.metric_name(),
        score,
        elapsed = ?start.elapsed(),
        "Training finished"
    );

    let artifact = TrainedArtifact {
        model,
        feature_schema,
        task,
        algorithm,
        label_encoder,
        metrics,
        trained_at: Utc::now(),
    };
    Ok((artifact, score))
}

/// Encode a classification target; string-like and boolean columns get a
/// [`LabelEncoder`] so predictions come back as the original labels
fn classification_target(name: &str, column: &Column) -> Result<(Array1<f64>, Option<LabelEncoder>)> {
    let (y, encoder) = if is_numeric(column.dtype()) && !matches!(column.dtype(), DataType::Boolean) {
        let values = column_to_vec(name, column)?;
        if values.iter().any(|v| !v.is_finite() || v.fract() != 0.0) {
            return Err(ForgeError::ContinuousTarget(name.to_string()));
        }
        (Array1::from_vec(values), None)
    } else {
        let labels = column.cast(&DataType::String)?;
        let series = labels.as_materialized_series();
        let encoder = LabelEncoder::fit(series)?;
        (encoder.transform(series)?, Some(encoder))
    };

    let mut distinct = y.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    if distinct.len() < 2 {
        return Err(ForgeError::InsufficientClassSamples(format!(
            "target '{}' has {} distinct class(es); at least 2 are required",
            name,
            distinct.len()
        )));
    }
    Ok((y, encoder))
}

fn regression_target(name: &str, column: &Column) -> Result<Array1<f64>> {
    if !is_numeric(column.dtype()) {
        return Err(ForgeError::InvalidInputFormat(format!(
            "regression target '{}' must be numeric, found {}",
            name,
            column.dtype()
        )));
    }
    Ok(Array1::from_vec(column_to_vec(name, column)?))
}

/// Predict one row of raw feature values, positional against the artifact's schema
pub fn predict(artifact: &TrainedArtifact, values: &[f64]) -> Result<PredictionValue> {
    let schema = &artifact.feature_schema;
    if values.len() != schema.len() {
        return Err(ForgeError::FeatureCountMismatch {
            expected: schema.len(),
            actual: values.len(),
        });
    }
    if let Some((position, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(ForgeError::InvalidFeatureValue { position, value });
    }

    let row = single_row_frame(schema, values)?;
    let x = columns_to_array2(&row, schema)?;
    let output = artifact
        .model
        .predict(&x)?
        .first()
        .copied()
        .ok_or_else(|| ForgeError::ComputationError("model returned no prediction".to_string()))?;
    if !output.is_finite() {
        return Err(ForgeError::ComputationError(format!("model returned a non-finite prediction: {}", output)));
    }

    Ok(match artifact.task {
        TaskType::Regression => PredictionValue::Value(output),
        TaskType::Classification => {
            let class = output.round() as i64;
            match &artifact.label_encoder {
                Some(encoder) => PredictionValue::Label(encoder.decode(class)?.to_string()),
                None => PredictionValue::Class(class),
            }
        }
    })
}

/// Holder of the single active artifact.
///
/// Trains are serialized; the artifact is replaced by one pointer swap so a
/// concurrent `predict` sees either the previous or the new artifact. A failed
/// train leaves the current artifact in place.
#[derive(Debug, Default)]
pub struct Session {
    config: TrainingConfig,
    train_lock: Mutex<()>,
    artifact: RwLock<Option<Arc<TrainedArtifact>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrainingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train and publish a new artifact
    pub fn train(
        &self,
        dataset: &DataFrame,
        target_column: &str,
        algorithm: &str,
        task: TaskType,
    ) -> Result<Arc<TrainedArtifact>> {
        let _guard = self.train_lock.lock();
        let (artifact, _) = train_with_config(dataset, target_column, algorithm, task, &self.config)?;
        let artifact = Arc::new(artifact);
        *self.artifact.write() = Some(Arc::clone(&artifact));
        Ok(artifact)
    }

    /// Train from string-typed request fields
    pub fn train_request(&self, dataset: &DataFrame, request: &TrainingRequest) -> Result<Arc<TrainedArtifact>> {
        let task = request.task_type()?;
        self.train(dataset, &request.target_column, &request.algorithm, task)
    }

    /// Predict with the active artifact
    pub fn predict(&self, values: &[f64]) -> Result<PredictionValue> {
        let artifact = self.artifact().ok_or(ForgeError::ModelNotTrained)?;
        predict(&artifact, values)
    }

    /// Current artifact, if any train has succeeded
    pub fn artifact(&self) -> Option<Arc<TrainedArtifact>> {
        self.artifact.read().clone()
    }

    pub fn is_trained(&self) -> bool {
        self.artifact.read().is_some()
    }
}
