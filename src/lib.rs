//! ModelForge - train a model on tabular data, then predict single rows
//!
//! The core is a training/prediction session:
//! - [`training::registry`] - declarative `(task, algorithm)` to estimator table
//! - [`training::session`] - split, fit, score, and the immutable artifact that
//!   `predict` consumes
//!
//! Around it:
//! - [`training`] - native estimators over `ndarray` (trees, forests, boosting,
//!   linear models, k-NN, SVM, naive Bayes) and metrics
//! - [`preprocessing`] - label encoding and standardization
//! - [`utils`] - CSV loading and frame to matrix conversion
//! - [`server`] - HTTP API (upload, train, predict)
//! - [`cli`] - command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod utils;

// Services
pub mod cli;
pub mod server;

pub use error::{ForgeError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ForgeError, Result};
    pub use crate::preprocessing::LabelEncoder;
    pub use crate::training::{
        predict, train, train_with_config, Algorithm, AlgorithmRegistry, ModelMetrics,
        PredictionValue, Session, TaskType, TrainedArtifact, TrainingConfig, TrainingRequest,
    };
    pub use crate::utils::DataLoader;
}
