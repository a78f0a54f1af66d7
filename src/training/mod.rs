//! Model training module
//!
//! Provides the training/prediction session and the estimators behind it:
//! - Algorithm registry keyed by task and algorithm name
//! - Stratified and shuffled train/test splits
//! - Decision trees and Random Forests
//! - Gradient boosting
//! - Linear and logistic regression
//! - K-Nearest Neighbors
//! - Support Vector Machines
//! - Gaussian Naive Bayes

mod config;
mod models;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod metrics;
pub mod naive_bayes;
pub mod random_forest;
pub mod registry;
pub mod session;
pub mod split;
pub mod svm;

pub use config::{Algorithm, TaskType, TrainingConfig};
pub use decision_tree::{DecisionTree, TreeKind, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig, GradientBoostingRegressor};
pub use knn::{KNNClassifier, KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::{LinearRegression, LogisticRegression};
pub use metrics::ModelMetrics;
pub use models::Model;
pub use naive_bayes::GaussianNaiveBayes;
pub use random_forest::{MaxFeatures, RandomForest};
pub use registry::AlgorithmRegistry;
pub use session::{predict, train, train_with_config, PredictionValue, Session, TrainedArtifact, TrainingRequest};
pub use split::{shuffle_split, stratified_split, train_test_split, SplitIndices};
pub use svm::{KernelType, SVMClassifier, SVMConfig, SVMRegressor};
