//! Algorithm registry
//!
//! A closed lookup table from `(TaskType, Algorithm)` to a constructor of an
//! untrained [`Model`]. Pairs missing from the table are unsupported; there is
//! no fallback model.

use super::config::{Algorithm, TaskType, TrainingConfig};
use super::gradient_boosting::{
    GradientBoostingClassifier, GradientBoostingConfig, GradientBoostingRegressor,
};
use super::knn::{KNNClassifier, KNNConfig, KNNRegressor};
use super::linear_models::{LinearRegression, LogisticRegression};
use super::models::Model;
use super::naive_bayes::GaussianNaiveBayes;
use super::random_forest::RandomForest;
use super::svm::{SVMClassifier, SVMConfig, SVMRegressor};
use crate::error::{ForgeError, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

type Constructor = fn(&TrainingConfig) -> Model;

/// Declared `(task, algorithm)` pairs in display order
const ENTRIES: &[(TaskType, Algorithm, Constructor)] = &[
    (TaskType::Classification, Algorithm::RandomForest, random_forest_classifier),
    (TaskType::Classification, Algorithm::GradientBoosting, gradient_boosting_classifier),
    (TaskType::Classification, Algorithm::LogisticRegression, logistic_regression),
    (TaskType::Classification, Algorithm::Knn, knn_classifier),
    (TaskType::Classification, Algorithm::Svm, svm_classifier),
    (TaskType::Classification, Algorithm::NaiveBayes, naive_bayes),
    (TaskType::Regression, Algorithm::RandomForest, random_forest_regressor),
    (TaskType::Regression, Algorithm::GradientBoosting, gradient_boosting_regressor),
    (TaskType::Regression, Algorithm::LinearRegression, linear_regression),
    (TaskType::Regression, Algorithm::Knn, knn_regressor),
    (TaskType::Regression, Algorithm::Svm, svm_regressor),
];

fn random_forest_classifier(config: &TrainingConfig) -> Model {
    Model::RandomForestClassifier(
        RandomForest::new_classifier(config.n_estimators)
            .with_max_depth(config.max_depth)
            .with_random_state(config.random_state),
    )
}

fn random_forest_regressor(config: &TrainingConfig) -> Model {
    Model::RandomForestRegressor(
        RandomForest::new_regressor(config.n_estimators)
            .with_max_depth(config.max_depth)
            .with_random_state(config.random_state),
    )
}

fn boosting_config(config: &TrainingConfig) -> GradientBoostingConfig {
    GradientBoostingConfig {
        n_estimators: config.n_estimators,
        learning_rate: config.learning_rate,
        max_depth: config.gb_max_depth,
        subsample: config.subsample,
        random_state: config.random_state,
        ..Default::default()
    }
}

fn gradient_boosting_classifier(config: &TrainingConfig) -> Model {
    Model::GradientBoostingClassifier(GradientBoostingClassifier::new(boosting_config(config)))
}

fn gradient_boosting_regressor(config: &TrainingConfig) -> Model {
    Model::GradientBoostingRegressor(GradientBoostingRegressor::new(boosting_config(config)))
}

fn logistic_regression(config: &TrainingConfig) -> Model {
    Model::LogisticRegression(LogisticRegression::new().with_max_iter(config.max_iter))
}

fn linear_regression(_config: &TrainingConfig) -> Model {
    Model::LinearRegression(LinearRegression::new())
}

fn knn_config(config: &TrainingConfig) -> KNNConfig {
    KNNConfig {
        n_neighbors: config.n_neighbors.max(1),
        ..Default::default()
    }
}

fn knn_classifier(config: &TrainingConfig) -> Model {
    Model::KNNClassifier(KNNClassifier::new(knn_config(config)))
}

fn knn_regressor(config: &TrainingConfig) -> Model {
    Model::KNNRegressor(KNNRegressor::new(knn_config(config)))
}

fn svm_config(config: &TrainingConfig) -> SVMConfig {
    SVMConfig {
        c: config.svm_c,
        random_state: config.random_state,
        ..Default::default()
    }
}

fn svm_classifier(config: &TrainingConfig) -> Model {
    Model::SVMClassifier(SVMClassifier::new(svm_config(config)))
}

fn svm_regressor(config: &TrainingConfig) -> Model {
    Model::SVMRegressor(SVMRegressor::new(svm_config(config)))
}

fn naive_bayes(config: &TrainingConfig) -> Model {
    Model::GaussianNaiveBayes(GaussianNaiveBayes::new().with_var_smoothing(config.var_smoothing))
}

/// Lookup table of supported `(task, algorithm)` pairs
#[derive(Debug)]
pub struct AlgorithmRegistry {
    constructors: HashMap<(TaskType, Algorithm), Constructor>,
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AlgorithmRegistry {
    /// Build the table. Panics in debug builds if a pair is declared twice.
    pub fn new() -> Self {
        let mut constructors = HashMap::with_capacity(ENTRIES.len());
        for &(task, algorithm, build) in ENTRIES {
            let previous = constructors.insert((task, algorithm), build);
            debug_assert!(
                previous.is_none(),
                "duplicate registry entry ({}, {})",
                task,
                algorithm
            );
        }
        Self { constructors }
    }

    /// Shared instance
    pub fn global() -> &'static Self {
        static REGISTRY: OnceLock<AlgorithmRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::new)
    }

    /// Algorithms declared for a task, in table order
    pub fn supported(&self, task: TaskType) -> Vec<Algorithm> {
        ENTRIES
            .iter()
            .filter(|(t, _, _)| *t == task)
            .map(|(_, alg, _)| *alg)
            .collect()
    }

    pub fn is_supported(&self, task: TaskType, algorithm: Algorithm) -> bool {
        self.constructors.contains_key(&(task, algorithm))
    }

    /// Every declared pair
    pub fn pairs(&self) -> Vec<(TaskType, Algorithm)> {
        ENTRIES.iter().map(|(t, a, _)| (*t, *a)).collect()
    }

    /// Resolve a case-insensitive algorithm name for a task into a fresh model
    pub fn resolve(&self, task: TaskType, name: &str, config: &TrainingConfig) -> Result<Model> {
        let unsupported = || ForgeError::UnsupportedAlgorithm {
            algorithm: name.trim().to_string(),
            task: task.to_string(),
            supported: self
                .supported(task)
                .iter()
                .map(|alg| alg.as_str().to_string())
                .collect(),
        };

        let algorithm = Algorithm::from_name(name).ok_or_else(unsupported)?;
        let build = self
            .constructors
            .get(&(task, algorithm))
            .ok_or_else(unsupported)?;
        Ok(build(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_matches_matrix() {
        let registry = AlgorithmRegistry::new();
        let declared: HashSet<_> = registry.pairs().into_iter().collect();

        let expected: HashSet<_> = [
            (TaskType::Classification, Algorithm::RandomForest),
            (TaskType::Classification, Algorithm::GradientBoosting),
            (TaskType::Classification, Algorithm::LogisticRegression),
            (TaskType::Classification, Algorithm::Knn),
            (TaskType::Classification, Algorithm::Svm),
            (TaskType::Classification, Algorithm::NaiveBayes),
            (TaskType::Regression, Algorithm::RandomForest),
            (TaskType::Regression, Algorithm::GradientBoosting),
            (TaskType::Regression, Algorithm::LinearRegression),
            (TaskType::Regression, Algorithm::Knn),
            (TaskType::Regression, Algorithm::Svm),
        ]
        .into_iter()
        .collect();

        assert_eq!(declared, expected);
        assert_eq!(registry.pairs().len(), expected.len());
    }

    #[test]
    fn test_resolve_builds_matching_task() {
        let registry = AlgorithmRegistry::new();
        let config = TrainingConfig::default();
        for (task, algorithm) in registry.pairs() {
            let model = registry.resolve(task, algorithm.as_str(), &config).unwrap();
            assert_eq!(model.task(), task, "{} for {}", algorithm, task);
            assert_eq!(model.algorithm(), algorithm);
        }
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let registry = AlgorithmRegistry::global();
        let model = registry
            .resolve(TaskType::Classification, "  Random_Forest ", &TrainingConfig::default())
            .unwrap();
        assert_eq!(model.name(), "RandomForestClassifier");
    }

    #[test]
    fn test_undeclared_pair_is_rejected() {
        let registry = AlgorithmRegistry::new();
        let err = registry
            .resolve(TaskType::Classification, "linear_regression", &TrainingConfig::default())
            .unwrap_err();

        match err {
            ForgeError::UnsupportedAlgorithm { algorithm, supported, .. } => {
                assert_eq!(algorithm, "linear_regression");
                assert!(supported.contains(&"logistic_regression".to_string()));
                assert!(!supported.contains(&"linear_regression".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(registry
            .resolve(TaskType::Regression, "naive_bayes", &TrainingConfig::default())
            .is_err());
        assert!(registry
            .resolve(TaskType::Regression, "deep_magic", &TrainingConfig::default())
            .is_err());
    }

    #[test]
    fn test_supported_lists() {
        let registry = AlgorithmRegistry::new();
        assert_eq!(registry.supported(TaskType::Classification).len(), 6);
        assert_eq!(
            registry.supported(TaskType::Regression),
            vec![
                Algorithm::RandomForest,
                Algorithm::GradientBoosting,
                Algorithm::LinearRegression,
                Algorithm::Knn,
                Algorithm::Svm,
            ]
        );
        assert!(!registry.is_supported(TaskType::Regression, Algorithm::LogisticRegression));
    }
}
