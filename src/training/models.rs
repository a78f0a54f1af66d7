//! Closed set of estimators the registry can construct

use super::config::{Algorithm, TaskType};
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingRegressor};
use super::knn::{KNNClassifier, KNNRegressor};
use super::linear_models::{LinearRegression, LogisticRegression};
use super::naive_bayes::GaussianNaiveBayes;
use super::random_forest::RandomForest;
use super::svm::{SVMClassifier, SVMRegressor};
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A constructed estimator, untrained until [`Model::fit`] succeeds.
///
/// Classifiers take class values as `f64` (integral codes) and predict one of the
/// values seen during fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    RandomForestClassifier(RandomForest),
    RandomForestRegressor(RandomForest),
    GradientBoostingClassifier(GradientBoostingClassifier),
    GradientBoostingRegressor(GradientBoostingRegressor),
    LogisticRegression(LogisticRegression),
    LinearRegression(LinearRegression),
    KNNClassifier(KNNClassifier),
    KNNRegressor(KNNRegressor),
    SVMClassifier(SVMClassifier),
    SVMRegressor(SVMRegressor),
    GaussianNaiveBayes(GaussianNaiveBayes),
}

impl Model {
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Model::RandomForestClassifier(m) | Model::RandomForestRegressor(m) => {
                m.fit(x, y)?;
            }
            Model::GradientBoostingClassifier(m) => m.fit(x, y)?,
            Model::GradientBoostingRegressor(m) => m.fit(x, y)?,
            Model::LogisticRegression(m) => {
                m.fit(x, y)?;
            }
            Model::LinearRegression(m) => {
                m.fit(x, y)?;
            }
            Model::KNNClassifier(m) => m.fit(x, y)?,
            Model::KNNRegressor(m) => m.fit(x, y)?,
            Model::SVMClassifier(m) => m.fit(x, y)?,
            Model::SVMRegressor(m) => m.fit(x, y)?,
            Model::GaussianNaiveBayes(m) => m.fit(x, y)?,
        }
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Model::RandomForestClassifier(m) | Model::RandomForestRegressor(m) => m.predict(x),
            Model::GradientBoostingClassifier(m) => m.predict(x),
            Model::GradientBoostingRegressor(m) => m.predict(x),
            Model::LogisticRegression(m) => m.predict(x),
            Model::LinearRegression(m) => m.predict(x),
            Model::KNNClassifier(m) => m.predict(x),
            Model::KNNRegressor(m) => m.predict(x),
            Model::SVMClassifier(m) => m.predict(x),
            Model::SVMRegressor(m) => m.predict(x),
            Model::GaussianNaiveBayes(m) => m.predict(x),
        }
    }

    /// Human-readable estimator name
    pub fn name(&self) -> &'static str {
        match self {
            Model::RandomForestClassifier(_) => "RandomForestClassifier",
            Model::RandomForestRegressor(_) => "RandomForestRegressor",
            Model::GradientBoostingClassifier(_) => "GradientBoostingClassifier",
            Model::GradientBoostingRegressor(_) => "GradientBoostingRegressor",
            Model::LogisticRegression(_) => "LogisticRegression",
            Model::LinearRegression(_) => "LinearRegression",
            Model::KNNClassifier(_) => "KNeighborsClassifier",
            Model::KNNRegressor(_) => "KNeighborsRegressor",
            Model::SVMClassifier(_) => "SVC",
            Model::SVMRegressor(_) => "SVR",
            Model::GaussianNaiveBayes(_) => "GaussianNB",
        }
    }

    /// Registry name of the estimator's family
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Model::RandomForestClassifier(_) | Model::RandomForestRegressor(_) => Algorithm::RandomForest,
            Model::GradientBoostingClassifier(_) | Model::GradientBoostingRegressor(_) => {
                Algorithm::GradientBoosting
            }
            Model::LogisticRegression(_) => Algorithm::LogisticRegression,
            Model::LinearRegression(_) => Algorithm::LinearRegression,
            Model::KNNClassifier(_) | Model::KNNRegressor(_) => Algorithm::Knn,
            Model::SVMClassifier(_) | Model::SVMRegressor(_) => Algorithm::Svm,
            Model::GaussianNaiveBayes(_) => Algorithm::NaiveBayes,
        }
    }

    /// Task this estimator solves
    pub fn task(&self) -> TaskType {
        match self {
            Model::RandomForestClassifier(_)
            | Model::GradientBoostingClassifier(_)
            | Model::LogisticRegression(_)
            | Model::KNNClassifier(_)
            | Model::SVMClassifier(_)
            | Model::GaussianNaiveBayes(_) => TaskType::Classification,
            Model::RandomForestRegressor(_)
            | Model::GradientBoostingRegressor(_)
            | Model::LinearRegression(_)
            | Model::KNNRegressor(_)
            | Model::SVMRegressor(_) => TaskType::Regression,
        }
    }
}
