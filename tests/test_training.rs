//! Integration test: every registered algorithm end-to-end

use modelforge::training::{
    train, train_with_config, Algorithm, AlgorithmRegistry, PredictionValue, TaskType,
    TrainingConfig,
};
use modelforge::ForgeError;
use polars::prelude::*;

/// Two noisy, well separated blobs; 60 rows, string labels
fn classification_df() -> DataFrame {
    let n = 60;
    let f1: Vec<f64> = (0..n)
        .map(|i| {
            let noise = ((i * 37) % 11) as f64 * 0.1;
            if i % 2 == 0 { 1.0 + noise } else { 6.0 + noise }
        })
        .collect();
    let f2: Vec<f64> = (0..n)
        .map(|i| {
            let noise = ((i * 17) % 7) as f64 * 0.2;
            if i % 2 == 0 { 5.0 - noise } else { 0.5 + noise }
        })
        .collect();
    let label: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "cat" } else { "dog" }).collect();

    df!("f1" => f1, "f2" => f2, "label" => label).unwrap()
}

/// Three classes with integer codes 1, 2, 3
fn multiclass_df() -> DataFrame {
    let n = 90;
    let x: Vec<f64> = (0..n).map(|i| (i % 3) as f64 * 5.0 + ((i * 13) % 10) as f64 * 0.1).collect();
    let y: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64 * 0.3).collect();
    let class: Vec<i64> = (0..n).map(|i| (i % 3) as i64 + 1).collect();

    df!("x" => x, "y" => y, "class" => class).unwrap()
}

/// target = 3 * x1 - 2 * x2 + small deterministic noise
fn regression_df() -> DataFrame {
    let n = 50;
    let x1: Vec<f64> = (0..n).map(|i| i as f64 * 0.5).collect();
    let x2: Vec<f64> = (0..n).map(|i| ((i * 7) % 13) as f64).collect();
    let target: Vec<f64> = x1
        .iter()
        .zip(&x2)
        .enumerate()
        .map(|(i, (a, b))| 3.0 * a - 2.0 * b + ((i % 5) as f64 - 2.0) * 0.05)
        .collect();

    df!("x1" => x1, "x2" => x2, "target" => target).unwrap()
}

#[test]
fn test_every_classification_algorithm_trains() {
    let df = classification_df();
    for algorithm in AlgorithmRegistry::global().supported(TaskType::Classification) {
        let result = train(&df, "label", algorithm.as_str(), TaskType::Classification);
        let (artifact, score) = result.unwrap_or_else(|e| panic!("{} failed: {}", algorithm, e));

        assert!((0.0..=1.0).contains(&score), "{} accuracy {}", algorithm, score);
        assert_eq!(artifact.algorithm(), algorithm);

        let prediction = modelforge::training::predict(&artifact, &[1.2, 4.8]).unwrap();
        assert!(
            matches!(&prediction, PredictionValue::Label(l) if l == "cat" || l == "dog"),
            "{} predicted {:?}",
            algorithm,
            prediction
        );
    }
}

#[test]
fn test_every_regression_algorithm_trains() {
    let df = regression_df();
    for algorithm in AlgorithmRegistry::global().supported(TaskType::Regression) {
        let result = train(&df, "target", algorithm.as_str(), TaskType::Regression);
        let (artifact, score) = result.unwrap_or_else(|e| panic!("{} failed: {}", algorithm, e));

        assert!(score.is_finite(), "{} r2 {}", algorithm, score);
        assert!(artifact.label_encoder().is_none());

        match modelforge::training::predict(&artifact, &[10.0, 3.0]).unwrap() {
            PredictionValue::Value(v) => assert!(v.is_finite()),
            other => panic!("{} returned {:?}", algorithm, other),
        }
    }
}

#[test]
fn test_separable_blobs_score_well() {
    let df = classification_df();
    for algorithm in ["random_forest", "logistic_regression", "knn", "naive_bayes"] {
        let (_, score) = train(&df, "label", algorithm, TaskType::Classification).unwrap();
        assert!(score >= 0.9, "{} accuracy {}", algorithm, score);
    }
}

#[test]
fn test_linear_regression_fits_linear_target() {
    let (artifact, score) = train(&regression_df(), "target", "linear_regression", TaskType::Regression).unwrap();
    assert!(score > 0.99, "r2 {}", score);
    assert_eq!(artifact.feature_schema(), &["x1", "x2"]);
}

#[test]
fn test_multiclass_numeric_classes() {
    let df = multiclass_df();
    for algorithm in ["random_forest", "gradient_boosting", "logistic_regression", "svm", "naive_bayes"] {
        let (artifact, score) = train(&df, "class", algorithm, TaskType::Classification).unwrap();
        assert!((0.0..=1.0).contains(&score));

        match modelforge::training::predict(&artifact, &[10.2, 0.3]).unwrap() {
            PredictionValue::Class(c) => assert!((1..=3).contains(&c), "{} class {}", algorithm, c),
            other => panic!("{} returned {:?}", algorithm, other),
        }
    }
}

#[test]
fn test_algorithm_names_are_case_insensitive() {
    let (artifact, _) = train(&classification_df(), "label", " KNN ", TaskType::Classification).unwrap();
    assert_eq!(artifact.algorithm(), Algorithm::Knn);
}

#[test]
fn test_unsupported_pairs() {
    let err = train(&classification_df(), "label", "linear_regression", TaskType::Classification).unwrap_err();
    assert!(matches!(err, ForgeError::UnsupportedAlgorithm { .. }));

    let err = train(&regression_df(), "target", "naive_bayes", TaskType::Regression).unwrap_err();
    assert!(matches!(err, ForgeError::UnsupportedAlgorithm { .. }));

    let err = train(&regression_df(), "target", "xgboost", TaskType::Regression).unwrap_err();
    assert_eq!(err.kind(), "unsupported_algorithm");
}

#[test]
fn test_invalid_task_string() {
    let err = "clustering".parse::<TaskType>().unwrap_err();
    assert!(matches!(err, ForgeError::InvalidTask(_)));
    assert_eq!(" Regression ".parse::<TaskType>().unwrap(), TaskType::Regression);
}

#[test]
fn test_held_out_counts() {
    let (artifact, _) = train(&classification_df(), "label", "naive_bayes", TaskType::Classification).unwrap();
    let metrics = artifact.metrics();
    assert_eq!(metrics.n_test, 12);
    assert_eq!(metrics.n_train, 48);
    assert!(metrics.f1_score.is_some());
    assert!(metrics.r2.is_none());
}

#[test]
fn test_custom_config() {
    let config = TrainingConfig::default()
        .with_n_estimators(10)
        .with_validation_split(0.3)
        .with_random_state(7);
    let (artifact, _) =
        train_with_config(&regression_df(), "target", "random_forest", TaskType::Regression, &config).unwrap();
    assert_eq!(artifact.metrics().n_test, 15);
}
