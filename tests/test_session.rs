//! Integration test: session lifecycle and prediction decoding

use modelforge::prelude::*;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `[age, income, label]`, 100 rows, approval driven mostly by income
fn loan_df() -> DataFrame {
    let n = 100;
    let age: Vec<i64> = (0..n).map(|i| 20 + (i * 7) % 50).collect();
    let income: Vec<i64> = (0..n).map(|i| 20_000 + (i * 1337) % 80_000).collect();
    let label: Vec<&str> = income
        .iter()
        .zip(&age)
        .map(|(&inc, &a)| if inc + a * 100 > 55_000 { "approve" } else { "reject" })
        .collect();

    df!("age" => age, "income" => income, "label" => label).unwrap()
}

/// `[sqft, price]`
fn housing_df() -> DataFrame {
    let n = 40;
    let sqft: Vec<f64> = (0..n).map(|i| 500.0 + i as f64 * 37.0).collect();
    let price: Vec<f64> = sqft
        .iter()
        .enumerate()
        .map(|(i, s)| 150.0 * s + 20_000.0 + ((i * 13) % 7) as f64 * 500.0)
        .collect();

    df!("sqft" => sqft, "price" => price).unwrap()
}

fn yes_no_df() -> DataFrame {
    let n = 30;
    let score: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let other: Vec<f64> = (0..n).map(|i| ((i * 11) % 5) as f64).collect();
    let answer: Vec<&str> = (0..n).map(|i| if i < 15 { "no" } else { "yes" }).collect();

    df!("score" => score, "other" => other, "answer" => answer).unwrap()
}

#[test]
fn test_loan_approval_random_forest() {
    let (artifact, score) = train(&loan_df(), "label", "random_forest", TaskType::Classification).unwrap();

    assert_eq!(artifact.feature_schema(), &["age", "income"]);
    let expected: BTreeMap<String, usize> =
        [("approve".to_string(), 0), ("reject".to_string(), 1)].into_iter().collect();
    assert_eq!(artifact.label_encoder().unwrap().mapping(), expected);
    assert!((0.0..=1.0).contains(&score));

    match predict(&artifact, &[35.0, 52_000.0]).unwrap() {
        PredictionValue::Label(label) => assert!(label == "approve" || label == "reject"),
        other => panic!("expected a label, got {:?}", other),
    }
}

#[test]
fn test_housing_linear_regression() {
    let (artifact, score) = train(&housing_df(), "price", "linear_regression", TaskType::Regression).unwrap();

    assert_eq!(artifact.feature_schema(), &["sqft"]);
    assert!(score.is_finite());
    match predict(&artifact, &[1200.0]).unwrap() {
        PredictionValue::Value(price) => {
            assert!(price.is_finite());
            approx::assert_relative_eq!(price, 150.0 * 1200.0 + 21_500.0, max_relative = 0.01);
        }
        other => panic!("expected a value, got {:?}", other),
    }
}

#[test]
fn test_yes_no_labels_decode() {
    for algorithm in ["random_forest", "gradient_boosting", "logistic_regression", "knn", "svm", "naive_bayes"] {
        let (artifact, _) = train(&yes_no_df(), "answer", algorithm, TaskType::Classification).unwrap();
        for row in [[0.0, 1.0], [29.0, 4.0], [14.5, 2.0]] {
            let prediction = predict(&artifact, &row).unwrap();
            assert!(
                prediction == PredictionValue::Label("yes".into()) || prediction == PredictionValue::Label("no".into()),
                "{} predicted {:?}",
                algorithm,
                prediction
            );
        }
    }
}

#[test]
fn test_predict_before_train() {
    let session = Session::new();
    assert!(!session.is_trained());
    assert!(matches!(session.predict(&[1.0]), Err(ForgeError::ModelNotTrained)));
}

#[test]
fn test_wrong_length_is_rejected() {
    let session = Session::new();
    session.train(&loan_df(), "label", "knn", TaskType::Classification).unwrap();

    let err = session.predict(&[35.0]).unwrap_err();
    assert!(matches!(err, ForgeError::FeatureCountMismatch { expected: 2, actual: 1 }));
    assert!(session.predict(&[35.0, 52_000.0, 1.0]).is_err());
}

#[test]
fn test_second_train_replaces_artifact() {
    let session = Session::new();
    session.train(&loan_df(), "label", "random_forest", TaskType::Classification).unwrap();
    assert_eq!(session.artifact().unwrap().feature_schema(), &["age", "income"]);

    session.train(&housing_df(), "price", "linear_regression", TaskType::Regression).unwrap();
    let artifact = session.artifact().unwrap();
    assert_eq!(artifact.feature_schema(), &["sqft"]);
    assert_eq!(artifact.task(), TaskType::Regression);
    assert!(artifact.label_encoder().is_none());

    assert!(matches!(session.predict(&[1000.0]).unwrap(), PredictionValue::Value(_)));
    assert!(matches!(
        session.predict(&[35.0, 52_000.0]),
        Err(ForgeError::FeatureCountMismatch { expected: 1, actual: 2 })
    ));
}

#[test]
fn test_failed_train_keeps_state() {
    let session = Session::new();
    session.train(&housing_df(), "price", "knn", TaskType::Regression).unwrap();
    let before = session.artifact().unwrap();

    let err = session
        .train(&housing_df(), "price", "logistic_regression", TaskType::Regression)
        .unwrap_err();
    assert!(matches!(err, ForgeError::UnsupportedAlgorithm { .. }));
    assert!(Arc::ptr_eq(&before, &session.artifact().unwrap()));

    let err = session.train(&housing_df(), "cost", "knn", TaskType::Regression).unwrap_err();
    assert!(matches!(err, ForgeError::UnknownColumn(_)));
    assert!(Arc::ptr_eq(&before, &session.artifact().unwrap()));
}

#[test]
fn test_train_request_parses_task() {
    let session = Session::new();
    let request = TrainingRequest::new("price", "Linear_Regression", "REGRESSION");
    let artifact = session.train_request(&housing_df(), &request).unwrap();
    assert_eq!(artifact.algorithm(), Algorithm::LinearRegression);

    let bad = TrainingRequest::new("price", "knn", "forecasting");
    assert!(matches!(session.train_request(&housing_df(), &bad), Err(ForgeError::InvalidTask(_))));
}

#[test]
fn test_singleton_class_is_rejected() {
    let df = df!(
        "x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        "y" => ["a", "a", "a", "a", "a", "b"]
    )
    .unwrap();
    let err = train(&df, "y", "knn", TaskType::Classification).unwrap_err();
    assert!(matches!(err, ForgeError::InsufficientClassSamples(_)));
}

#[test]
fn test_missing_feature_values_rejected() {
    let df = df!(
        "x" => [Some(1.0), None, Some(3.0), Some(4.0)],
        "y" => [1.0, 2.0, 3.0, 4.0]
    )
    .unwrap();
    let err = train(&df, "y", "linear_regression", TaskType::Regression).unwrap_err();
    assert!(matches!(err, ForgeError::MissingValues { count: 1, .. }));
}

#[test]
fn test_non_finite_feature_rejected() {
    let score: Vec<f64> = (0..30)
        .map(|i| match i {
            4 => f64::NAN,
            9 => f64::NEG_INFINITY,
            _ => i as f64,
        })
        .collect();
    let answer: Vec<&str> = (0..30).map(|i| if i < 15 { "no" } else { "yes" }).collect();
    let df = df!("score" => score, "answer" => answer).unwrap();

    for algorithm in ["knn", "logistic_regression", "random_forest"] {
        let err = train(&df, "answer", algorithm, TaskType::Classification).unwrap_err();
        assert!(
            matches!(&err, ForgeError::NonFiniteValues { column, count: 2 } if column == "score"),
            "{} returned {:?}",
            algorithm,
            err
        );
    }
}

#[test]
fn test_non_finite_regression_target_rejected() {
    let price: Vec<f64> = (0..40)
        .map(|i| if i % 3 == 0 { f64::NAN } else { 100.0 + i as f64 })
        .collect();
    let df = df!("sqft" => (0..40).map(|i| i as f64).collect::<Vec<_>>(), "price" => price).unwrap();

    let session = Session::new();
    let err = session.train(&df, "price", "linear_regression", TaskType::Regression).unwrap_err();
    assert!(matches!(err, ForgeError::NonFiniteValues { ref column, count: 14 } if column == "price"));
    assert!(!session.is_trained());
}

#[test]
fn test_concurrent_predict_sees_whole_artifacts() {
    let session = Arc::new(Session::new());
    session.train(&yes_no_df(), "answer", "knn", TaskType::Classification).unwrap();

    std::thread::scope(|scope| {
        let trainer = Arc::clone(&session);
        scope.spawn(move || {
            for algorithm in ["naive_bayes", "logistic_regression", "knn"] {
                trainer.train(&yes_no_df(), "answer", algorithm, TaskType::Classification).unwrap();
            }
        });

        for _ in 0..4 {
            let reader = Arc::clone(&session);
            scope.spawn(move || {
                for _ in 0..50 {
                    let prediction = reader.predict(&[20.0, 1.0]).unwrap();
                    assert!(matches!(prediction, PredictionValue::Label(_)));
                }
            });
        }
    });

    assert!(session.is_trained());
}

#[test]
fn test_artifact_serializes() {
    let (artifact, _) = train(&yes_no_df(), "answer", "naive_bayes", TaskType::Classification).unwrap();
    let json = serde_json::to_value(&artifact).unwrap();
    assert_eq!(json["feature_schema"], serde_json::json!(["score", "other"]));
    assert_eq!(json["task"], "classification");
    assert_eq!(json["algorithm"], "naive_bayes");
}
