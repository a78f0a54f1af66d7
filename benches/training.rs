use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modelforge::training::{predict, train, TaskType};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_regression_data(n_rows: usize, n_features: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let features: Vec<Vec<f64>> = (0..n_features)
        .map(|_| (0..n_rows).map(|_| rng.gen::<f64>() * 10.0).collect())
        .collect();

    // Target is the sum of features plus noise
    let target: Vec<f64> = (0..n_rows)
        .map(|i| features.iter().map(|f| f[i]).sum::<f64>() + rng.gen::<f64>() * 0.1)
        .collect();

    let mut columns: Vec<Column> = features
        .into_iter()
        .enumerate()
        .map(|(i, values)| Column::new(format!("feature_{}", i).into(), values))
        .collect();
    columns.push(Column::new("target".into(), target));

    DataFrame::new(columns).unwrap()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    let df = create_regression_data(2000, 10);
    for algorithm in ["linear_regression", "random_forest", "gradient_boosting", "knn"] {
        group.bench_with_input(BenchmarkId::new("fit", algorithm), &df, |b, df| {
            b.iter(|| train(black_box(df), "target", algorithm, TaskType::Regression).unwrap())
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train once, predict single rows
    let df = create_regression_data(2000, 10);
    let row: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
    for algorithm in ["linear_regression", "random_forest", "knn"] {
        let (artifact, _) = train(&df, "target", algorithm, TaskType::Regression).unwrap();
        group.bench_function(BenchmarkId::new("predict_row", algorithm), |b| {
            b.iter(|| predict(&artifact, black_box(&row)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
