//! ModelForge CLI Module
//!
//! Command-line interface for serving the HTTP API and for one-shot training.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::training::{AlgorithmRegistry, Session, TaskType};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "modelforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a model on a CSV and predict single rows")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server port (defaults to API_PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host (defaults to API_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
    },

    /// Train once on a CSV file and report the held-out score
    Train {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Algorithm name (see `modelforge algorithms`)
        #[arg(short, long, default_value = "random_forest")]
        algorithm: String,

        /// Task type (classification, regression)
        #[arg(long, default_value = "classification")]
        task: String,

        /// Comma-separated feature values to predict after training
        #[arg(long)]
        predict: Option<String>,
    },

    /// List supported algorithms per task
    Algorithms,
}

/// Parse `"1.5, 2, 3"` into feature values
pub fn parse_values(raw: &str) -> anyhow::Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().with_context(|| format!("invalid feature value '{}'", s)))
        .collect()
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &PathBuf,
    target: &str,
    algorithm: &str,
    task: &str,
    predict: Option<&str>,
) -> anyhow::Result<()> {
    section("Train");

    let task: TaskType = task.parse()?;

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run(&format!("Training {}", algorithm.cyan()));
    let start = Instant::now();
    let session = Session::new();
    let artifact = session.train(&df, target, algorithm, task)?;
    step_done(&format!("{:?}", start.elapsed()));

    let metrics = artifact.metrics();
    println!();
    kv(task.metric_name(), &format!("{:.4}", artifact.score()));
    kv("Train / test", &format!("{} / {}", metrics.n_train, metrics.n_test));
    kv("Features", &artifact.feature_schema().join(", "));
    if let Some(encoder) = artifact.label_encoder() {
        kv("Classes", &encoder.classes().join(", "));
    }
    kv("Time", &format!("{:.3}s", metrics.training_time_secs));

    if let Some(raw) = predict {
        let values = parse_values(raw)?;
        let prediction = session.predict(&values)?;
        println!();
        kv("Prediction", &prediction.to_string().bold().to_string());
    }
    println!();

    Ok(())
}

pub fn cmd_algorithms() {
    section("Algorithms");
    let registry = AlgorithmRegistry::global();
    for task in [TaskType::Classification, TaskType::Regression] {
        let names: Vec<&str> = registry.supported(task).iter().map(|a| a.as_str()).collect();
        kv(task.as_str(), &names.join(", "));
    }
    println!();
}

pub async fn cmd_serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }

    section("ModelForge");
    kv("API", &format!("http://{}:{}", config.host, config.port));
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    run_server(config).await
}
