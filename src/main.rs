//! ModelForge - Main Entry Point
//!
//! Serves the HTTP API or trains once from the command line.

use clap::Parser;
use modelforge::cli::{cmd_algorithms, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelforge=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => {
            cmd_serve(host, port).await?;
        }
        Commands::Train { data, target, algorithm, task, predict } => {
            // Model fitting is CPU-bound; keep it off the runtime's worker threads
            tokio::task::spawn_blocking(move || {
                cmd_train(&data, &target, &algorithm, &task, predict.as_deref())
            })
            .await??;
        }
        Commands::Algorithms => cmd_algorithms(),
    }

    Ok(())
}
