//! `triage` -- CLI binary for the logtriage log classifier.
//!
//! Provides the following subcommands:
//!
//! - `triage serve` -- Run the HTTP API.
//! - `triage classify` -- Classify a CSV file offline.
//! - `triage train` -- Fit a model from the current dataset.
//! - `triage retrain` -- Merge labeled rows and refit.
//! - `triage status` -- Show configuration, dataset and model status.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "triage", about = "logtriage log classification CLI", version)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(commands::serve::ServeArgs),

    /// Classify a CSV with `source` and `log_message` columns.
    Classify(commands::classify::ClassifyArgs),

    /// Fit a model from the current dataset and write the artifact.
    Train,

    /// Merge a labeled CSV into the dataset and refit.
    Retrain(commands::retrain::RetrainArgs),

    /// Show configuration, dataset and model status.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config_flag = cli.config.as_deref();
    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, config_flag).await?,
        Commands::Classify(args) => commands::classify::run(args, config_flag).await?,
        Commands::Train => commands::train::run(config_flag).await?,
        Commands::Retrain(args) => commands::retrain::run(args, config_flag).await?,
        Commands::Status => commands::status::run(config_flag)?,
    }

    Ok(())
}
