//! `triage retrain` -- merge a labeled CSV into the dataset and refit in
//! the foreground.

use std::path::{Path, PathBuf};

use clap::Args;

use logtriage_core::bootstrap::{build_encoder, build_trainer};
use logtriage_core::table::CsvTable;

use super::load_config;

#[derive(Args)]
pub struct RetrainArgs {
    /// CSV with `source`, `log_message` and `target_label` columns.
    #[arg(short, long)]
    pub input: PathBuf,
}

pub async fn run(args: RetrainArgs, config_flag: Option<&Path>) -> anyhow::Result<()> {
    let (config, _) = load_config(config_flag)?;
    let rows = CsvTable::read_path(&args.input)?.labeled_examples()?;

    let trainer = build_trainer(&config, build_encoder(&config));
    let outcome = trainer.retrain(rows).await?;

    println!(
        "accepted {} row(s), rejected {}",
        outcome.accepted, outcome.rejected
    );
    println!("{}", outcome.message);
    println!("version: {}", outcome.version);
    Ok(())
}
