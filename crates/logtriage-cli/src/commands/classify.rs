//! `triage classify` -- classify a CSV file without the HTTP server.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::info;

use logtriage_core::AppContext;
use logtriage_core::persist::write_atomic;
use logtriage_core::table::CsvTable;

use super::load_config;

#[derive(Args)]
pub struct ClassifyArgs {
    /// CSV with `source` and `log_message` columns.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the labeled CSV. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: ClassifyArgs, config_flag: Option<&Path>) -> anyhow::Result<()> {
    let (config, _) = load_config(config_flag)?;
    let table = CsvTable::read_path(&args.input)?;
    let records = table.log_records()?;

    let ctx = AppContext::new(config).await?;
    let results = ctx.pipeline().classify_batch(records).await;
    let labels: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
    let bytes = table.with_labels(labels.as_slice())?.to_csv()?;

    match args.output {
        Some(path) => {
            write_atomic(&path, &bytes)?;
            info!(rows = results.len(), output = %path.display(), "classified");
        }
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}
