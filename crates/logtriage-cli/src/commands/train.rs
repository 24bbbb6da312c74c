//! `triage train` -- fit a model from the canonical dataset, the seed
//! file, or the bundled starter dataset, whichever exists first.

use std::path::Path;

use logtriage_core::bootstrap::{build_encoder, build_trainer};

use super::load_config;

pub async fn run(config_flag: Option<&Path>) -> anyhow::Result<()> {
    let (config, _) = load_config(config_flag)?;
    let trainer = build_trainer(&config, build_encoder(&config));
    let outcome = trainer.train_current().await?;
    println!("{}", outcome.message);
    println!("version: {}", outcome.version);
    Ok(())
}
