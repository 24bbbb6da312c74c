//! `triage status` -- show where configuration, dataset and model live and
//! whether the model can be served.

use std::path::Path;

use logtriage_core::bootstrap::build_encoder;
use logtriage_core::config_loader::ConfigSource;
use logtriage_core::dataset::DatasetStore;
use logtriage_core::model::ModelArtifact;

use super::load_config;

pub fn run(config_flag: Option<&Path>) -> anyhow::Result<()> {
    let (config, source) = load_config(config_flag)?;

    println!("triage status");
    println!("=============");
    println!();
    match &source {
        ConfigSource::Defaults => println!("Config:        defaults (no config file found)"),
        other => {
            if let Some(path) = other.path() {
                println!("Config:        {}", path.display());
            }
        }
    }
    println!("Data dir:      {}", config.storage.data_dir().display());
    println!("Legacy source: {}", config.pipeline.legacy_source);
    println!("Rules:         {}", config.pipeline.rules.len());
    println!(
        "Fallback:      {} ({})",
        config.fallback.model, config.fallback.base_url
    );
    println!();

    let store = DatasetStore::from_config(&config.storage);
    match store.load() {
        Ok((rows, origin)) => println!("Dataset:       {} rows ({origin:?})", rows.len()),
        Err(e) => println!("Dataset:       unusable: {e}"),
    }

    let encoder = build_encoder(&config);
    let model_path = config.storage.model_path();
    match ModelArtifact::load(&model_path, &encoder.signature()) {
        Ok(artifact) => {
            let summary = artifact.summary();
            println!("Model:         {}", model_path.display());
            println!("  Version:     {}", summary.version);
            println!("  Created:     {}", summary.created_at.to_rfc3339());
            println!("  Rows:        {}", summary.training_rows);
            println!("  Labels:      {}", summary.labels.join(", "));
        }
        Err(e) => {
            println!("Model:         not servable");
            println!("  {e}");
            println!("  Run `triage train` to create one.");
        }
    }
    Ok(())
}
