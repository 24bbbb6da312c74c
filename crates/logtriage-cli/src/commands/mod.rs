//! Subcommand implementations.

pub mod classify;
pub mod retrain;
pub mod serve;
pub mod status;
pub mod train;

use std::path::Path;

use tracing::debug;

use logtriage_core::config_loader::{self, ConfigSource};
use logtriage_types::TriageConfig;

/// Load the configuration using the standard discovery chain.
pub fn load_config(flag: Option<&Path>) -> anyhow::Result<(TriageConfig, ConfigSource)> {
    let (config, source) = config_loader::load_config(flag)?;
    debug!(source = ?source, data_dir = %config.storage.data_dir().display(), "configuration loaded");
    Ok((config, source))
}
