//! Configuration file discovery and loading.
//!
//! The discovery order is:
//! 1. `--config <path>` on the command line.
//! 2. `LOGTRIAGE_CONFIG` environment variable.
//! 3. `~/.logtriage/config.json`
//! 4. If none found, built-in defaults.
//!
//! A path named by 1 or 2 must exist; the home-directory file is optional.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use logtriage_types::{Result, TriageConfig, TriageError};

pub const CONFIG_ENV_VAR: &str = "LOGTRIAGE_CONFIG";

/// Where a configuration path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Flag(PathBuf),
    EnvVar(PathBuf),
    Home(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Flag(p) | ConfigSource::EnvVar(p) | ConfigSource::Home(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }

    fn is_explicit(&self) -> bool {
        matches!(self, ConfigSource::Flag(_) | ConfigSource::EnvVar(_))
    }
}

/// Resolve the config path without reading it.
///
/// `get_var` looks up environment variables, so tests can supply their own.
pub fn discover_config_path(
    flag: Option<&Path>,
    get_var: impl Fn(&str) -> Option<String>,
    home_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(path) = flag {
        return ConfigSource::Flag(path.to_path_buf());
    }
    if let Some(value) = get_var(CONFIG_ENV_VAR)
        && !value.trim().is_empty()
    {
        return ConfigSource::EnvVar(PathBuf::from(value));
    }
    if let Some(home) = home_dir {
        let path = home.join(".logtriage").join("config.json");
        if path.exists() {
            return ConfigSource::Home(path);
        }
    }
    ConfigSource::Defaults
}

/// Parse a config file.
///
/// # Errors
///
/// [`TriageError::ConfigInvalid`] if the file cannot be read or is not a
/// valid configuration.
pub fn load_config_file(path: &Path) -> Result<TriageConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| TriageError::ConfigInvalid {
        reason: format!("failed to read config file {}: {e}", path.display()),
    })?;
    serde_json::from_str(&contents).map_err(|e| TriageError::ConfigInvalid {
        reason: format!("failed to parse config file {}: {e}", path.display()),
    })
}

/// Discover and load the configuration for this process.
pub fn load_config(flag: Option<&Path>) -> Result<(TriageConfig, ConfigSource)> {
    let source = discover_config_path(flag, |k| std::env::var(k).ok(), dirs::home_dir());
    load_from(source)
}

fn load_from(source: ConfigSource) -> Result<(TriageConfig, ConfigSource)> {
    let Some(path) = source.path() else {
        info!("no config file found, using defaults");
        return Ok((TriageConfig::default(), source));
    };

    if source.is_explicit() && !path.exists() {
        return Err(TriageError::ConfigInvalid {
            reason: format!("config file {} does not exist", path.display()),
        });
    }

    debug!(path = %path.display(), "loading config file");
    let config = load_config_file(path)?;
    Ok((config, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn flag_takes_precedence() {
        let src = discover_config_path(
            Some(Path::new("/etc/triage.json")),
            vars(&[(CONFIG_ENV_VAR, "/env/config.json")]),
            None,
        );
        assert_eq!(src, ConfigSource::Flag("/etc/triage.json".into()));
    }

    #[test]
    fn env_var_beats_home() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".logtriage")).unwrap();
        std::fs::write(home.path().join(".logtriage/config.json"), "{}").unwrap();

        let src = discover_config_path(
            None,
            vars(&[(CONFIG_ENV_VAR, "/env/config.json")]),
            Some(home.path().to_path_buf()),
        );
        assert_eq!(src, ConfigSource::EnvVar("/env/config.json".into()));
    }

    #[test]
    fn home_file_used_when_present() {
        let home = tempfile::tempdir().unwrap();
        let path = home.path().join(".logtriage/config.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{}").unwrap();

        let src = discover_config_path(None, vars(&[]), Some(home.path().to_path_buf()));
        assert_eq!(src, ConfigSource::Home(path));
    }

    #[test]
    fn defaults_when_nothing_found() {
        let home = tempfile::tempdir().unwrap();
        let src = discover_config_path(None, vars(&[(CONFIG_ENV_VAR, " ")]), Some(home.path().into()));
        assert_eq!(src, ConfigSource::Defaults);
        let (cfg, _) = load_from(src).unwrap();
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let err = load_from(ConfigSource::Flag("/nonexistent/logtriage.json".into())).unwrap_err();
        assert!(matches!(err, TriageError::ConfigInvalid { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9100}, "pipeline": {"legacySource": "OldCRM"}}"#,
        )
        .unwrap();

        let (cfg, src) = load_from(ConfigSource::Flag(path.clone())).unwrap();
        assert_eq!(src.path(), Some(path.as_path()));
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.pipeline.legacy_source, "OldCRM");
        assert_eq!(cfg.pipeline.rules.len(), 8);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
