//! Configuration schema.
//!
//! Every field has a serde default so a partial (or empty) JSON file is a
//! valid configuration. Fields accept both `snake_case` and `camelCase`.
//! Unknown fields are ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::secret::SecretString;

// ── Root config ──────────────────────────────────────────────────────────

/// Root configuration for logtriage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriageConfig {
    /// Where the dataset, model artifact, and outputs live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Routing and rule settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Text encoder settings.
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Model fitting hyperparameters.
    #[serde(default)]
    pub training: TrainingConfig,

    /// Semantic fallback (language model) settings.
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

// ── Storage ──────────────────────────────────────────────────────────────

/// File locations. Relative paths are resolved against `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all persisted state.
    #[serde(default = "default_data_dir", alias = "dataDir")]
    pub data_dir: String,

    /// Canonical labeled dataset (CSV).
    #[serde(default = "default_dataset_file", alias = "datasetFile")]
    pub dataset_file: String,

    /// Bundled starter dataset used when no canonical dataset exists yet.
    #[serde(default = "default_seed_dataset_file", alias = "seedDatasetFile")]
    pub seed_dataset_file: String,

    /// Live model artifact.
    #[serde(default = "default_model_file", alias = "modelFile")]
    pub model_file: String,

    /// Last classified CSV, served by `GET /classify`.
    #[serde(default = "default_output_file", alias = "outputFile")]
    pub output_file: String,
}

fn default_data_dir() -> String {
    "~/.logtriage".into()
}
fn default_dataset_file() -> String {
    "dataset/labeled_logs.csv".into()
}
fn default_seed_dataset_file() -> String {
    "synthetic_logs.csv".into()
}
fn default_model_file() -> String {
    "models/log_classifier.json".into()
}
fn default_output_file() -> String {
    "resources/output.csv".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            dataset_file: default_dataset_file(),
            seed_dataset_file: default_seed_dataset_file(),
            model_file: default_model_file(),
            output_file: default_output_file(),
        }
    }
}

impl StorageConfig {
    /// Expanded data directory.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }

    /// Path of the canonical dataset.
    pub fn dataset_path(&self) -> PathBuf {
        self.resolve(&self.dataset_file)
    }

    /// Path of the starter dataset.
    pub fn seed_dataset_path(&self) -> PathBuf {
        self.resolve(&self.seed_dataset_file)
    }

    /// Path of the model artifact.
    pub fn model_path(&self) -> PathBuf {
        self.resolve(&self.model_file)
    }

    /// Path of the last classified CSV.
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_file)
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let expanded = expand_home(file);
        if expanded.is_absolute() {
            expanded
        } else {
            self.data_dir().join(expanded)
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    Path::new(raw).to_path_buf()
}

// ── Pipeline ─────────────────────────────────────────────────────────────

/// A single `(pattern, label)` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Case-insensitive regular expression, matched anywhere in the message.
    pub pattern: String,
    /// Label assigned on match.
    pub label: String,
}

impl RuleConfig {
    fn new(pattern: &str, label: &str) -> Self {
        Self {
            pattern: pattern.into(),
            label: label.into(),
        }
    }
}

/// Routing settings for the classification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source identifier routed straight to the semantic fallback.
    #[serde(default = "default_legacy_source", alias = "legacySource")]
    pub legacy_source: String,

    /// How many records of one batch are classified concurrently.
    #[serde(default = "default_batch_concurrency", alias = "batchConcurrency")]
    pub batch_concurrency: usize,

    /// Ordered rule table. First match wins.
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

fn default_legacy_source() -> String {
    "LegacyCRM".into()
}
fn default_batch_concurrency() -> usize {
    8
}

/// The built-in rule table.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::new(r"User User\d+ logged (in|out).", "User Action"),
        RuleConfig::new(r"Account with ID .* created by .*", "User Action"),
        RuleConfig::new(r"Backup (started|ended) at .*", "System Notification"),
        RuleConfig::new(r"Backup completed successfully.", "System Notification"),
        RuleConfig::new(r"System updated to version .*", "System Notification"),
        RuleConfig::new(
            r"File .* uploaded successfully by user .*",
            "System Notification",
        ),
        RuleConfig::new(r"Disk cleanup completed successfully.", "System Notification"),
        RuleConfig::new(r"System reboot initiated by user .*", "System Notification"),
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            legacy_source: default_legacy_source(),
            batch_concurrency: default_batch_concurrency(),
            rules: default_rules(),
        }
    }
}

// ── Encoder ──────────────────────────────────────────────────────────────

/// Text encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Embedding dimension. Artifacts trained at another dimension are
    /// rejected at load time.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_dimension() -> usize {
    384
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
        }
    }
}

// ── Training ─────────────────────────────────────────────────────────────

/// Softmax regression hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Passes over the shuffled dataset.
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    /// SGD step size.
    #[serde(default = "default_learning_rate", alias = "learningRate")]
    pub learning_rate: f32,

    /// L2 weight decay.
    #[serde(default = "default_l2")]
    pub l2: f32,

    /// Shuffle seed; fixed so identical datasets produce identical artifacts.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_epochs() -> usize {
    60
}
fn default_learning_rate() -> f32 {
    0.5
}
fn default_l2() -> f32 {
    1e-4
}
fn default_seed() -> u64 {
    42
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            l2: default_l2(),
            seed: default_seed(),
        }
    }
}

// ── Fallback ─────────────────────────────────────────────────────────────

/// Language-model fallback used for legacy sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// OpenAI-compatible base URL.
    #[serde(default = "default_fallback_base_url", alias = "baseUrl")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_fallback_api_key_env", alias = "apiKeyEnv")]
    pub api_key_env: String,

    /// Inline API key; takes precedence over `api_key_env` when set.
    #[serde(default, alias = "apiKey")]
    pub api_key: SecretString,

    /// Model identifier sent to the service.
    #[serde(default = "default_fallback_model")]
    pub model: String,

    /// Overall deadline for one classification, retries included.
    #[serde(default = "default_fallback_timeout_secs", alias = "timeoutSecs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt. Values above 1 are clamped to 1.
    #[serde(default = "default_fallback_max_retries", alias = "maxRetries")]
    pub max_retries: u32,

    /// Closed label vocabulary for this stage.
    #[serde(default = "default_fallback_categories")]
    pub categories: Vec<String>,
}

fn default_fallback_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_fallback_api_key_env() -> String {
    "GROQ_API_KEY".into()
}
fn default_fallback_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_fallback_timeout_secs() -> u64 {
    10
}
fn default_fallback_max_retries() -> u32 {
    1
}
fn default_fallback_categories() -> Vec<String> {
    vec!["Workflow Error".into(), "Deprecation Warning".into()]
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            base_url: default_fallback_base_url(),
            api_key_env: default_fallback_api_key_env(),
            api_key: SecretString::default(),
            model: default_fallback_model(),
            timeout_secs: default_fallback_timeout_secs(),
            max_retries: default_fallback_max_retries(),
            categories: default_fallback_categories(),
        }
    }
}

impl FallbackConfig {
    /// Retry budget with the single-retry cap applied.
    pub fn effective_retries(&self) -> u32 {
        self.max_retries.min(1)
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty means permissive.
    #[serde(default, alias = "corsOrigins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}
