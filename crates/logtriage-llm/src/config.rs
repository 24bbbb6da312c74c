//! Connection settings for an OpenAI-compatible endpoint.

use serde::{Deserialize, Serialize};

/// Default request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How to reach one chat completion endpoint.
///
/// Stores the *name* of the environment variable holding the key, never the
/// key itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider name used in logs (e.g. "groq").
    pub name: String,

    /// Base URL of the API (e.g. "https://api.groq.com/openai/v1").
    pub base_url: String,

    /// Environment variable that holds the API key.
    pub api_key_env: String,

    /// Per-request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl LlmProviderConfig {
    /// Groq's OpenAI-compatible endpoint.
    pub fn groq() -> Self {
        Self {
            name: "groq".into(),
            base_url: "https://api.groq.com/openai/v1".into(),
            api_key_env: "GROQ_API_KEY".into(),
            timeout_secs: None,
        }
    }

    /// Effective request timeout.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}
