//! HTTP client for OpenAI-style `/chat/completions` endpoints.
//!
//! Groq is the default target, but anything speaking the same wire format
//! works (OpenAI, a local llama.cpp server).

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::LlmProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatRequest, ChatResponse};

/// Backoff suggested for a 429 that carries no hint.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// Where the bearer token comes from.
#[derive(Clone)]
enum KeySource {
    Inline(String),
    Env(String),
}

impl KeySource {
    fn resolve(&self) -> Result<String> {
        let (value, hint) = match self {
            KeySource::Inline(key) => (Some(key.clone()), "an inline api_key".to_string()),
            KeySource::Env(var) => (std::env::var(var).ok(), format!("the {var} env var")),
        };
        value
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::NotConfigured(format!("set {hint}")))
    }
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Inline(_) => f.write_str("Inline(***)"),
            KeySource::Env(var) => f.debug_tuple("Env").field(var).finish(),
        }
    }
}

/// One chat completion endpoint plus its credentials.
#[derive(Debug)]
pub struct CompletionsClient {
    config: LlmProviderConfig,
    key: KeySource,
    http: reqwest::Client,
}

impl CompletionsClient {
    /// Read the key from `config.api_key_env` on every call.
    pub fn new(config: LlmProviderConfig) -> Self {
        let key = KeySource::Env(config.api_key_env.clone());
        Self::build(config, key)
    }

    /// Use `api_key` directly; an empty key falls back to the environment.
    pub fn with_api_key(config: LlmProviderConfig, api_key: String) -> Self {
        let key = if api_key.trim().is_empty() {
            KeySource::Env(config.api_key_env.clone())
        } else {
            KeySource::Inline(api_key)
        };
        Self::build(config, key)
    }

    fn build(config: LlmProviderConfig, key: KeySource) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();
        Self { config, key, http }
    }

    pub fn config(&self) -> &LlmProviderConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for CompletionsClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let key = self.key.resolve()?;
        debug!(provider = %self.config.name, model = %request.model, "chat completion request");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(key)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_header = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.text().await.unwrap_or_default();
            let err = status_error(status, &body, retry_header.as_deref(), &request.model);
            warn!(provider = %self.config.name, error = %err, "chat completion rejected");
            return Err(err);
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::InvalidResponse(format!("unreadable completion body: {e}"))
            }
        })?;
        debug!(provider = %self.config.name, choices = parsed.choices.len(), "chat completion received");
        Ok(parsed)
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http(err)
    }
}

/// Map a non-success response to the matching [`ProviderError`].
fn status_error(status: StatusCode, body: &str, retry_after: Option<&str>, model: &str) -> ProviderError {
    let json: Option<serde_json::Value> = serde_json::from_str(body).ok();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let from_header = retry_after
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(secs_to_ms);
        let from_body = json.as_ref().and_then(|v| {
            v.get("retry_after_ms")
                .and_then(serde_json::Value::as_u64)
                .or_else(|| v.get("retry_after").and_then(serde_json::Value::as_f64).map(secs_to_ms))
        });
        return ProviderError::RateLimited {
            retry_after_ms: from_header.or(from_body).unwrap_or(DEFAULT_RATE_LIMIT_MS),
        };
    }

    let detail = json
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| e.get("message").and_then(|m| m.as_str()).or_else(|| e.as_str()))
        .map(str::to_owned)
        .unwrap_or_else(|| body.trim().to_owned());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthFailed(detail),
        StatusCode::NOT_FOUND => ProviderError::ModelNotFound(format!("{model}: {detail}")),
        other => ProviderError::Status {
            status: other.as_u16(),
            detail,
        },
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0) as u64
}
