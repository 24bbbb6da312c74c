//! Language-model fallback for legacy sources.
//!
//! Sends a closed-vocabulary prompt to an OpenAI-compatible chat endpoint
//! and accepts the reply only if it names one of the configured
//! categories. Transport failures and off-vocabulary replies both degrade
//! to `Unclassified` and are counted in [`Metrics`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use logtriage_llm::{
    ChatMessage, ChatRequest, CompletionsClient, LlmProviderConfig, Provider, RetryConfig,
    RetryPolicy,
};
use logtriage_types::config::FallbackConfig;
use logtriage_types::{Strategy, TriageError, UNCLASSIFIED};

use super::traits::Classifier;
use crate::metrics::Metrics;

/// Chat-completion backed classifier with a hard deadline and at most one
/// retry.
pub struct SemanticFallbackClassifier {
    provider: RetryPolicy<Arc<dyn Provider>>,
    model: String,
    categories: Vec<String>,
    deadline: Duration,
    metrics: Arc<Metrics>,
}

impl SemanticFallbackClassifier {
    /// Wrap an existing provider.
    pub fn new(provider: Arc<dyn Provider>, config: &FallbackConfig, metrics: Arc<Metrics>) -> Self {
        let retry = RetryConfig {
            max_retries: config.effective_retries(),
            ..RetryConfig::default()
        };
        Self {
            provider: RetryPolicy::new(provider, retry),
            model: config.model.clone(),
            categories: config.categories.clone(),
            deadline: Duration::from_secs(config.timeout_secs.max(1)),
            metrics,
        }
    }

    /// Build the HTTP provider described by `config`.
    ///
    /// An inline `api_key` wins over `api_key_env`. A missing key is not an
    /// error here; every call then fails with `NotConfigured` and degrades
    /// to `Unclassified`.
    pub fn from_config(config: &FallbackConfig, metrics: Arc<Metrics>) -> Self {
        let llm_config = LlmProviderConfig {
            name: "fallback".into(),
            base_url: config.base_url.clone(),
            api_key_env: config.api_key_env.clone(),
            timeout_secs: Some(config.timeout_secs.max(1)),
        };
        let provider: Arc<dyn Provider> = if config.api_key.is_empty() {
            Arc::new(CompletionsClient::new(llm_config))
        } else {
            Arc::new(CompletionsClient::with_api_key(
                llm_config,
                config.api_key.expose().to_string(),
            ))
        };
        Self::new(provider, config, metrics)
    }

    /// The prompt sent for `message`.
    pub fn prompt(&self, message: &str) -> String {
        let options = self
            .categories
            .iter()
            .enumerate()
            .map(|(i, c)| format!("({}) {c}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Classify the following log message into one of these categories: {options}.\n\
             If you are not sure, return \"{UNCLASSIFIED}\".\n\
             Only return the category name, no other text or explanation.\n\n\
             Log message: {message}"
        )
    }

    /// Ask the service once (plus the bounded retry) within the deadline.
    async fn ask(&self, message: &str) -> Result<String, TriageError> {
        let mut request = ChatRequest::new(&self.model, vec![ChatMessage::user(self.prompt(message))]);
        request.temperature = Some(0.0);
        request.max_tokens = Some(16);

        let response = tokio::time::timeout(self.deadline, self.provider.complete(&request))
            .await
            .map_err(|_| TriageError::ExternalService {
                message: format!("no reply within {}s", self.deadline.as_secs()),
            })?
            .map_err(|e| TriageError::ExternalService {
                message: e.to_string(),
            })?;

        Ok(response.first_text().unwrap_or_default().to_string())
    }
}

/// Map a raw reply onto the closed vocabulary.
///
/// Surrounding whitespace, quotes, backticks, asterisks and a trailing
/// period are ignored, and comparison is case-insensitive. Returns the
/// canonical category, [`UNCLASSIFIED`] if the model said so, or `None` for
/// anything else.
pub fn interpret_reply(reply: &str, categories: &[String]) -> Option<String> {
    let cleaned = reply
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'))
        .trim()
        .trim_end_matches('.')
        .trim();

    if cleaned.eq_ignore_ascii_case(UNCLASSIFIED) {
        return Some(UNCLASSIFIED.to_string());
    }
    categories
        .iter()
        .find(|c| c.trim().to_lowercase() == cleaned.to_lowercase())
        .cloned()
}

#[async_trait]
impl Classifier for SemanticFallbackClassifier {
    async fn predict(&self, message: &str) -> String {
        match self.ask(message).await {
            Ok(reply) => match interpret_reply(&reply, &self.categories) {
                Some(label) => {
                    debug!(label = %label, "fallback classified message");
                    label
                }
                None => {
                    self.metrics.record_fallback_rejection();
                    warn!(reply = %reply, "fallback reply outside category set");
                    UNCLASSIFIED.to_string()
                }
            },
            Err(e) => {
                self.metrics.record_fallback_failure();
                warn!(provider = %self.provider.name(), error = %e, "fallback call failed");
                UNCLASSIFIED.to_string()
            }
        }
    }

    fn strategy(&self) -> Strategy {
        Strategy::SemanticFallback
    }
}
