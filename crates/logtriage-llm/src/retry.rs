//! Bounded exponential backoff for provider calls.
//!
//! [`RetryPolicy`] wraps any [`Provider`] and retries transient failures
//! (HTTP 429, 5xx, timeouts, transport errors). Everything else is returned
//! on the first attempt.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatRequest, ChatResponse};

/// Retry behaviour.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 1).
    pub max_retries: u32,
    /// Delay before the first retry (default: 250ms).
    pub base_delay: Duration,
    /// Upper bound on any single delay (default: 2s).
    pub max_delay: Duration,
    /// Random extra delay as a fraction of the computed delay (default: 0.25).
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            jitter_fraction: 0.25,
        }
    }
}

impl RetryConfig {
    /// Pause before retry number `attempt + 1`: the base delay doubled per
    /// attempt, clamped to `max_delay`, plus up to `jitter_fraction` of that.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.max_delay.as_millis() as u64;
        let ms = (self.base_delay.as_millis() as u64)
            .saturating_mul(1u64 << attempt.min(32))
            .min(ceiling);
        let spread = (ms as f64 * self.jitter_fraction.max(0.0)) as u64;
        let jitter = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=spread)
        };
        Duration::from_millis(ms + jitter)
    }
}

/// Wraps a provider and resends requests that failed transiently.
#[derive(Debug)]
pub struct RetryPolicy<P> {
    inner: P,
    config: RetryConfig,
}

impl<P: Provider> RetryPolicy<P> {
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl<P: Provider> Provider for RetryPolicy<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let mut attempt = 0;
        loop {
            let err = match self.inner.complete(request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            if attempt >= self.config.max_retries || !err.is_transient() {
                return Err(err);
            }

            // A server-supplied hint only ever lengthens the pause.
            let hinted = match &err {
                ProviderError::RateLimited { retry_after_ms } => Duration::from_millis(*retry_after_ms),
                _ => Duration::ZERO,
            };
            let delay = self.config.delay_for(attempt).max(hinted);
            attempt += 1;
            warn!(
                provider = %self.inner.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient provider error, retrying"
            );
            tokio::time::sleep(delay).await;
            debug!(provider = %self.inner.name(), attempt, "resending request");
        }
    }
}
