//! The [`Provider`] trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};

/// Something that can answer a chat completion request.
///
/// The semantic fallback holds an `Arc<dyn Provider>` so tests can swap in
/// a scripted implementation without an HTTP server.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name used in log fields (e.g. "groq").
    fn name(&self) -> &str;

    /// Execute a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`](crate::error::ProviderError) on network
    /// failure, authentication problems, rate limiting, timeouts, or an
    /// unparseable response.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for std::sync::Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        (**self).complete(request).await
    }
}
