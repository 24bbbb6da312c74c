//! Chat endpoint failures, classified by whether a retry can help.

use thiserror::Error;

/// Errors that can occur when calling a chat completion endpoint.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Non-success HTTP status not covered by a more specific variant.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Credentials were rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP 429.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// HTTP 404 for the requested model.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// No API key in config or environment.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The body parsed but is not a usable completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Whether the same request might succeed if sent again: rate limits,
    /// gateway and server errors, timeouts and transport failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::Http(_) => true,
            Self::Status { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            Self::AuthFailed(_)
            | Self::ModelNotFound(_)
            | Self::NotConfigured(_)
            | Self::InvalidResponse(_)
            | Self::Json(_) => false,
        }
    }
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
