//! Chat completion client for the logtriage semantic fallback.
//!
//! Legacy-source logs are classified by asking an external language model
//! to pick a category from a closed vocabulary. This crate holds the
//! transport for that call and nothing else; prompt construction and
//! reply interpretation live in `logtriage-core`.
//!
//! # Architecture
//!
//! - [`Provider`] trait defines the chat completion interface
//! - [`CompletionsClient`] implements it for any OpenAI-compatible API
//!   (Groq by default)
//! - [`RetryPolicy`] wraps a provider with bounded exponential backoff
//! - [`LlmProviderConfig`] describes how to connect to a provider
//!
//! ```rust,ignore
//! use logtriage_llm::{ChatMessage, ChatRequest, CompletionsClient, LlmProviderConfig, Provider};
//!
//! let provider = CompletionsClient::new(LlmProviderConfig::groq());
//! let request = ChatRequest::new("llama-3.1-8b-instant", vec![
//!     ChatMessage::user("Classify: Case escalation for ticket ID 7324 failed."),
//! ]);
//! let response = provider.complete(&request).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod retry;
pub mod types;

pub use client::CompletionsClient;
pub use config::LlmProviderConfig;
pub use error::{ProviderError, Result};
pub use provider::Provider;
pub use retry::{RetryConfig, RetryPolicy};
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, Usage};
