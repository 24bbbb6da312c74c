//! Text encoder abstraction.
//!
//! Provides the [`Embedder`] trait for turning a log message into a
//! fixed-length vector, plus [`hash_embedder::HashEmbedder`], a local
//! deterministic encoder that needs no model files or network access.
//!
//! One encoder instance is built at startup and shared read-only by the
//! serving path and the trainer. A model artifact records the encoder's
//! [`EncoderSignature`] and is refused by any other encoder.

pub mod hash_embedder;

use async_trait::async_trait;
use thiserror::Error;

use logtriage_types::TriageError;

use crate::model::EncoderSignature;

/// Errors that can occur while encoding text.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The input text could not be encoded (e.g. blank).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// An internal error occurred in the encoder.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EmbeddingError> for TriageError {
    fn from(err: EmbeddingError) -> Self {
        TriageError::Internal(format!("encoder: {err}"))
    }
}

/// Trait for generating vector embeddings from text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Encode one message.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Encode many messages, preserving order.
    ///
    /// Default implementation calls [`embed`](Embedder::embed) sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Length of every vector this encoder produces.
    fn dimension(&self) -> usize;

    /// Stable identifier written into model artifacts.
    fn name(&self) -> &str {
        "unknown"
    }

    /// Name and dimension, as recorded in artifacts.
    fn signature(&self) -> EncoderSignature {
        EncoderSignature {
            name: self.name().to_string(),
            dimension: self.dimension(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_error_display() {
        let err = EmbeddingError::InvalidInput("blank message".into());
        assert_eq!(err.to_string(), "invalid input: blank message");
    }

    #[test]
    fn converts_into_internal_triage_error() {
        let err: TriageError = EmbeddingError::Internal("boom".into()).into();
        assert!(matches!(err, TriageError::Internal(_)));
        assert!(err.to_string().contains("boom"));
    }
}
