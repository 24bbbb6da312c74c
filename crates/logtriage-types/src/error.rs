//! Error types for logtriage.
//!
//! [`TriageError`] is shared by every library crate. Variants map onto the
//! four failure classes of the service: bad input (`Validation`), a failed
//! external call (`ExternalService`), a rejected training run (`Training`),
//! and an unusable model artifact (`ModelLoad`).

use thiserror::Error;

/// Top-level error type for logtriage.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TriageError {
    /// Input is missing required columns or fields. Surfaced to the caller
    /// as-is and never retried.
    #[error("validation failed: {reason}")]
    Validation {
        /// What is wrong with the input.
        reason: String,
    },

    /// The semantic fallback service failed (network, timeout, rate limit).
    #[error("external service error: {message}")]
    ExternalService {
        /// Error message from the transport or provider.
        message: String,
    },

    /// A training run was rejected; the live artifact is unchanged.
    #[error("training failed: {reason}")]
    Training {
        /// Why the dataset could not be fitted.
        reason: String,
    },

    /// The model artifact is missing or incompatible with the encoder.
    #[error("model load failed: {reason}")]
    ModelLoad {
        /// What is wrong with the artifact.
        reason: String,
    },

    /// Configuration is malformed (e.g. a rule pattern does not compile).
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TriageError {
    /// Shorthand for a [`TriageError::Validation`].
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`TriageError::Training`].
    pub fn training(reason: impl Into<String>) -> Self {
        Self::Training {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`TriageError::ModelLoad`].
    pub fn model_load(reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            reason: reason.into(),
        }
    }
}

/// A convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let err = TriageError::validation("missing column: log_message");
        assert_eq!(
            err.to_string(),
            "validation failed: missing column: log_message"
        );
    }

    #[test]
    fn training_display() {
        let err = TriageError::training("no rows with valid log_message and target_label");
        assert!(err.to_string().starts_with("training failed:"));
    }

    #[test]
    fn model_load_display() {
        let err = TriageError::model_load("dimension 128 != encoder dimension 384");
        assert_eq!(
            err.to_string(),
            "model load failed: dimension 128 != encoder dimension 384"
        );
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TriageError = io_err.into();
        assert!(matches!(err, TriageError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{{bad}}").unwrap_err();
        let err: TriageError = json_err.into();
        assert!(matches!(err, TriageError::Json(_)));
    }
}
