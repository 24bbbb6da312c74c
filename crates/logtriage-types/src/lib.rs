//! # logtriage-types
//!
//! Core type definitions for the logtriage log classification service.
//!
//! Every other logtriage crate depends on this one. It contains:
//!
//! - **[`record`]** -- input records, labeled training rows, and results
//! - **[`error`]** -- [`TriageError`], the shared error type
//! - **[`config`]** -- configuration schema with serde defaults
//! - **[`secret`]** -- [`SecretString`] for API keys

pub mod config;
pub mod error;
pub mod record;
pub mod secret;

pub use config::TriageConfig;
pub use error::{Result, TriageError};
pub use record::{ClassificationResult, LabeledExample, LogRecord, Strategy, UNCLASSIFIED};
pub use secret::SecretString;
