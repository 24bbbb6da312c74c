//! The classification pipeline.
//!
//! - [`traits::Classifier`]: stage interface, total over all inputs
//! - [`embedding::EmbeddingClassifier`]: encoder + live model, gated at 0.5
//! - [`fallback::SemanticFallbackClassifier`]: language model for legacy sources
//! - [`orchestrator::Pipeline`]: routing and batch fan-out

pub mod embedding;
pub mod fallback;
pub mod orchestrator;
pub mod traits;

pub use embedding::{CONFIDENCE_THRESHOLD, EmbeddingClassifier};
pub use fallback::SemanticFallbackClassifier;
pub use orchestrator::Pipeline;
pub use traits::Classifier;
