//! Confidence-gated embedding classifier.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use logtriage_types::{Strategy, UNCLASSIFIED};

use super::traits::Classifier;
use crate::embeddings::Embedder;
use crate::model::{LiveModel, ModelArtifact};

/// Minimum winning-class probability for a prediction to be accepted.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// A label the model is confident about.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// Pick the arg-max label, or `None` when its probability is below
/// [`CONFIDENCE_THRESHOLD`].
pub fn decide(labels: &[String], probs: &[f32]) -> Option<Prediction> {
    let (idx, &confidence) = probs
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if confidence.is_nan() || confidence < CONFIDENCE_THRESHOLD {
        return None;
    }
    labels.get(idx).map(|label| Prediction {
        label: label.clone(),
        confidence,
    })
}

/// Shared encoder plus the live model artifact.
pub struct EmbeddingClassifier {
    encoder: Arc<dyn Embedder>,
    model: LiveModel,
}

impl EmbeddingClassifier {
    pub fn new(encoder: Arc<dyn Embedder>, model: LiveModel) -> Self {
        Self { encoder, model }
    }

    /// Score `message` against one snapshot of the live artifact.
    ///
    /// Returns `None` for rejected, unencodable, or incompatible input.
    pub async fn score(&self, message: &str) -> Option<Prediction> {
        let vector = match self.encoder.embed(message).await {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "message not encodable");
                return None;
            }
        };

        let artifact: Arc<ModelArtifact> = self.model.snapshot();
        let probs = match artifact.predict_proba(&vector) {
            Ok(p) => p,
            Err(e) => {
                warn!(version = %artifact.version, error = %e, "live artifact cannot score vector");
                return None;
            }
        };

        let prediction = decide(&artifact.labels, &probs);
        if prediction.is_none() {
            debug!(
                version = %artifact.version,
                max_probability = probs.iter().copied().fold(0.0f32, f32::max),
                "prediction below confidence threshold"
            );
        }
        prediction
    }
}

#[async_trait]
impl Classifier for EmbeddingClassifier {
    async fn predict(&self, message: &str) -> String {
        self.score(message)
            .await
            .map(|p| p.label)
            .unwrap_or_else(|| UNCLASSIFIED.to_string())
    }

    fn strategy(&self) -> Strategy {
        Strategy::Embedding
    }
}
