//! The persisted model artifact.
//!
//! An artifact is the full output of one training run: label set, softmax
//! weights and biases, and the signature of the encoder whose vectors it
//! was fitted on. It is immutable once built. Retraining produces a new
//! artifact; nothing ever edits one in place.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use logtriage_types::{Result, TriageError};

use crate::persist::write_atomic;

/// Identity of the encoder an artifact is compatible with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSignature {
    /// Encoder name (see [`Embedder::name`](crate::embeddings::Embedder::name)).
    pub name: String,
    /// Vector length.
    pub dimension: usize,
}

/// A fitted multinomial logistic regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Unique version tag, e.g. `20261019T120301-3f9a1c2e`.
    pub version: String,

    /// When the artifact was fitted.
    pub created_at: DateTime<Utc>,

    /// Encoder the weights were fitted against.
    pub encoder: EncoderSignature,

    /// Class labels, index-aligned with `weights` and `biases`.
    pub labels: Vec<String>,

    /// One weight row of length `encoder.dimension` per label.
    pub weights: Vec<Vec<f32>>,

    /// One bias per label.
    pub biases: Vec<f32>,

    /// Number of dataset rows the model was fitted on.
    pub training_rows: usize,
}

/// What `/model` and `triage status` report about the live artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub version: String,
    pub labels: Vec<String>,
    pub training_rows: usize,
    pub created_at: DateTime<Utc>,
    pub encoder: EncoderSignature,
}

impl ModelArtifact {
    /// Generate a fresh version tag from the creation time.
    pub fn new_version(created_at: DateTime<Utc>) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", created_at.format("%Y%m%dT%H%M%S"), &id[..8])
    }

    /// Check internal consistency and compatibility with `expected`.
    ///
    /// # Errors
    ///
    /// [`TriageError::ModelLoad`] describing the first problem found.
    pub fn validate(&self, expected: &EncoderSignature) -> Result<()> {
        if self.encoder != *expected {
            return Err(TriageError::model_load(format!(
                "artifact encoder {}/{} does not match serving encoder {}/{}",
                self.encoder.name, self.encoder.dimension, expected.name, expected.dimension
            )));
        }

        let k = self.labels.len();
        if k < 2 {
            return Err(TriageError::model_load(format!(
                "artifact has {k} label(s); at least 2 are required"
            )));
        }
        let mut seen = HashSet::with_capacity(k);
        for label in &self.labels {
            if label.trim().is_empty() {
                return Err(TriageError::model_load("artifact contains a blank label"));
            }
            if !seen.insert(label.as_str()) {
                return Err(TriageError::model_load(format!(
                    "artifact label {label:?} appears more than once"
                )));
            }
        }

        if self.weights.len() != k || self.biases.len() != k {
            return Err(TriageError::model_load(format!(
                "artifact has {} weight rows and {} biases for {k} labels",
                self.weights.len(),
                self.biases.len()
            )));
        }
        for (i, row) in self.weights.iter().enumerate() {
            if row.len() != self.encoder.dimension {
                return Err(TriageError::model_load(format!(
                    "weight row {i} has length {} but dimension is {}",
                    row.len(),
                    self.encoder.dimension
                )));
            }
        }

        let finite = self
            .weights
            .iter()
            .flatten()
            .chain(self.biases.iter())
            .all(|v| v.is_finite());
        if !finite {
            return Err(TriageError::model_load("artifact contains non-finite parameters"));
        }

        Ok(())
    }

    /// Read and validate an artifact.
    ///
    /// # Errors
    ///
    /// [`TriageError::ModelLoad`] if the file is missing, unparseable, or
    /// fails [`validate`](Self::validate).
    pub fn load(path: &Path, expected: &EncoderSignature) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            TriageError::model_load(format!("cannot read {}: {e}", path.display()))
        })?;
        let artifact: ModelArtifact = serde_json::from_slice(&bytes).map_err(|e| {
            TriageError::model_load(format!("cannot parse {}: {e}", path.display()))
        })?;
        artifact.validate(expected)?;

        info!(
            path = %path.display(),
            version = %artifact.version,
            labels = artifact.labels.len(),
            training_rows = artifact.training_rows,
            "loaded model artifact"
        );
        Ok(artifact)
    }

    /// Persist atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        write_atomic(path, &bytes)?;
        Ok(())
    }

    /// Class probabilities for one encoded message, index-aligned with
    /// `labels`.
    ///
    /// # Errors
    ///
    /// [`TriageError::Internal`] if the vector length does not match the
    /// artifact's dimension.
    pub fn predict_proba(&self, vector: &[f32]) -> Result<Vec<f32>> {
        if vector.len() != self.encoder.dimension {
            return Err(TriageError::Internal(format!(
                "vector length {} != model dimension {}",
                vector.len(),
                self.encoder.dimension
            )));
        }
        let mut logits: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(row, b)| dot(row, vector) + b)
            .collect();
        softmax_in_place(&mut logits);
        Ok(logits)
    }

    /// Summary for status endpoints.
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            version: self.version.clone(),
            labels: self.labels.clone(),
            training_rows: self.training_rows,
            created_at: self.created_at,
            encoder: self.encoder.clone(),
        }
    }
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Numerically stable softmax.
pub(crate) fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}
