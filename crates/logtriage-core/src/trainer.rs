//! Retraining and artifact publication.
//!
//! A training run never touches the artifact that is serving. The new
//! artifact is fitted off to the side, persisted, and only then swapped
//! into the [`LiveModel`] with a single atomic store. Runs are serialized
//! by an async mutex that classification never takes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use logtriage_types::config::TrainingConfig;
use logtriage_types::{LabeledExample, Result, TriageError};

use crate::dataset::DatasetStore;
use crate::embeddings::{Embedder, EmbeddingError};
use crate::model::{LiveModel, ModelArtifact, fit};

/// Result of a successful training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainOutcome {
    pub version: String,
    /// Rows the model was fitted on.
    pub training_rows: usize,
    /// Submitted rows appended to the dataset (0 for `train_current`).
    pub accepted: usize,
    /// Submitted rows dropped during cleaning.
    pub rejected: usize,
    pub message: String,
}

pub struct ModelTrainer {
    store: DatasetStore,
    encoder: Arc<dyn Embedder>,
    model_path: PathBuf,
    params: TrainingConfig,
    live: Option<LiveModel>,
    lock: Mutex<()>,
}

impl ModelTrainer {
    /// A trainer that persists artifacts but publishes nowhere.
    pub fn new(
        store: DatasetStore,
        encoder: Arc<dyn Embedder>,
        model_path: impl Into<PathBuf>,
        params: TrainingConfig,
    ) -> Self {
        Self {
            store,
            encoder,
            model_path: model_path.into(),
            params,
            live: None,
            lock: Mutex::new(()),
        }
    }

    /// Publish successful runs to `live`.
    pub fn with_live(mut self, live: LiveModel) -> Self {
        self.live = Some(live);
        self
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Merge `submitted` into the dataset and retrain on the result.
    ///
    /// On any error the dataset file, artifact file and live artifact are
    /// left as they were.
    ///
    /// # Errors
    ///
    /// [`TriageError::Training`] if no submitted row survives cleaning, the
    /// stored dataset is unusable, or the fit fails.
    pub async fn retrain(&self, submitted: Vec<LabeledExample>) -> Result<TrainOutcome> {
        let _guard = self.lock.lock().await;
        let started = Instant::now();

        let staged = self.store.stage_merge(submitted)?;
        if staged.accepted == 0 {
            return Err(TriageError::training(
                "no rows with valid log_message and target_label",
            ));
        }

        let artifact = self.fit_rows(&staged.rows).await?;

        let committed = staged.commit()?;
        if let Err(e) = artifact.save(&self.model_path) {
            if let Err(rollback_err) = committed.rollback() {
                error!(error = %rollback_err, "dataset rollback failed after artifact write error");
            }
            return Err(e);
        }

        let outcome = self.finish(artifact, staged.accepted, staged.rejected);
        info!(
            version = %outcome.version,
            accepted = outcome.accepted,
            rejected = outcome.rejected,
            training_rows = outcome.training_rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrain complete"
        );
        Ok(outcome)
    }

    /// Fit on the current dataset (canonical, seed, or bundled) without
    /// merging anything.
    pub async fn train_current(&self) -> Result<TrainOutcome> {
        let _guard = self.lock.lock().await;

        let (rows, origin) = self.store.load()?;
        let artifact = self.fit_rows(&rows).await?;
        artifact.save(&self.model_path)?;

        let outcome = self.finish(artifact, 0, 0);
        info!(
            origin = ?origin,
            version = %outcome.version,
            training_rows = outcome.training_rows,
            "trained from current dataset"
        );
        Ok(outcome)
    }

    fn finish(&self, artifact: ModelArtifact, accepted: usize, rejected: usize) -> TrainOutcome {
        let outcome = TrainOutcome {
            version: artifact.version.clone(),
            training_rows: artifact.training_rows,
            accepted,
            rejected,
            message: format!(
                "Model saved to {} (trained on {} rows)",
                self.model_path.display(),
                artifact.training_rows
            ),
        };
        if let Some(live) = &self.live {
            live.publish(artifact);
        }
        outcome
    }

    /// Encode every row with the serving encoder and fit on a blocking
    /// thread. Rows the encoder rejects are skipped.
    async fn fit_rows(&self, rows: &[LabeledExample]) -> Result<ModelArtifact> {
        let mut vectors = Vec::with_capacity(rows.len());
        let mut labels = Vec::with_capacity(rows.len());
        for row in rows {
            match self.encoder.embed(&row.message).await {
                Ok(v) => {
                    vectors.push(v);
                    labels.push(row.label.clone());
                }
                Err(EmbeddingError::InvalidInput(reason)) => {
                    warn!(message = %row.message, %reason, "skipping unencodable training row");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let signature = self.encoder.signature();
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || fit(&vectors, &labels, signature, &params))
            .await
            .map_err(|e| TriageError::Internal(format!("training task failed: {e}")))?
    }
}
