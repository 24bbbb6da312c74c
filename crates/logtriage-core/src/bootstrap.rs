//! Application bootstrap and dependency wiring.
//!
//! [`AppContext`] builds every component from a [`TriageConfig`]: one
//! shared encoder, the live model loaded from disk, rules, both
//! classifier stages, the pipeline, the trainer and the retrain worker.
//!
//! ```rust,ignore
//! let (config, _) = logtriage_core::config_loader::load_config(None)?;
//! let ctx = AppContext::new(config).await?;
//! let result = ctx.pipeline().classify(record).await;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use logtriage_types::{Result, TriageConfig};

use crate::dataset::DatasetStore;
use crate::embeddings::Embedder;
use crate::embeddings::hash_embedder::HashEmbedder;
use crate::metrics::Metrics;
use crate::model::{LiveModel, ModelArtifact};
use crate::pipeline::{Classifier, EmbeddingClassifier, Pipeline, SemanticFallbackClassifier};
use crate::rules::RuleMatcher;
use crate::scheduler::RetrainScheduler;
use crate::trainer::ModelTrainer;

/// The encoder described by `config`.
pub fn build_encoder(config: &TriageConfig) -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(config.encoder.dimension))
}

/// A trainer that writes the configured artifact path without publishing.
pub fn build_trainer(config: &TriageConfig, encoder: Arc<dyn Embedder>) -> ModelTrainer {
    ModelTrainer::new(
        DatasetStore::from_config(&config.storage),
        encoder,
        config.storage.model_path(),
        config.training.clone(),
    )
}

/// Fully initialized application context.
pub struct AppContext {
    config: TriageConfig,
    live: LiveModel,
    metrics: Arc<Metrics>,
    pipeline: Pipeline,
    trainer: Arc<ModelTrainer>,
    scheduler: RetrainScheduler,
    started_at: Instant,
}

impl AppContext {
    /// Initialize everything, with the HTTP fallback described by
    /// `config.fallback`. Must run inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ModelLoad`](logtriage_types::TriageError::ModelLoad) if the
    /// artifact is missing or incompatible, and
    /// [`ConfigInvalid`](logtriage_types::TriageError::ConfigInvalid) for a
    /// malformed rule.
    pub async fn new(config: TriageConfig) -> Result<Self> {
        let metrics = Arc::new(Metrics::new());
        let fallback = Arc::new(SemanticFallbackClassifier::from_config(
            &config.fallback,
            metrics.clone(),
        ));
        Self::build(config, fallback, metrics)
    }

    /// Initialize with a caller-supplied fallback stage.
    pub async fn with_fallback(config: TriageConfig, fallback: Arc<dyn Classifier>) -> Result<Self> {
        Self::build(config, fallback, Arc::new(Metrics::new()))
    }

    fn build(
        config: TriageConfig,
        fallback: Arc<dyn Classifier>,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        info!("bootstrapping application context");

        let rules = RuleMatcher::new(&config.pipeline.rules)?;
        debug!(rules = rules.len(), "rules compiled");

        let encoder = build_encoder(&config);
        let model_path = config.storage.model_path();
        let artifact = ModelArtifact::load(&model_path, &encoder.signature())?;
        let live = LiveModel::new(artifact);

        let embedding = Arc::new(EmbeddingClassifier::new(encoder.clone(), live.clone()));
        let pipeline = Pipeline::new(
            config.pipeline.legacy_source.clone(),
            rules,
            embedding,
            fallback,
            metrics.clone(),
        )
        .with_batch_concurrency(config.pipeline.batch_concurrency);

        let trainer = Arc::new(build_trainer(&config, encoder).with_live(live.clone()));
        let scheduler = RetrainScheduler::spawn(trainer.clone());

        info!(
            model = %model_path.display(),
            version = %live.version(),
            legacy_source = %config.pipeline.legacy_source,
            "application context ready"
        );

        Ok(Self {
            config,
            live,
            metrics,
            pipeline,
            trainer,
            scheduler,
            started_at: Instant::now(),
        })
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn live_model(&self) -> &LiveModel {
        &self.live
    }

    pub fn trainer(&self) -> &Arc<ModelTrainer> {
        &self.trainer
    }

    pub fn scheduler(&self) -> &RetrainScheduler {
        &self.scheduler
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtriage_types::TriageError;
    use logtriage_types::config::RuleConfig;

    fn config_in(dir: &std::path::Path) -> TriageConfig {
        let mut config = TriageConfig::default();
        config.storage.data_dir = dir.display().to_string();
        config.encoder.dimension = 64;
        config.training.epochs = 10;
        config
    }

    #[tokio::test]
    async fn missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppContext::new(config_in(dir.path())).await.err().unwrap();
        assert!(matches!(err, TriageError::ModelLoad { .. }));
    }

    #[tokio::test]
    async fn artifact_from_other_dimension_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        build_trainer(&config, build_encoder(&config))
            .train_current()
            .await
            .unwrap();

        let mut other = config_in(dir.path());
        other.encoder.dimension = 128;
        let err = AppContext::new(other).await.err().unwrap();
        assert!(err.to_string().contains("does not match serving encoder"));
    }

    #[tokio::test]
    async fn malformed_rule_prevents_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        build_trainer(&config, build_encoder(&config))
            .train_current()
            .await
            .unwrap();
        config.pipeline.rules.push(RuleConfig {
            pattern: "(unclosed".into(),
            label: "X".into(),
        });
        let err = AppContext::new(config).await.err().unwrap();
        assert!(matches!(err, TriageError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn boots_after_training() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let outcome = build_trainer(&config, build_encoder(&config))
            .train_current()
            .await
            .unwrap();

        let ctx = AppContext::new(config).await.unwrap();
        assert_eq!(ctx.live_model().version(), outcome.version);
        assert_eq!(ctx.pipeline().legacy_source(), "LegacyCRM");
    }
}
