//! Routes each record to exactly one stage.
//!
//! Routing, in fixed priority:
//!
//! 1. `source` equals the legacy source: semantic fallback only.
//! 2. Otherwise the first matching rule, if any.
//! 3. Otherwise the embedding classifier, possibly `Unclassified`.
//!
//! Once a stage runs its answer is final; there is no cross-stage retry.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, error};

use logtriage_types::{ClassificationResult, LogRecord, Strategy, UNCLASSIFIED};

use super::traits::Classifier;
use crate::metrics::Metrics;
use crate::rules::RuleMatcher;

/// The stages and routing key, shared by every in-flight classification.
struct Stages {
    legacy_source: String,
    rules: RuleMatcher,
    embedding: Arc<dyn Classifier>,
    fallback: Arc<dyn Classifier>,
}

impl Stages {
    /// The strategy `route` would report for `record`.
    fn strategy_for(&self, record: &LogRecord) -> Strategy {
        if record.source == self.legacy_source {
            self.fallback.strategy()
        } else if self.rules.match_label(&record.message).is_some() {
            Strategy::Rule
        } else {
            self.embedding.strategy()
        }
    }

    async fn route(&self, record: LogRecord) -> ClassificationResult {
        if record.source == self.legacy_source {
            let label = self.fallback.predict(&record.message).await;
            return ClassificationResult::new(record, label, self.fallback.strategy());
        }

        if let Some(label) = self.rules.match_label(&record.message) {
            let label = label.to_string();
            return ClassificationResult::new(record, label, Strategy::Rule);
        }

        let label = self.embedding.predict(&record.message).await;
        ClassificationResult::new(record, label, self.embedding.strategy())
    }
}

/// Single entry point for classification.
///
/// Cheap to clone; clones share stages and metrics.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<Stages>,
    metrics: Arc<Metrics>,
    batch_concurrency: usize,
}

impl Pipeline {
    pub fn new(
        legacy_source: impl Into<String>,
        rules: RuleMatcher,
        embedding: Arc<dyn Classifier>,
        fallback: Arc<dyn Classifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            stages: Arc::new(Stages {
                legacy_source: legacy_source.into(),
                rules,
                embedding,
                fallback,
            }),
            metrics,
            batch_concurrency: 8,
        }
    }

    /// How many records of one batch run concurrently (minimum 1).
    pub fn with_batch_concurrency(mut self, n: usize) -> Self {
        self.batch_concurrency = n.max(1);
        self
    }

    /// Classify one record. Counts as one request in [`Metrics`].
    pub async fn classify(&self, record: LogRecord) -> ClassificationResult {
        let started = Instant::now();
        let result = self.stages.route(record).await;
        self.metrics.record_label(&result.label);
        self.metrics.record_request(started.elapsed());
        result
    }

    /// Classify a batch, preserving order and length.
    ///
    /// Records run as independent tasks; a task that panics yields
    /// `Unclassified` for its record and the rest of the batch completes.
    /// The whole batch counts as one request in [`Metrics`].
    pub async fn classify_batch(&self, records: Vec<LogRecord>) -> Vec<ClassificationResult> {
        let started = Instant::now();
        let total = records.len();

        let results: Vec<ClassificationResult> = stream::iter(records)
            .map(|record| {
                let stages = self.stages.clone();
                let fallback_copy = record.clone();
                async move {
                    let task_stages = stages.clone();
                    match tokio::spawn(async move { task_stages.route(record).await }).await {
                        Ok(result) => result,
                        Err(e) => {
                            error!(error = %e, source = %fallback_copy.source, "classification task failed");
                            let strategy = stages.strategy_for(&fallback_copy);
                            ClassificationResult::new(fallback_copy, UNCLASSIFIED, strategy)
                        }
                    }
                }
            })
            .buffered(self.batch_concurrency)
            .collect()
            .await;

        for result in &results {
            self.metrics.record_label(&result.label);
        }
        self.metrics.record_request(started.elapsed());
        debug!(records = total, elapsed_ms = started.elapsed().as_millis() as u64, "batch classified");
        results
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn legacy_source(&self) -> &str {
        &self.stages.legacy_source
    }
}
