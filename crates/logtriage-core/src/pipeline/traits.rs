//! Stage trait shared by the learned and semantic classifiers.

use async_trait::async_trait;

use logtriage_types::Strategy;

/// A pipeline stage that always yields a label.
///
/// `predict` is total: every failure mode inside a stage degrades to
/// [`UNCLASSIFIED`](logtriage_types::UNCLASSIFIED) instead of surfacing an
/// error, so one bad record never aborts a batch.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Label for `message`, or `"Unclassified"`.
    async fn predict(&self, message: &str) -> String;

    /// Which strategy this stage reports in results.
    fn strategy(&self) -> Strategy;
}
