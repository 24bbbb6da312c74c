//! # logtriage-core
//!
//! Classification pipeline and model lifecycle for logtriage.
//!
//! Serving path: [`pipeline::Pipeline`] routes each record to the legacy
//! fallback, a [`rules::RuleMatcher`] hit, or the confidence-gated
//! embedding classifier reading the [`model::LiveModel`].
//!
//! Lifecycle: [`dataset::DatasetStore`] owns the canonical dataset,
//! [`trainer::ModelTrainer`] refits and publishes, and
//! [`scheduler::RetrainScheduler`] runs retrains off the request path.

pub mod bootstrap;
pub mod config_loader;
pub mod dataset;
pub mod embeddings;
pub mod metrics;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod rules;
pub mod scheduler;
pub mod table;
pub mod trainer;

pub use bootstrap::AppContext;
pub use metrics::{Metrics, MetricsSnapshot};
pub use pipeline::Pipeline;
