//! End-to-end routing and retrain scenarios over real files.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use logtriage_core::AppContext;
use logtriage_core::bootstrap::{build_encoder, build_trainer};
use logtriage_core::embeddings::Embedder;
use logtriage_core::embeddings::hash_embedder::HashEmbedder;
use logtriage_core::metrics::Metrics;
use logtriage_core::model::{LiveModel, ModelArtifact};
use logtriage_core::pipeline::{Classifier, EmbeddingClassifier, Pipeline};
use logtriage_core::rules::RuleMatcher;
use logtriage_core::table::CsvTable;
use logtriage_types::{LogRecord, Strategy, TriageConfig, TriageError, UNCLASSIFIED};

/// Legacy stage stand-in that always answers "Workflow Error".
struct WorkflowFallback;

#[async_trait]
impl Classifier for WorkflowFallback {
    async fn predict(&self, _message: &str) -> String {
        "Workflow Error".into()
    }
    fn strategy(&self) -> Strategy {
        Strategy::SemanticFallback
    }
}

fn config_in(dir: &std::path::Path) -> TriageConfig {
    let mut config = TriageConfig::default();
    config.storage.data_dir = dir.display().to_string();
    config.encoder.dimension = 128;
    config.training.epochs = 40;
    config
}

const CANONICAL: &str = "\
source,log_message,target_label
ModernCRM,Multiple bad login attempts on user 12,Security Alert
ModernHR,Unauthorized access attempt blocked,Security Alert
BillingSystem,Brute force login attempt detected,Security Alert
ModernCRM,Shard 6 replication task ended in failure,Error
ModernHR,Email service experienced a sending failure,Error
BillingSystem,Report export failed with permission error,Error
";

async fn booted(dir: &std::path::Path) -> (TriageConfig, AppContext) {
    let config = config_in(dir);
    let dataset = config.storage.dataset_path();
    std::fs::create_dir_all(dataset.parent().unwrap()).unwrap();
    std::fs::write(&dataset, CANONICAL).unwrap();
    build_trainer(&config, build_encoder(&config))
        .train_current()
        .await
        .unwrap();
    let ctx = AppContext::with_fallback(config.clone(), Arc::new(WorkflowFallback))
        .await
        .unwrap();
    (config, ctx)
}

fn dataset_rows(config: &TriageConfig) -> usize {
    CsvTable::read_path(&config.storage.dataset_path()).unwrap().len()
}

#[tokio::test]
async fn login_message_is_user_action_by_rule() {
    let dir = tempfile::tempdir().unwrap();
    let (_, ctx) = booted(dir.path()).await;

    let res = ctx
        .pipeline()
        .classify(LogRecord::new("ModernCRM", "User User123 logged in."))
        .await;
    assert_eq!(res.label, "User Action");
    assert_eq!(res.strategy, Strategy::Rule);
}

#[tokio::test]
async fn legacy_source_goes_to_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let (_, ctx) = booted(dir.path()).await;

    let res = ctx
        .pipeline()
        .classify(LogRecord::new("LegacyCRM", "Critical system failure detected"))
        .await;
    assert_eq!(res.label, "Workflow Error");
    assert_eq!(res.strategy, Strategy::SemanticFallback);
}

#[tokio::test]
async fn low_confidence_embedding_is_unclassified() {
    // Zero weights over three labels give max probability 1/3.
    let encoder = Arc::new(HashEmbedder::new(32));
    let artifact = ModelArtifact {
        version: "flat".into(),
        created_at: Utc::now(),
        encoder: encoder.signature(),
        labels: vec!["A".into(), "B".into(), "C".into()],
        weights: vec![vec![0.0; 32]; 3],
        biases: vec![0.0; 3],
        training_rows: 0,
    };
    let pipeline = Pipeline::new(
        "LegacyCRM",
        RuleMatcher::with_defaults().unwrap(),
        Arc::new(EmbeddingClassifier::new(encoder, LiveModel::new(artifact))),
        Arc::new(WorkflowFallback),
        Arc::new(Metrics::new()),
    );

    let res = pipeline
        .classify(LogRecord::new("ModernCRM", "hey bro chill yaa"))
        .await;
    assert_eq!(res.label, UNCLASSIFIED);
    assert_eq!(res.strategy, Strategy::Embedding);
}

#[tokio::test]
async fn retrain_with_one_blank_message_accepts_three() {
    let dir = tempfile::tempdir().unwrap();
    let (config, ctx) = booted(dir.path()).await;
    let before_rows = dataset_rows(&config);
    let before_version = ctx.live_model().version();

    let upload = CsvTable::parse(
        b"source,log_message,target_label\n\
          ModernCRM,Disk quota exceeded on volume 3,Error\n\
          ModernHR,Suspicious login from new device,Security Alert\n\
          BillingSystem,Nightly sync failed,Error\n\
          ModernCRM,,Error\n",
    )
    .unwrap();
    let outcome = ctx
        .trainer()
        .retrain(upload.labeled_examples().unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.accepted, 3);
    assert_eq!(dataset_rows(&config), before_rows + 3);
    assert_ne!(ctx.live_model().version(), before_version);
    assert_eq!(ctx.live_model().version(), outcome.version);
}

#[tokio::test]
async fn retrain_with_no_labels_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (config, ctx) = booted(dir.path()).await;
    let before_dataset = std::fs::read(config.storage.dataset_path()).unwrap();
    let before_artifact = std::fs::read(config.storage.model_path()).unwrap();
    let before_version = ctx.live_model().version();

    let upload = CsvTable::parse(
        b"source,log_message,target_label\n\
          ModernCRM,Disk quota exceeded,\n\
          ModernHR,Login storm,\n",
    )
    .unwrap();
    let err = ctx
        .trainer()
        .retrain(upload.labeled_examples().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, TriageError::Training { .. }));
    assert_eq!(std::fs::read(config.storage.dataset_path()).unwrap(), before_dataset);
    assert_eq!(std::fs::read(config.storage.model_path()).unwrap(), before_artifact);
    assert_eq!(ctx.live_model().version(), before_version);
}

#[tokio::test]
async fn upload_missing_column_is_validation_error() {
    let upload = CsvTable::parse(b"source,log_message\nA,b\n").unwrap();
    let err = upload.labeled_examples().unwrap_err();
    assert!(matches!(err, TriageError::Validation { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn classification_continues_during_retrain() {
    let dir = tempfile::tempdir().unwrap();
    let (_, ctx) = booted(dir.path()).await;
    let ctx = Arc::new(ctx);

    let readers: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = ctx.pipeline().clone();
            tokio::spawn(async move {
                let mut labels = Vec::new();
                for j in 0..50 {
                    let rec = LogRecord::new("ModernHR", format!("login failure burst {i} {j}"));
                    labels.push(pipeline.classify(rec).await.label);
                    tokio::task::yield_now().await;
                }
                labels
            })
        })
        .collect();

    let trainer = ctx.trainer().clone();
    let retrain = tokio::spawn(async move {
        trainer
            .retrain(vec![logtriage_types::LabeledExample::new(
                "ModernCRM",
                "Payment gateway timeout",
                "Error",
            )])
            .await
    });

    let valid = ["Security Alert", "Error", UNCLASSIFIED];
    for reader in readers {
        for label in reader.await.unwrap() {
            assert!(valid.contains(&label.as_str()), "unexpected label {label}");
        }
    }
    retrain.await.unwrap().unwrap();
}

#[tokio::test]
async fn scheduler_job_publishes_new_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (_, ctx) = booted(dir.path()).await;
    let before = ctx.live_model().version();

    let sub = ctx
        .scheduler()
        .submit(vec![logtriage_types::LabeledExample::new(
            "ModernCRM",
            "Payment gateway timeout",
            "Error",
        )])
        .unwrap();

    let mut finished = None;
    for _ in 0..300 {
        let job = ctx.scheduler().status(&sub.job_id).unwrap();
        if job.state.is_finished() {
            finished = Some(job);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let job = finished.expect("retrain job did not finish");
    assert!(matches!(
        job.state,
        logtriage_core::scheduler::JobState::Succeeded { .. }
    ));
    assert_ne!(ctx.live_model().version(), before);
}
