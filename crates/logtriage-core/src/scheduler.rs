//! Background retrain queue.
//!
//! Submissions go onto a bounded mpsc channel drained by one worker task,
//! so retrains run one at a time and never on a request handler. Job
//! state lives in a concurrent map and is polled by id. Only the most
//! recent finished jobs are kept; older ones are evicted on submit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use logtriage_types::{LabeledExample, Result, TriageError};

use crate::trainer::ModelTrainer;

const QUEUE_CAPACITY: usize = 16;

/// Finished jobs retained for polling.
pub const DEFAULT_FINISHED_JOBS: usize = 256;

/// Where a retrain job is in its life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded {
        version: String,
        training_rows: usize,
        message: String,
    },
    Failed {
        error: String,
    },
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Succeeded { .. } | JobState::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrainJob {
    pub job_id: Uuid,
    /// Submitted rows that pass cleaning.
    pub accepted_row_count: usize,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub state: JobState,
}

/// Receipt for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub job_id: Uuid,
    pub accepted_row_count: usize,
    pub status_message: String,
}

struct Request {
    id: Uuid,
    rows: Vec<LabeledExample>,
}

#[derive(Clone)]
pub struct RetrainScheduler {
    tx: mpsc::Sender<Request>,
    jobs: Arc<DashMap<Uuid, RetrainJob>>,
    keep_finished: usize,
}

impl RetrainScheduler {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(trainer: Arc<ModelTrainer>) -> Self {
        Self::spawn_with_history(trainer, DEFAULT_FINISHED_JOBS)
    }

    /// Like [`spawn`](Self::spawn), keeping at most `keep_finished`
    /// finished jobs pollable.
    pub fn spawn_with_history(trainer: Arc<ModelTrainer>, keep_finished: usize) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let jobs = Arc::new(DashMap::new());
        tokio::spawn(run_worker(trainer, rx, jobs.clone()));
        debug!(capacity = QUEUE_CAPACITY, keep_finished, "retrain worker started");
        Self {
            tx,
            jobs,
            keep_finished,
        }
    }

    /// Queue a retrain and return immediately.
    ///
    /// # Errors
    ///
    /// [`TriageError::Training`] if no row survives cleaning (nothing is
    /// queued), or [`TriageError::Internal`] if the queue is full or the
    /// worker has stopped.
    pub fn submit(&self, rows: Vec<LabeledExample>) -> Result<Submission> {
        let accepted = rows.iter().filter(|r| r.is_valid()).count();
        if accepted == 0 {
            return Err(TriageError::training(
                "no rows with valid log_message and target_label",
            ));
        }

        self.evict_finished();
        let id = Uuid::new_v4();
        self.jobs.insert(
            id,
            RetrainJob {
                job_id: id,
                accepted_row_count: accepted,
                submitted_at: Utc::now(),
                finished_at: None,
                state: JobState::Queued,
            },
        );

        if let Err(e) = self.tx.try_send(Request { id, rows }) {
            self.jobs.remove(&id);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => {
                    TriageError::Internal("retrain queue full; try again later".into())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    TriageError::Internal("retrain worker is not running".into())
                }
            });
        }

        info!(job_id = %id, accepted, "retrain queued");
        Ok(Submission {
            job_id: id,
            accepted_row_count: accepted,
            status_message: format!("retrain queued with {accepted} new row(s)"),
        })
    }

    pub fn status(&self, id: &Uuid) -> Option<RetrainJob> {
        self.jobs.get(id).map(|j| j.clone())
    }

    /// Drop the oldest finished jobs beyond `keep_finished`. Queued and
    /// running jobs are never evicted.
    fn evict_finished(&self) {
        let mut finished: Vec<(DateTime<Utc>, Uuid)> = self
            .jobs
            .iter()
            .filter_map(|entry| entry.finished_at.map(|at| (at, entry.job_id)))
            .collect();
        if finished.len() <= self.keep_finished {
            return;
        }
        finished.sort_unstable();
        let excess = finished.len() - self.keep_finished;
        for (_, id) in finished.into_iter().take(excess) {
            self.jobs.remove(&id);
        }
        debug!(evicted = excess, "evicted finished retrain jobs");
    }

    fn set_state(jobs: &DashMap<Uuid, RetrainJob>, id: &Uuid, state: JobState) {
        if let Some(mut job) = jobs.get_mut(id) {
            if state.is_finished() {
                job.finished_at = Some(Utc::now());
            }
            job.state = state;
        }
    }
}

async fn run_worker(
    trainer: Arc<ModelTrainer>,
    mut rx: mpsc::Receiver<Request>,
    jobs: Arc<DashMap<Uuid, RetrainJob>>,
) {
    while let Some(Request { id, rows }) = rx.recv().await {
        RetrainScheduler::set_state(&jobs, &id, JobState::Running);
        info!(job_id = %id, "retrain started");

        let state = match trainer.retrain(rows).await {
            Ok(outcome) => {
                info!(job_id = %id, version = %outcome.version, "retrain succeeded");
                JobState::Succeeded {
                    version: outcome.version,
                    training_rows: outcome.training_rows,
                    message: outcome.message,
                }
            }
            Err(e) => {
                warn!(job_id = %id, error = %e, "retrain failed");
                JobState::Failed {
                    error: e.to_string(),
                }
            }
        };
        RetrainScheduler::set_state(&jobs, &id, state);
    }
    debug!("retrain worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetStore;
    use crate::embeddings::hash_embedder::HashEmbedder;
    use crate::model::LiveModel;
    use crate::model::artifact::tests::uniform_artifact;
    use logtriage_types::config::TrainingConfig;
    use std::time::Duration;

    fn scheduler(dir: &std::path::Path) -> (RetrainScheduler, LiveModel) {
        let dataset = dir.join("labeled.csv");
        std::fs::write(
            &dataset,
            "source,log_message,target_label\n\
             A,Multiple bad login attempts,Security Alert\n\
             B,Replication task failed,Error\n",
        )
        .unwrap();
        let live = LiveModel::new(uniform_artifact(&["A", "B"], 32));
        let trainer = ModelTrainer::new(
            DatasetStore::new(dataset, None),
            Arc::new(HashEmbedder::new(32)),
            dir.join("model.json"),
            TrainingConfig {
                epochs: 10,
                ..TrainingConfig::default()
            },
        )
        .with_live(live.clone());
        (RetrainScheduler::spawn(Arc::new(trainer)), live)
    }

    async fn wait_finished(s: &RetrainScheduler, id: &Uuid) -> RetrainJob {
        for _ in 0..200 {
            if let Some(job) = s.status(id)
                && job.state.is_finished()
            {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not finish");
    }

    #[tokio::test]
    async fn submit_returns_before_training_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let (s, live) = scheduler(dir.path());

        let sub = s
            .submit(vec![
                LabeledExample::new("C", "Email delivery failed", "Error"),
                LabeledExample::new("C", "", "Error"),
            ])
            .unwrap();
        assert_eq!(sub.accepted_row_count, 1);

        let job = wait_finished(&s, &sub.job_id).await;
        match job.state {
            JobState::Succeeded {
                version,
                training_rows,
                ..
            } => {
                assert_eq!(training_rows, 3);
                assert_eq!(live.version(), version);
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(job.finished_at.is_some());
    }

    #[tokio::test]
    async fn all_invalid_rows_are_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let (s, _) = scheduler(dir.path());
        let err = s
            .submit(vec![LabeledExample::new("C", "msg", "")])
            .unwrap_err();
        assert!(matches!(err, TriageError::Training { .. }));
    }

    #[tokio::test]
    async fn failed_job_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let (s, live) = scheduler(dir.path());
        // Corrupt the dataset after startup so the run itself fails.
        std::fs::write(dir.path().join("labeled.csv"), "source,log_message\nA,b\n").unwrap();

        let sub = s
            .submit(vec![LabeledExample::new("C", "Email delivery failed", "Error")])
            .unwrap();
        let job = wait_finished(&s, &sub.job_id).await;
        assert!(matches!(job.state, JobState::Failed { ref error } if error.contains("training failed")));
        assert_eq!(live.version(), "test-uniform");
    }

    #[tokio::test]
    async fn oldest_finished_jobs_are_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let (s, _) = scheduler(dir.path());
        let s = RetrainScheduler {
            keep_finished: 2,
            ..s
        };

        let mut ids = Vec::new();
        for i in 0..4 {
            let sub = s
                .submit(vec![LabeledExample::new("C", format!("Email delivery failed {i}"), "Error")])
                .unwrap();
            wait_finished(&s, &sub.job_id).await;
            ids.push(sub.job_id);
        }

        let latest = s
            .submit(vec![LabeledExample::new("C", "Queue stalled", "Error")])
            .unwrap();
        assert!(s.status(&ids[0]).is_none());
        assert!(s.status(&ids[1]).is_none());
        assert!(s.status(&ids[2]).is_some());
        assert!(s.status(&ids[3]).is_some());
        assert!(s.status(&latest.job_id).is_some());
    }

    #[tokio::test]
    async fn unknown_job_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let (s, _) = scheduler(dir.path());
        assert!(s.status(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn job_state_serializes_with_status_tag() {
        let json = serde_json::to_value(JobState::Failed {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
    }
}
