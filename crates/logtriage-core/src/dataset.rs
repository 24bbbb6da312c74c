//! The canonical labeled dataset.
//!
//! The dataset is a CSV file with columns `source`, `log_message`,
//! `target_label`. It only grows; rows are appended by merges and never
//! deduplicated. When no canonical file exists yet, the on-disk seed file
//! is used as the starting point, and failing that the bundled starter
//! dataset.
//!
//! A merge is split into [`DatasetStore::stage_merge`] (compute, no I/O
//! writes) and [`StagedMerge::commit`] (atomic replace) so the trainer can
//! fit on the merged rows before anything is persisted. Callers must
//! serialize merges; [`ModelTrainer`](crate::trainer::ModelTrainer) does.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use logtriage_types::config::StorageConfig;
use logtriage_types::{LabeledExample, Result, TriageError};

use crate::persist::write_atomic;
use crate::table::CsvTable;

/// Starter dataset compiled into the binary.
pub const STARTER_DATASET: &str = include_str!("../resources/synthetic_logs.csv");

/// Where the current dataset contents came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetOrigin {
    Canonical,
    SeedFile,
    Bundled,
}

/// Counts reported for one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Submitted rows that survived cleaning and were appended.
    pub accepted: usize,
    /// Submitted rows dropped for a blank message or label.
    pub rejected: usize,
    /// Rows in the dataset after the merge.
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    path: PathBuf,
    seed_path: Option<PathBuf>,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>, seed_path: Option<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed_path,
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(storage.dataset_path(), Some(storage.seed_dataset_path()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current dataset rows, cleaned.
    ///
    /// A canonical or seed file missing a required column is a `Training`
    /// error: the stored data cannot be trained on.
    pub fn load(&self) -> Result<(Vec<LabeledExample>, DatasetOrigin)> {
        let (table, origin) = if self.path.exists() {
            (CsvTable::read_path(&self.path)?, DatasetOrigin::Canonical)
        } else if let Some(seed) = &self.seed_path
            && seed.exists()
        {
            (CsvTable::read_path(seed)?, DatasetOrigin::SeedFile)
        } else {
            (CsvTable::parse(STARTER_DATASET.as_bytes())?, DatasetOrigin::Bundled)
        };

        let rows = table
            .labeled_examples()
            .map_err(|e| TriageError::training(format!("{origin:?} dataset unusable: {e}")))?;
        let rows: Vec<LabeledExample> = rows.into_iter().filter_map(LabeledExample::cleaned).collect();
        debug!(origin = ?origin, rows = rows.len(), "dataset loaded");
        Ok((rows, origin))
    }

    /// Clean `submitted` and append the survivors to the current rows,
    /// without writing anything.
    pub fn stage_merge(&self, submitted: Vec<LabeledExample>) -> Result<StagedMerge> {
        let submitted_count = submitted.len();
        let fresh: Vec<LabeledExample> = submitted.into_iter().filter_map(LabeledExample::cleaned).collect();
        let accepted = fresh.len();

        let (mut rows, origin) = self.load()?;
        rows.extend(fresh);

        Ok(StagedMerge {
            path: self.path.clone(),
            origin,
            accepted,
            rejected: submitted_count - accepted,
            total: rows.len(),
            rows,
        })
    }

    /// Stage and commit in one step.
    pub fn merge(&self, submitted: Vec<LabeledExample>) -> Result<MergeOutcome> {
        let staged = self.stage_merge(submitted)?;
        staged.commit()?;
        Ok(staged.outcome())
    }
}

/// A computed but not yet persisted merge.
#[derive(Debug, Clone)]
pub struct StagedMerge {
    path: PathBuf,
    pub origin: DatasetOrigin,
    pub accepted: usize,
    pub rejected: usize,
    pub total: usize,
    pub rows: Vec<LabeledExample>,
}

impl StagedMerge {
    pub fn outcome(&self) -> MergeOutcome {
        MergeOutcome {
            accepted: self.accepted,
            rejected: self.rejected,
            total: self.total,
        }
    }

    /// Atomically replace the canonical file with the merged rows.
    ///
    /// The returned handle can restore the previous file contents.
    pub fn commit(&self) -> Result<CommittedMerge> {
        let previous = match std::fs::read(&self.path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let bytes = CsvTable::from_examples(&self.rows).to_csv()?;
        write_atomic(&self.path, &bytes)?;
        info!(
            path = %self.path.display(),
            accepted = self.accepted,
            rejected = self.rejected,
            total = self.total,
            "dataset merged"
        );

        Ok(CommittedMerge {
            path: self.path.clone(),
            previous,
        })
    }
}

/// Undo handle for a committed merge.
#[derive(Debug)]
pub struct CommittedMerge {
    path: PathBuf,
    previous: Option<Vec<u8>>,
}

impl CommittedMerge {
    /// Put the canonical file back the way it was before the commit.
    pub fn rollback(self) -> Result<()> {
        match self.previous {
            Some(bytes) => write_atomic(&self.path, &bytes)?,
            None => match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        info!(path = %self.path.display(), "dataset merge rolled back");
        Ok(())
    }
}
