//! The atomically swappable serving artifact.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use super::artifact::ModelArtifact;

/// Shared handle to the artifact currently used for serving.
///
/// Cloning the handle shares the same slot. Readers take one
/// [`snapshot`](Self::snapshot) per classification and score against it;
/// a concurrent [`publish`](Self::publish) never affects a snapshot that is
/// already held.
#[derive(Clone)]
pub struct LiveModel {
    slot: Arc<ArcSwap<ModelArtifact>>,
}

impl LiveModel {
    /// Start serving `artifact`.
    pub fn new(artifact: ModelArtifact) -> Self {
        Self {
            slot: Arc::new(ArcSwap::from_pointee(artifact)),
        }
    }

    /// The live artifact, as a single atomic load.
    pub fn snapshot(&self) -> Arc<ModelArtifact> {
        self.slot.load_full()
    }

    /// Replace the live artifact with a single atomic store and return the
    /// one it replaced.
    pub fn publish(&self, artifact: ModelArtifact) -> Arc<ModelArtifact> {
        let next = Arc::new(artifact);
        let previous = self.slot.swap(next.clone());
        info!(
            previous = %previous.version,
            version = %next.version,
            labels = next.labels.len(),
            training_rows = next.training_rows,
            "published model artifact"
        );
        previous
    }

    /// Version tag of the live artifact.
    pub fn version(&self) -> String {
        self.slot.load().version.clone()
    }
}

impl std::fmt::Debug for LiveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveModel")
            .field("version", &self.slot.load().version)
            .finish()
    }
}
