//! Model artifact, trainer, and the live serving slot.

pub mod artifact;
pub mod fit;
pub mod live;

pub use artifact::{EncoderSignature, ModelArtifact, ModelSummary};
pub use fit::fit;
pub use live::LiveModel;
