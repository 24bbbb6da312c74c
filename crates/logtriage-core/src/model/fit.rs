//! Softmax regression trainer.
//!
//! Fits one weight row and bias per label with shuffled stochastic
//! gradient descent on the cross-entropy loss plus L2 weight decay. The
//! shuffle is seeded, so identical inputs produce identical artifacts
//! (apart from version and timestamp).

use std::collections::BTreeSet;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use logtriage_types::config::TrainingConfig;
use logtriage_types::{Result, TriageError};

use super::artifact::{EncoderSignature, ModelArtifact, softmax_in_place};

/// Fit a new artifact from encoded messages and their labels.
///
/// Labels are sorted, so the label order in the artifact does not depend
/// on row order.
///
/// # Errors
///
/// [`TriageError::Training`] if there are no rows, fewer than two distinct
/// labels, a vector has the wrong length, or the fit diverges.
pub fn fit(
    vectors: &[Vec<f32>],
    labels: &[String],
    encoder: EncoderSignature,
    params: &TrainingConfig,
) -> Result<ModelArtifact> {
    if vectors.len() != labels.len() {
        return Err(TriageError::Internal(format!(
            "{} vectors for {} labels",
            vectors.len(),
            labels.len()
        )));
    }
    if vectors.is_empty() {
        return Err(TriageError::training("dataset has no usable rows"));
    }

    let classes: Vec<String> = labels
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if classes.len() < 2 {
        return Err(TriageError::training(format!(
            "dataset has {} distinct label(s); at least 2 are required",
            classes.len()
        )));
    }

    let dim = encoder.dimension;
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
        return Err(TriageError::training(format!(
            "row {i} encoded to length {} but encoder dimension is {dim}",
            v.len()
        )));
    }

    let targets: Vec<usize> = labels
        .iter()
        .map(|l| classes.binary_search(l).unwrap_or_default())
        .collect();

    let k = classes.len();
    let mut weights = vec![vec![0.0f32; dim]; k];
    let mut biases = vec![0.0f32; k];
    let mut order: Vec<usize> = (0..vectors.len()).collect();
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut probs = vec![0.0f32; k];

    for epoch in 0..params.epochs {
        order.shuffle(&mut rng);
        let lr = params.learning_rate / (1.0 + 0.05 * epoch as f32);
        let mut loss = 0.0f32;

        for &idx in &order {
            let x = &vectors[idx];
            for c in 0..k {
                probs[c] = super::artifact::dot(&weights[c], x) + biases[c];
            }
            softmax_in_place(&mut probs);
            loss -= probs[targets[idx]].max(1e-12).ln();

            for c in 0..k {
                let grad = probs[c] - if c == targets[idx] { 1.0 } else { 0.0 };
                let row = &mut weights[c];
                for (w, xi) in row.iter_mut().zip(x) {
                    *w -= lr * (grad * xi + params.l2 * *w);
                }
                biases[c] -= lr * grad;
            }
        }

        if epoch % 10 == 0 || epoch + 1 == params.epochs {
            debug!(epoch, loss = loss / vectors.len() as f32, "fit epoch");
        }
    }

    let finite = weights
        .iter()
        .flatten()
        .chain(biases.iter())
        .all(|v| v.is_finite());
    if !finite {
        return Err(TriageError::training(
            "fit diverged; lower training.learning_rate",
        ));
    }

    let created_at = Utc::now();
    Ok(ModelArtifact {
        version: ModelArtifact::new_version(created_at),
        created_at,
        encoder,
        labels: classes,
        weights,
        biases,
        training_rows: vectors.len(),
    })
}
