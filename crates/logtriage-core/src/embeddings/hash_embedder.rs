//! SimHash-style local encoder.
//!
//! Produces deterministic, fixed-dimension embeddings by hashing word
//! unigrams and bigrams with FNV-1a and spreading the hash bits across a
//! float vector as +1/-1 votes. The result is normalized to unit length.
//!
//! The hash must stay stable across processes and Rust releases, since
//! persisted artifacts are scored against freshly encoded vectors.

use std::hash::Hasher;

use async_trait::async_trait;
use fnv::FnvHasher;

use super::{Embedder, EmbeddingError};

/// Encoder name recorded in model artifacts.
pub const HASH_EMBEDDER_NAME: &str = "hash-fnv-bigram-v1";

/// Deterministic bag-of-ngrams encoder.
///
/// # Algorithm
///
/// 1. Lowercase the message and split it on non-alphanumeric characters.
///    Digits are folded to `0` so `User123` and `User456` share a token.
/// 2. Features are every token plus every adjacent token pair.
/// 3. For each 64-dimension block `b`, hash `(b, feature)` with FNV-1a and
///    add +1.0 to dimension `64b + j` if bit `j` is set, else -1.0.
/// 4. L2-normalize.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create an encoder with the given output dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Create an encoder with the default dimension of 384.
    pub fn default_dimension() -> Self {
        Self::new(384)
    }

    /// Encode synchronously.
    pub fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::Internal("dimension must be > 0".into()));
        }

        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "message has no encodable tokens".into(),
            ));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for token in &tokens {
            self.accumulate(&mut vector, token);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]));
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut vector {
                *val /= norm;
            }
        }
        Ok(vector)
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str) {
        for (block, chunk) in vector.chunks_mut(64).enumerate() {
            let hash = feature_hash(feature, block as u64);
            for (j, val) in chunk.iter_mut().enumerate() {
                if (hash >> j) & 1 == 1 {
                    *val += 1.0;
                } else {
                    *val -= 1.0;
                }
            }
        }
    }
}

fn feature_hash(feature: &str, block: u64) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(&block.to_le_bytes());
    hasher.write(feature.as_bytes());
    hasher.finish()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.chars()
                .flat_map(char::to_lowercase)
                .map(|c| if c.is_ascii_digit() { '0' } else { c })
                .collect()
        })
        .collect()
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.encode(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.encode(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        HASH_EMBEDDER_NAME
    }
}
