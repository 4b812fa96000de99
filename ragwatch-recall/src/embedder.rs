//! Embedding generation for similarity search
//!
//! Provides the `Embedder` trait and `CharCodeEmbedder`, a deterministic
//! stand-in that needs no model. It buckets character codes, so texts that
//! share characters land close together; it carries no semantics and is
//! meant for tests, demos, and offline runs.

use async_trait::async_trait;
use thiserror::Error;

use ragwatch_core::RagwatchError;

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inference failed: {0}")]
    InferenceError(String),
}

impl From<EmbedderError> for RagwatchError {
    fn from(err: EmbedderError) -> Self {
        RagwatchError::Embedding(err.to_string())
    }
}

/// Result type for embedder operations
pub type EmbedderResult<T> = Result<T, EmbedderError>;

/// Trait for generating text embeddings
///
/// Implementations must return vectors of exactly `dimensions()` entries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> EmbedderResult<Vec<f32>>;

    /// Generate embeddings for multiple texts in a batch
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> EmbedderResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Returns the dimensionality of generated embeddings
    fn dimensions(&self) -> usize;
}

/// Character-code bucket embedder.
///
/// Each character adds one to bucket `code % dimensions`; the result is
/// L2-normalized. Case is folded first.
#[derive(Debug, Clone)]
pub struct CharCodeEmbedder {
    dimensions: usize,
}

impl CharCodeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for CharCodeEmbedder {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for CharCodeEmbedder {
    async fn embed(&self, text: &str) -> EmbedderResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbedderError::InvalidInput("text is empty".into()));
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for c in text.chars().flat_map(char::to_lowercase) {
            if c.is_whitespace() {
                continue;
            }
            vector[c as usize % self.dimensions] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Compute cosine similarity between two embedding vectors
///
/// Returns a value in [-1, 1] where 1 means identical direction, and 0 when
/// either vector has zero magnitude or the lengths differ. Accumulates in
/// `f64` so any finite `f32` input stays finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
    }
}
