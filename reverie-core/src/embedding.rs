//! Embedding provider seam.
//!
//! Semantic retrieval is an optional capability: the engine branches on
//! whether a provider was injected instead of assuming one exists, and a
//! provider failure degrades to keyword retrieval rather than erroring a
//! conversation turn. Real deployments wrap whatever model the host
//! process runs behind this trait; [`HashedEmbeddingProvider`] covers
//! tests and model-less deploys with deterministic, content-sensitive
//! vectors.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::error::Result;
use crate::types::Embedding;

/// Turns text into fixed-length vectors for cosine-similarity retrieval.
///
/// Implementations must be `Send + Sync`; the engine shares one provider
/// across all request handlers.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a vector of `dimensions()` floats.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReverieError::Embedding`] when no vector can be
    /// produced. The engine treats this as degradation, not failure.
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts. The default loops over [`embed`]; providers
    /// with a native batch API should override it.
    ///
    /// # Errors
    ///
    /// Fails if any single embedding fails.
    ///
    /// [`embed`]: EmbeddingProvider::embed
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Dimensionality of every vector this provider produces.
    fn dimensions(&self) -> usize;

    /// Human-readable model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Deterministic bag-of-tokens provider.
///
/// Each distinct lowercase token longer than two characters is hashed
/// into one of `dims` buckets; the bucket counts are L2-normalized.
/// Texts sharing words land near each other and disjoint texts read as
/// near-orthogonal, which is enough signal for tests and for deploys
/// that run without a learned model. Not a semantic model: synonyms
/// score zero.
pub struct HashedEmbeddingProvider {
    dims: usize,
}

impl HashedEmbeddingProvider {
    /// Create a provider producing `dimensions`-long vectors (minimum 1).
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dims: dimensions.max(1),
        }
    }
}

impl Default for HashedEmbeddingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EmbeddingProvider for HashedEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut buckets = vec![0.0_f32; self.dims];
        let mut seen: HashSet<String> = HashSet::new();

        for token in text.split(|c: char| !c.is_alphanumeric()) {
            if token.len() <= 2 {
                continue;
            }
            let token = token.to_lowercase();
            if !seen.insert(token.clone()) {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dims as u64) as usize;
            buckets[bucket] += 1.0;
        }

        // Token-less text embeds to the zero vector, which retrieval
        // treats as below any similarity threshold.
        let norm: f32 = buckets.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut buckets {
                *value /= norm;
            }
        }
        Ok(Embedding(buckets))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "hashed-bag-of-tokens"
    }
}
