//! In-memory semantic index over provider embeddings.
//!
//! Embeddings are computed once at corpus commit; queries embed the query
//! text and rank chunks by cosine similarity.

use crate::embedding::EmbeddingProvider;
use docchat_core::AppResult;
use std::sync::Arc;

/// Cosine-similarity index over pre-embedded chunks.
pub struct SemanticIndex {
    embeddings: Vec<Vec<f32>>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl SemanticIndex {
    /// Build the index by embedding all chunk texts.
    pub async fn build(
        provider: Arc<dyn EmbeddingProvider>,
        texts: &[String],
    ) -> AppResult<Self> {
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            provider.embed_batch(texts).await?
        };

        Ok(Self {
            embeddings,
            provider,
        })
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Search for the top-k chunks most similar to the query.
    ///
    /// Returns (chunk_index, score) pairs in descending similarity order,
    /// ties broken by chunk index. Non-positive similarities are omitted
    /// (orthogonal chunks carry no evidence).
    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<(usize, f64)>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.provider.embed(query).await?;

        let mut scored: Vec<(usize, f64)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(idx, emb)| (idx, cosine_similarity(&query_embedding, emb)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Cosine similarity between two vectors.
///
/// Inputs from the embedding providers are unit-normalized, but the norms
/// are still computed so arbitrary vectors compare correctly in tests.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
