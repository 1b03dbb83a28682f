//! Hybrid retriever: both searches, fused into one ranked result.

use crate::corpus::CorpusStore;
use crate::fusion::{reciprocal_rank_fusion, FusionWeights};
use crate::types::{EvidenceChunk, RetrievalResult};
use docchat_core::{AppError, AppResult};
use std::sync::Arc;

/// Hybrid evidence retriever over a corpus store.
///
/// Read-only: retrieval never mutates the indexes, so any number of
/// concurrent queries may share one retriever.
pub struct HybridRetriever {
    store: Arc<CorpusStore>,
    weights: FusionWeights,
}

impl HybridRetriever {
    pub fn new(store: Arc<CorpusStore>, weights: FusionWeights) -> Self {
        Self { store, weights }
    }

    /// Retrieve the top-k evidence chunks for a query.
    ///
    /// Runs the lexical and semantic searches independently (each up to
    /// `top_k` candidates), merges them by chunk identity with
    /// reciprocal-rank fusion, and returns the best `top_k` fused chunks
    /// in descending score order.
    ///
    /// An unknown or empty corpus is an `EmptyCorpus` error. Both searches
    /// coming back empty is not an error: the relevance gate decides what
    /// an empty result means.
    pub async fn retrieve(
        &self,
        query: &str,
        corpus_id: &str,
        top_k: usize,
    ) -> AppResult<RetrievalResult> {
        if top_k == 0 {
            return Err(AppError::Retrieval("top_k must be positive".to_string()));
        }

        let corpus = self
            .store
            .get(corpus_id)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::EmptyCorpus(corpus_id.to_string()))?;

        let lexical_hits = corpus.lexical.search(query, top_k);
        let semantic_hits = corpus.semantic.search(query, top_k).await?;

        tracing::debug!(
            "Retrieval for corpus '{}': {} lexical hits, {} semantic hits",
            corpus_id,
            lexical_hits.len(),
            semantic_hits.len()
        );

        let mut fused = reciprocal_rank_fusion(&lexical_hits, &semantic_hits, self.weights);
        fused.truncate(top_k);

        let chunks: Vec<EvidenceChunk> = fused
            .into_iter()
            .map(|hit| {
                let stored = &corpus.chunks[hit.chunk_index];
                EvidenceChunk {
                    id: stored.id.clone(),
                    source: stored.source.clone(),
                    position: stored.position,
                    text: stored.text.clone(),
                    score: hit.score,
                    methods: hit.methods,
                }
            })
            .collect();

        if chunks.is_empty() {
            tracing::info!("No evidence retrieved for query against '{}'", corpus_id);
        } else {
            tracing::info!(
                "Retrieved {} evidence chunks (top score: {:.4})",
                chunks.len(),
                chunks[0].score
            );
        }

        Ok(RetrievalResult { chunks })
    }
}
