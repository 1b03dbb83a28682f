//! Reciprocal-rank fusion of the lexical and semantic rankings.
//!
//! A pure function over two score-ranked sequences, so it can be tested in
//! isolation from any index. The fused score of a chunk is
//!
//! ```text
//! score = w_lex / (K + rank_lex) + w_sem / (K + rank_sem)
//! ```
//!
//! with a missing rank contributing zero. Improving either method-local
//! rank strictly increases the fused score, so fusion is rank-monotonic by
//! construction. Ties break by chunk index, which is original document
//! order (source, position) in the committed corpus.

use crate::types::RetrievalMethod;

/// RRF rank constant. The conventional value; dampens the gap between
/// neighboring ranks further down the lists.
pub const RRF_K: f64 = 60.0;

/// Method weights for fusion.
#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub lexical: f64,
    pub semantic: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        // Semantic-leaning split, matching the ensemble weighting the
        // hybrid retriever was tuned with
        Self {
            lexical: 0.4,
            semantic: 0.6,
        }
    }
}

/// One entry of the fused ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    /// Chunk index into the committed corpus
    pub chunk_index: usize,

    /// Fused score
    pub score: f64,

    /// Methods that surfaced this chunk
    pub methods: Vec<RetrievalMethod>,
}

/// Merge two ranked result lists by chunk identity.
///
/// Inputs are (chunk_index, method_local_score) pairs in descending rank
/// order; only the rank positions matter. A chunk present in both lists
/// yields exactly one fused entry tagged with both methods.
pub fn reciprocal_rank_fusion(
    lexical: &[(usize, f64)],
    semantic: &[(usize, f64)],
    weights: FusionWeights,
) -> Vec<FusedHit> {
    // Deterministic accumulation: keyed map built from both lists, then
    // sorted with an explicit total order.
    let mut fused: std::collections::HashMap<usize, FusedHit> = std::collections::HashMap::new();

    for (rank, (chunk_index, _)) in lexical.iter().enumerate() {
        let contribution = weights.lexical / (RRF_K + (rank + 1) as f64);
        fused
            .entry(*chunk_index)
            .and_modify(|hit| {
                hit.score += contribution;
                hit.methods.push(RetrievalMethod::Lexical);
            })
            .or_insert(FusedHit {
                chunk_index: *chunk_index,
                score: contribution,
                methods: vec![RetrievalMethod::Lexical],
            });
    }

    for (rank, (chunk_index, _)) in semantic.iter().enumerate() {
        let contribution = weights.semantic / (RRF_K + (rank + 1) as f64);
        fused
            .entry(*chunk_index)
            .and_modify(|hit| {
                hit.score += contribution;
                hit.methods.push(RetrievalMethod::Semantic);
            })
            .or_insert(FusedHit {
                chunk_index: *chunk_index,
                score: contribution,
                methods: vec![RetrievalMethod::Semantic],
            });
    }

    let mut result: Vec<FusedHit> = fused.into_values().collect();
    result.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk_index.cmp(&b.chunk_index))
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(indices: &[usize]) -> Vec<(usize, f64)> {
        // Method-local scores are irrelevant to RRF; synthesize descending ones
        indices
            .iter()
            .enumerate()
            .map(|(rank, idx)| (*idx, 1.0 / (rank + 1) as f64))
            .collect()
    }

    #[test]
    fn test_deduplicates_shared_chunks() {
        let lexical = ranked(&[0, 1]);
        let semantic = ranked(&[1, 2]);

        let fused = reciprocal_rank_fusion(&lexical, &semantic, FusionWeights::default());

        assert_eq!(fused.len(), 3);
        let shared = fused.iter().find(|h| h.chunk_index == 1).unwrap();
        assert!(shared.methods.contains(&RetrievalMethod::Lexical));
        assert!(shared.methods.contains(&RetrievalMethod::Semantic));
    }

    #[test]
    fn test_shared_chunk_outranks_single_method() {
        // Chunk 1 is mid-ranked in both lists; chunk 0 and 2 top one each
        let lexical = ranked(&[0, 1]);
        let semantic = ranked(&[2, 1]);

        let weights = FusionWeights {
            lexical: 0.5,
            semantic: 0.5,
        };
        let fused = reciprocal_rank_fusion(&lexical, &semantic, weights);

        assert_eq!(fused[0].chunk_index, 1);
    }

    #[test]
    fn test_rank_monotonicity() {
        // Improve chunk 3's semantic rank (2nd -> 1st) with all else fixed;
        // its fused position must not worsen
        let lexical = ranked(&[0, 1, 2]);

        let before = reciprocal_rank_fusion(
            &lexical,
            &ranked(&[4, 3]),
            FusionWeights::default(),
        );
        let after = reciprocal_rank_fusion(
            &lexical,
            &ranked(&[3, 4]),
            FusionWeights::default(),
        );

        let pos = |fused: &[FusedHit]| fused.iter().position(|h| h.chunk_index == 3).unwrap();
        assert!(pos(&after) <= pos(&before));
    }

    #[test]
    fn test_ties_break_by_document_order() {
        // Symmetric weights, mirrored lists: chunks 5 and 9 get equal scores
        let weights = FusionWeights {
            lexical: 0.5,
            semantic: 0.5,
        };
        let fused = reciprocal_rank_fusion(&ranked(&[9, 5]), &ranked(&[5, 9]), weights);

        assert_eq!(fused.len(), 2);
        assert!((fused[0].score - fused[1].score).abs() < 1e-12);
        assert_eq!(fused[0].chunk_index, 5);
    }

    #[test]
    fn test_empty_inputs() {
        let fused = reciprocal_rank_fusion(&[], &[], FusionWeights::default());
        assert!(fused.is_empty());

        let only_lexical =
            reciprocal_rank_fusion(&ranked(&[1, 0]), &[], FusionWeights::default());
        assert_eq!(only_lexical.len(), 2);
        assert_eq!(only_lexical[0].chunk_index, 1);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let lexical = ranked(&[3, 1, 4]);
        let semantic = ranked(&[1, 5, 9]);

        let a = reciprocal_rank_fusion(&lexical, &semantic, FusionWeights::default());
        let b = reciprocal_rank_fusion(&lexical, &semantic, FusionWeights::default());
        assert_eq!(a, b);
    }
}
