//! Corpus store: committed, queryable index pairs keyed by corpus id.
//!
//! Ingestion hands over pre-chunked text; committing a corpus builds both
//! sub-indexes up front. A committed corpus is immutable; concurrent
//! queries share it read-only through an `Arc` and never observe a
//! partially-indexed state.

use crate::embedding::EmbeddingProvider;
use crate::lexical::Bm25Index;
use crate::semantic::SemanticIndex;
use crate::types::ChunkInput;
use chrono::{DateTime, Utc};
use docchat_core::{AppError, AppResult};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

/// A chunk as stored in a committed corpus.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: String,
    pub source: String,
    pub position: u32,
    pub text: String,
}

/// A committed, queryable corpus.
pub struct Corpus {
    pub corpus_id: String,
    pub chunks: Vec<StoredChunk>,
    pub lexical: Bm25Index,
    pub semantic: SemanticIndex,
    pub committed_at: DateTime<Utc>,
    content_hash: u64,
}

impl Corpus {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }
}

/// Registry of committed corpora, keyed by corpus id.
pub struct CorpusStore {
    embedder: Arc<dyn EmbeddingProvider>,
    corpora: RwLock<HashMap<String, Arc<Corpus>>>,
}

impl CorpusStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            corpora: RwLock::new(HashMap::new()),
        }
    }

    /// Commit a corpus: sort chunks into document order, build both
    /// indexes, and register the result under `corpus_id`.
    ///
    /// Re-committing identical content under the same id is a no-op that
    /// returns the already-committed corpus (the upload-unchanged case).
    pub async fn commit(
        &self,
        corpus_id: &str,
        inputs: Vec<ChunkInput>,
    ) -> AppResult<Arc<Corpus>> {
        let content_hash = hash_inputs(&inputs);

        if let Some(existing) = self.get(corpus_id) {
            if existing.content_hash == content_hash {
                tracing::debug!(
                    "Corpus '{}' unchanged since {}, reusing committed indexes",
                    corpus_id,
                    existing.committed_at.to_rfc3339()
                );
                return Ok(existing);
            }
        }

        let mut inputs = inputs;
        inputs.sort_by(|a, b| a.source.cmp(&b.source).then(a.position.cmp(&b.position)));

        let chunks: Vec<StoredChunk> = inputs
            .into_iter()
            .map(|input| StoredChunk {
                id: uuid::Uuid::new_v4().to_string(),
                source: input.source,
                position: input.position,
                text: input.text,
            })
            .collect();

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let lexical = Bm25Index::build(&texts);
        let semantic = SemanticIndex::build(self.embedder.clone(), &texts).await?;

        let corpus = Arc::new(Corpus {
            corpus_id: corpus_id.to_string(),
            chunks,
            lexical,
            semantic,
            committed_at: Utc::now(),
            content_hash,
        });

        tracing::info!(
            "Committed corpus '{}' with {} chunks",
            corpus_id,
            corpus.len()
        );

        self.corpora
            .write()
            .map_err(|_| AppError::Retrieval("corpus store lock poisoned".to_string()))?
            .insert(corpus_id.to_string(), corpus.clone());

        Ok(corpus)
    }

    /// Look up a committed corpus.
    pub fn get(&self, corpus_id: &str) -> Option<Arc<Corpus>> {
        self.corpora
            .read()
            .ok()
            .and_then(|map| map.get(corpus_id).cloned())
    }
}

fn hash_inputs(inputs: &[ChunkInput]) -> u64 {
    let mut sorted: Vec<&ChunkInput> = inputs.iter().collect();
    sorted.sort_by(|a, b| a.source.cmp(&b.source).then(a.position.cmp(&b.position)));

    let mut hasher = DefaultHasher::new();
    for input in sorted {
        input.source.hash(&mut hasher);
        input.position.hash(&mut hasher);
        input.text.hash(&mut hasher);
    }
    hasher.finish()
}
