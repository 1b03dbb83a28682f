//! Retrieval type definitions.

use serde::{Deserialize, Serialize};

/// A text chunk handed over by ingestion, before indexing.
///
/// Ingestion (layout parsing, OCR fallback) is an external collaborator;
/// it delivers chunks with source and positional metadata already attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkInput {
    /// Source document reference (file name or document title)
    pub source: String,

    /// Position within the source document
    pub position: u32,

    /// Text content
    pub text: String,
}

/// Which search method surfaced a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalMethod {
    Lexical,
    Semantic,
}

impl RetrievalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Semantic => "semantic",
        }
    }
}

/// A unit of retrieved evidence with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceChunk {
    /// Unique chunk identifier (unique within a merged result)
    pub id: String,

    /// Source document reference
    pub source: String,

    /// Position within the source document
    pub position: u32,

    /// Text content
    pub text: String,

    /// Fused relevance score
    pub score: f64,

    /// Retrieval methods that surfaced this chunk (deduplicated)
    pub methods: Vec<RetrievalMethod>,
}

impl EvidenceChunk {
    /// Whether this chunk was surfaced by the given method.
    pub fn retrieved_by(&self, method: RetrievalMethod) -> bool {
        self.methods.contains(&method)
    }
}

/// Ordered retrieval result, relevance-ranked descending.
///
/// Per-query lifetime: built for one turn and discarded with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunks: Vec<EvidenceChunk>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Ids of all chunks, in rank order.
    pub fn ids(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.id.clone()).collect()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.chunks.iter().any(|c| c.id == id)
    }

    /// Look up a chunk by id.
    pub fn get(&self, id: &str) -> Option<&EvidenceChunk> {
        self.chunks.iter().find(|c| c.id == id)
    }
}
