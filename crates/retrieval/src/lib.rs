//! Hybrid evidence retrieval for DocChat.
//!
//! Combines a lexical (BM25) index and a semantic (embedding cosine) index
//! over a committed corpus, merging both rankings with deterministic
//! reciprocal-rank fusion. Indexes are read-only once a corpus is
//! committed; concurrent queries never mutate them.

pub mod corpus;
pub mod embedding;
pub mod fusion;
pub mod lexical;
pub mod retriever;
pub mod semantic;
pub mod types;

// Re-export commonly used types
pub use corpus::{Corpus, CorpusStore};
pub use embedding::{EmbeddingProvider, TrigramEmbedder};
pub use fusion::FusionWeights;
pub use retriever::HybridRetriever;
pub use types::{ChunkInput, EvidenceChunk, RetrievalMethod, RetrievalResult};
