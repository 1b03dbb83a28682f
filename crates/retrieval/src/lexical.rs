//! In-memory BM25 lexical index.
//!
//! Standard Okapi BM25 (k1 = 1.2, b = 0.75) over whitespace/punctuation
//! tokens. Built once at corpus commit; read-only afterwards.

use std::collections::HashMap;

const K1: f64 = 1.2;
const B: f64 = 0.75;

/// BM25 index over the corpus chunk texts.
///
/// Search results reference chunks by their corpus position (index into the
/// committed chunk list), which also serves as the document-order tie-break.
#[derive(Debug, Default)]
pub struct Bm25Index {
    /// Per-document term frequencies
    doc_terms: Vec<HashMap<String, u32>>,

    /// Per-document token counts
    doc_lens: Vec<usize>,

    /// Number of documents containing each term
    doc_freqs: HashMap<String, u32>,

    /// Average document length
    avg_doc_len: f64,
}

/// Lowercase alphanumeric tokenization shared by indexing and querying.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| t.to_string())
        .collect()
}

impl Bm25Index {
    /// Build the index from chunk texts.
    pub fn build(texts: &[String]) -> Self {
        let mut doc_terms = Vec::with_capacity(texts.len());
        let mut doc_lens = Vec::with_capacity(texts.len());
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for text in texts {
            let tokens = tokenize(text);
            doc_lens.push(tokens.len());

            let mut terms: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *terms.entry(token).or_insert(0) += 1;
            }

            for term in terms.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }

            doc_terms.push(terms);
        }

        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f64 / doc_lens.len() as f64
        };

        Self {
            doc_terms,
            doc_lens,
            doc_freqs,
            avg_doc_len,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_terms.is_empty()
    }

    /// Search for the top-k chunks matching the query.
    ///
    /// Returns (chunk_index, score) pairs in descending score order, ties
    /// broken by chunk index. Chunks with no term overlap are omitted.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(usize, f64)> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || self.is_empty() {
            return Vec::new();
        }

        let n = self.doc_terms.len() as f64;
        let mut scored: Vec<(usize, f64)> = Vec::new();

        for (idx, terms) in self.doc_terms.iter().enumerate() {
            let doc_len = self.doc_lens[idx] as f64;
            let mut score = 0.0;

            for term in &query_terms {
                let Some(&tf) = terms.get(term) else {
                    continue;
                };
                let df = *self.doc_freqs.get(term).unwrap_or(&0) as f64;

                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                let tf = tf as f64;
                let norm = tf + K1 * (1.0 - B + B * doc_len / self.avg_doc_len);
                score += idf * tf * (K1 + 1.0) / norm;
            }

            if score > 0.0 {
                scored.push((idx, score));
            }
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);
        scored
    }
}
