//! Research synthesizer: evidence in, cited draft out.
//!
//! Builds a `[Document N]` context from the retrieval result and asks the
//! model for a precise, context-only answer. On re-research rounds the
//! workflow re-runs retrieval with a query reformulated around the
//! verifier's feedback before calling back in here.

use crate::state::{Draft, Query};
use docchat_core::AppResult;
use docchat_llm::{LlmClient, LlmRequest};
use docchat_retrieval::RetrievalResult;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Token budget for draft answers.
const MAX_ANSWER_TOKENS: u32 = 4000;

/// Factual answers want low, non-zero temperature.
const ANSWER_TEMPERATURE: f32 = 0.3;

/// Research synthesizer over the shared model capability.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Produce a draft answer from the retrieved evidence.
    ///
    /// Citations are the `[Document N]` references the answer makes,
    /// mapped back to evidence ids; an answer without explicit references
    /// cites everything it was shown. Either way the ids are filtered
    /// against the retrieval result, so an id not present there can never
    /// leak into a draft. Zero evidence yields a zero-citation draft (the
    /// verifier will flag it).
    pub async fn synthesize(
        &self,
        query: &Query,
        retrieval: &RetrievalResult,
        prior_feedback: Option<&str>,
        round_number: u32,
    ) -> AppResult<Draft> {
        let context = build_context(retrieval);
        let prompt = build_research_prompt(&query.text, &context, prior_feedback);

        let request = LlmRequest::new(prompt)
            .with_temperature(ANSWER_TEMPERATURE)
            .with_max_tokens(MAX_ANSWER_TOKENS);

        let response = self.llm.complete(&request).await?;
        let answer_text = response.content.trim().to_string();

        let answer_text = if answer_text.is_empty() {
            "I cannot answer this question.".to_string()
        } else {
            answer_text
        };

        let cited = cite_from_answer(&answer_text, retrieval);

        tracing::info!(
            "Draft produced for round {} ({} citations)",
            round_number,
            cited.len()
        );

        Ok(Draft {
            answer_text,
            cited_evidence_ids: cited,
            round_number,
        })
    }
}

/// Reformulate the query for a re-research round.
///
/// Round one retrieves with the original question; later rounds fold the
/// verifier's feedback into the retrieval query so the new evidence set
/// targets what the last draft was missing.
pub fn reformulate_query(original: &str, prior_feedback: Option<&str>) -> String {
    match prior_feedback {
        Some(feedback) if !feedback.trim().is_empty() => {
            format!("{}\n{}", original, feedback.trim())
        }
        _ => original.to_string(),
    }
}

/// Map the answer's `[Document N]` references to evidence ids.
///
/// N is 1-based context position; references to documents that were never
/// shown are dropped. An answer with no usable references cites the whole
/// evidence set, because a context-only answer drew on what it was given
/// even when it does not say which part.
pub fn cite_from_answer(answer: &str, retrieval: &RetrievalResult) -> BTreeSet<String> {
    let mut candidates = Vec::new();

    let mut rest = answer;
    while let Some(start) = rest.find("[Document ") {
        rest = &rest[start + "[Document ".len()..];
        let Some(end) = rest.find(']') else {
            break;
        };
        if let Ok(number) = rest[..end].trim().parse::<usize>() {
            if let Some(chunk) = number.checked_sub(1).and_then(|i| retrieval.chunks.get(i)) {
                candidates.push(chunk.id.clone());
            }
        }
        rest = &rest[end + 1..];
    }

    if candidates.is_empty() {
        candidates = retrieval.ids();
    }

    filter_citations(candidates, retrieval)
}

/// Keep only citation ids present in the retrieval result.
///
/// Citing an absent id is an implementation defect, not a user-facing
/// error; this guard makes it structurally impossible downstream.
pub fn filter_citations(
    candidate_ids: Vec<String>,
    retrieval: &RetrievalResult,
) -> BTreeSet<String> {
    candidate_ids
        .into_iter()
        .filter(|id| retrieval.contains_id(id))
        .collect()
}

/// Number the evidence into `[Document N]` blocks.
fn build_context(retrieval: &RetrievalResult) -> String {
    retrieval
        .chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Document {}]\n{}", i + 1, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn build_research_prompt(question: &str, context: &str, prior_feedback: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are an AI assistant designed to provide precise and factual answers \
         based on the given context.\n\n\
         **Instructions:**\n\
         - Answer the following question using only the provided context.\n\
         - Be clear, concise, and factual.\n\
         - Return as much information as you can get from the context.\n\
         - Reference the documents you use, e.g. [Document 1].\n",
    );

    if let Some(feedback) = prior_feedback {
        prompt.push_str(
            "- A previous draft of this answer was rejected by a reviewer. \
             Address the reviewer feedback below.\n",
        );
        prompt.push_str(&format!("\n**Reviewer feedback:** {}\n", feedback));
    }

    prompt.push_str(&format!(
        "\n**Question:** {}\n**Context:**\n{}\n\n**Provide your answer below:**",
        question, context
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_retrieval::{EvidenceChunk, RetrievalMethod};

    fn retrieval(ids: &[&str]) -> RetrievalResult {
        RetrievalResult {
            chunks: ids
                .iter()
                .enumerate()
                .map(|(i, id)| EvidenceChunk {
                    id: id.to_string(),
                    source: "doc.md".to_string(),
                    position: i as u32,
                    text: format!("evidence {}", id),
                    score: 1.0 - i as f64 * 0.1,
                    methods: vec![RetrievalMethod::Semantic],
                })
                .collect(),
        }
    }

    #[test]
    fn test_filter_citations_drops_absent_ids() {
        let result = retrieval(&["a", "b"]);
        let cited = filter_citations(
            vec!["a".to_string(), "ghost".to_string(), "b".to_string()],
            &result,
        );

        assert_eq!(cited.len(), 2);
        assert!(cited.contains("a"));
        assert!(cited.contains("b"));
        assert!(!cited.contains("ghost"));
    }

    #[test]
    fn test_filter_citations_empty_retrieval() {
        let result = retrieval(&[]);
        let cited = filter_citations(vec!["a".to_string()], &result);
        assert!(cited.is_empty());
    }

    #[test]
    fn test_cite_from_answer_maps_document_references() {
        let result = retrieval(&["a", "b", "c"]);
        let cited = cite_from_answer(
            "The value is 1.08 [Document 2], confirmed by [Document 3].",
            &result,
        );

        assert_eq!(cited.len(), 2);
        assert!(cited.contains("b"));
        assert!(cited.contains("c"));
        assert!(!cited.contains("a"));
    }

    #[test]
    fn test_cite_from_answer_drops_unknown_references() {
        let result = retrieval(&["a", "b"]);
        let cited = cite_from_answer("See [Document 1] and [Document 9].", &result);

        assert_eq!(cited.len(), 1);
        assert!(cited.contains("a"));
    }

    #[test]
    fn test_cite_from_answer_without_references_cites_everything() {
        let result = retrieval(&["a", "b"]);
        let cited = cite_from_answer("The value is 1.08.", &result);

        assert_eq!(cited.len(), 2);

        let none = cite_from_answer("Nothing to draw on.", &retrieval(&[]));
        assert!(none.is_empty());
    }

    #[test]
    fn test_reformulate_query_round_one_unchanged() {
        assert_eq!(reformulate_query("original question", None), "original question");
        assert_eq!(
            reformulate_query("original question", Some("   ")),
            "original question"
        );
    }

    #[test]
    fn test_reformulate_query_appends_feedback() {
        let reformulated =
            reformulate_query("what is the PUE?", Some("missing the 2019 value"));
        assert!(reformulated.contains("what is the PUE?"));
        assert!(reformulated.contains("missing the 2019 value"));
    }

    #[test]
    fn test_build_context_numbers_documents() {
        let result = retrieval(&["a", "b"]);
        let context = build_context(&result);

        assert!(context.contains("[Document 1]"));
        assert!(context.contains("[Document 2]"));
        assert!(context.contains("evidence a"));
        assert!(context.contains("---"));
    }

    #[test]
    fn test_prompt_includes_feedback_only_when_present() {
        let without = build_research_prompt("q", "ctx", None);
        assert!(!without.contains("Reviewer feedback"));

        let with = build_research_prompt("q", "ctx", Some("cite the table"));
        assert!(with.contains("Reviewer feedback"));
        assert!(with.contains("cite the table"));
    }

    #[tokio::test]
    async fn test_synthesize_cites_only_retrieved_ids() {
        use docchat_llm::ScriptedClient;

        let llm = Arc::new(ScriptedClient::new());
        llm.push_reply("The PUE was 1.08.");

        let synthesizer = Synthesizer::new(llm);
        let result = retrieval(&["a", "b"]);
        let query = Query::new("what is the PUE?", "corpus");

        let draft = synthesizer
            .synthesize(&query, &result, None, 1)
            .await
            .unwrap();

        assert_eq!(draft.answer_text, "The PUE was 1.08.");
        assert_eq!(draft.round_number, 1);
        for id in &draft.cited_evidence_ids {
            assert!(result.contains_id(id));
        }
    }

    #[tokio::test]
    async fn test_synthesize_cites_referenced_documents_only() {
        use docchat_llm::ScriptedClient;

        let llm = Arc::new(ScriptedClient::new());
        llm.push_reply("The PUE was 1.08 [Document 2].");

        let synthesizer = Synthesizer::new(llm);
        let result = retrieval(&["a", "b"]);
        let query = Query::new("what is the PUE?", "corpus");

        let draft = synthesizer
            .synthesize(&query, &result, None, 1)
            .await
            .unwrap();

        assert_eq!(draft.cited_evidence_ids.len(), 1);
        assert!(draft.cited_evidence_ids.contains("b"));
    }

    #[tokio::test]
    async fn test_synthesize_empty_evidence_yields_no_citations() {
        use docchat_llm::ScriptedClient;

        let llm = Arc::new(ScriptedClient::new());
        llm.push_reply("There is nothing to answer from.");

        let synthesizer = Synthesizer::new(llm);
        let result = retrieval(&[]);
        let query = Query::new("anything", "corpus");

        let draft = synthesizer
            .synthesize(&query, &result, None, 1)
            .await
            .unwrap();
        assert!(draft.cited_evidence_ids.is_empty());
    }

    #[tokio::test]
    async fn test_blank_model_reply_becomes_fallback_text() {
        use docchat_llm::ScriptedClient;

        let llm = Arc::new(ScriptedClient::new());
        llm.push_reply("   ");

        let synthesizer = Synthesizer::new(llm);
        let draft = synthesizer
            .synthesize(&Query::new("q", "c"), &retrieval(&["a"]), None, 1)
            .await
            .unwrap();
        assert_eq!(draft.answer_text, "I cannot answer this question.");
    }
}
