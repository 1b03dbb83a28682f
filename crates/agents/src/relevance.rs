//! Relevance gate: cheap answerability filter ahead of the research loop.
//!
//! Probes the retriever with a small k, then asks the model to classify
//! how well the probe passages address the question. The classification
//! labels are CAN_ANSWER / PARTIAL / NO_MATCH, matched fuzzily because
//! models get cut off mid-label or prepend reasoning.
//!
//! Policy: ambiguity defaults to relevant. A false decline silently
//! discards an answerable query, which costs more than one wasted
//! research round.

use crate::state::{Query, RelevanceVerdict};
use docchat_core::AppResult;
use docchat_llm::{LlmClient, LlmRequest};
use docchat_retrieval::HybridRetriever;
use std::sync::Arc;

/// Number of probe chunks fed to the classifier.
const PROBE_K: usize = 3;

/// Token budget generous enough for "thinking" models to reach the label.
const MAX_CLASSIFICATION_TOKENS: u32 = 1000;

/// Relevance gate over the shared retriever and model capability.
pub struct RelevanceGate {
    llm: Arc<dyn LlmClient>,
    retriever: Arc<HybridRetriever>,
}

impl RelevanceGate {
    pub fn new(llm: Arc<dyn LlmClient>, retriever: Arc<HybridRetriever>) -> Self {
        Self { llm, retriever }
    }

    /// Classify whether the query is answerable from the corpus.
    pub async fn check(&self, query: &Query) -> AppResult<RelevanceVerdict> {
        let probe = self
            .retriever
            .retrieve(&query.text, &query.corpus_id, PROBE_K)
            .await?;

        if probe.is_empty() {
            // Nothing retrieved is ambiguous, not negative: the research
            // round decides what zero evidence means
            tracing::info!("Relevance probe returned no passages; deferring to research");
            return Ok(RelevanceVerdict {
                is_relevant: true,
                rationale: "No probe passages retrieved; deferring to research".to_string(),
            });
        }

        let passages = probe
            .chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = build_classification_prompt(&query.text, &passages);
        let request = LlmRequest::new(prompt)
            .with_temperature(0.0)
            .with_max_tokens(MAX_CLASSIFICATION_TOKENS);

        let response = self.llm.complete(&request).await?;
        let verdict = classify_label(&response.content);

        tracing::info!(
            "Relevance verdict: is_relevant={} ({})",
            verdict.is_relevant,
            verdict.rationale
        );

        Ok(verdict)
    }
}

fn build_classification_prompt(question: &str, passages: &str) -> String {
    format!(
        "You are an AI relevance checker.\n\
         Classify how well the document content addresses the user's question.\n\n\
         **Instructions:**\n\
         - Respond with ONLY one label: CAN_ANSWER, PARTIAL, or NO_MATCH.\n\
         - Do not provide any explanation.\n\n\
         **Labels:**\n\
         1) \"CAN_ANSWER\": The passages contain enough information to fully answer.\n\
         2) \"PARTIAL\": The passages discuss the topic but lack some details.\n\
         3) \"NO_MATCH\": The passages do not mention the topic at all.\n\n\
         **Question:** {}\n\
         **Passages:** {}\n\n\
         **Respond ONLY with one of the following labels: CAN_ANSWER, PARTIAL, NO_MATCH**",
        question, passages
    )
}

/// Fuzzy label matching over the raw model reply.
///
/// Substring checks instead of equality so truncated or decorated replies
/// ("Label: PARTIAL", "PART") still classify. Anything unrecognizable
/// defaults to relevant per the gate policy.
fn classify_label(raw: &str) -> RelevanceVerdict {
    let upper = raw.trim().to_uppercase();

    if upper.contains("CAN_ANSWER") {
        RelevanceVerdict {
            is_relevant: true,
            rationale: "Passages contain enough information to answer".to_string(),
        }
    } else if upper.contains("PART") {
        RelevanceVerdict {
            is_relevant: true,
            rationale: "Passages discuss the topic but may lack details".to_string(),
        }
    } else if upper.contains("NO_MATCH") {
        RelevanceVerdict {
            is_relevant: false,
            rationale: "Passages do not mention the topic".to_string(),
        }
    } else {
        tracing::debug!("Unexpected classifier output: {}", upper);
        RelevanceVerdict {
            is_relevant: true,
            rationale: format!("Unrecognized classifier output ({}); defaulting to relevant", raw.trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_answer_is_relevant() {
        assert!(classify_label("CAN_ANSWER").is_relevant);
        assert!(classify_label("Label: CAN_ANSWER").is_relevant);
        assert!(classify_label("  can_answer  ").is_relevant);
    }

    #[test]
    fn test_partial_is_relevant() {
        assert!(classify_label("PARTIAL").is_relevant);
        // Truncated label from a token cutoff
        assert!(classify_label("PART").is_relevant);
        assert!(classify_label("PARTIALLY covered").is_relevant);
    }

    #[test]
    fn test_no_match_is_irrelevant() {
        assert!(!classify_label("NO_MATCH").is_relevant);
        assert!(!classify_label("The answer is NO_MATCH.").is_relevant);
    }

    #[test]
    fn test_unrecognized_defaults_to_relevant() {
        let verdict = classify_label("I am not sure what you mean");
        assert!(verdict.is_relevant);
        assert!(verdict.rationale.contains("defaulting to relevant"));
    }

    #[test]
    fn test_prompt_contains_question_and_passages() {
        let prompt = build_classification_prompt("what is the PUE?", "PUE was 1.08 in 2022");
        assert!(prompt.contains("what is the PUE?"));
        assert!(prompt.contains("PUE was 1.08 in 2022"));
        assert!(prompt.contains("CAN_ANSWER, PARTIAL, NO_MATCH"));
    }
}
