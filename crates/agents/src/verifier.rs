//! Verifier: evidence-grounded audit of a draft answer.
//!
//! The verifier only ever sees the evidence the draft cites: it is an
//! auditor, not a second researcher. The model is asked for a structured
//! line-oriented report, which is parsed and folded into the two-state
//! verdict the orchestrator branches on.

use crate::state::{Draft, Query, VerificationStatus, VerificationVerdict};
use docchat_core::{AppError, AppResult};
use docchat_llm::{LlmClient, LlmRequest};
use docchat_retrieval::RetrievalResult;
use std::sync::Arc;

/// Token budget for verification reports.
const MAX_REPORT_TOKENS: u32 = 3000;

/// Parsed structured report.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub supported: bool,
    pub unsupported_claims: Vec<String>,
    pub contradictions: Vec<String>,
    pub relevant: bool,
    pub additional_details: String,
}

/// Verifier over the shared model capability.
pub struct Verifier {
    llm: Arc<dyn LlmClient>,
}

impl Verifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Judge whether the draft, restricted to its cited evidence, supports
    /// its claims and addresses the query.
    pub async fn verify(
        &self,
        query: &Query,
        draft: &Draft,
        evidence: &RetrievalResult,
    ) -> AppResult<VerificationVerdict> {
        if draft.cited_evidence_ids.is_empty() {
            // Nothing cited means nothing auditable: no model call needed
            return Ok(VerificationVerdict {
                status: VerificationStatus::NeedsCorrection,
                feedback: "The draft cites no supporting evidence.".to_string(),
            });
        }

        let cited_context = draft
            .cited_evidence_ids
            .iter()
            .filter_map(|id| evidence.get(id))
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = build_verification_prompt(&query.text, &draft.answer_text, &cited_context);
        let request = LlmRequest::new(prompt)
            .with_temperature(0.0)
            .with_max_tokens(MAX_REPORT_TOKENS);

        let response = self.llm.complete(&request).await?;
        let report = parse_verification_report(&response.content)?;
        let verdict = fold_report(&report);

        tracing::info!(
            "Verification verdict for round {}: {:?}",
            draft.round_number,
            verdict.status
        );

        Ok(verdict)
    }
}

fn build_verification_prompt(question: &str, answer: &str, context: &str) -> String {
    format!(
        "You are an AI assistant designed to verify the accuracy and relevance \
         of answers based on provided context.\n\n\
         **Instructions:**\n\
         - Verify the following answer against the provided context.\n\
         - Check for:\n\
         1. Direct/indirect factual support (YES/NO)\n\
         2. Unsupported claims (list any if present)\n\
         3. Contradictions (list any if present)\n\
         4. Relevance to the question (YES/NO)\n\
         - Respond in the exact format specified below without adding any \
         unrelated information.\n\n\
         **Format:**\n\
         Supported: YES/NO\n\
         Unsupported Claims: [item1, item2, ...]\n\
         Contradictions: [item1, item2, ...]\n\
         Relevant: YES/NO\n\
         Additional Details: [Any extra information or explanations]\n\n\
         **Question:** {}\n\
         **Answer:** {}\n\
         **Context:**\n{}\n\n\
         **Respond ONLY with the above format.**",
        question, answer, context
    )
}

/// Parse the line-oriented report format.
///
/// A reply with no recognizable `Supported:` line is malformed output,
/// which the stage runner retries once before the workflow gives up.
pub fn parse_verification_report(raw: &str) -> AppResult<VerificationReport> {
    let mut supported: Option<bool> = None;
    let mut unsupported_claims = Vec::new();
    let mut contradictions = Vec::new();
    let mut relevant = true;
    let mut additional_details = String::new();

    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "supported" => supported = Some(parse_yes_no(value)),
            "unsupported claims" => unsupported_claims = parse_list(value),
            "contradictions" => contradictions = parse_list(value),
            "relevant" => relevant = parse_yes_no(value),
            "additional details" => {
                additional_details = value.trim_matches(['[', ']']).trim().to_string();
            }
            _ => {}
        }
    }

    let Some(supported) = supported else {
        return Err(AppError::MalformedOutput {
            stage: "verify".to_string(),
            detail: "report missing 'Supported:' line".to_string(),
        });
    };

    Ok(VerificationReport {
        supported,
        unsupported_claims,
        contradictions,
        relevant,
        additional_details,
    })
}

fn parse_yes_no(value: &str) -> bool {
    value.trim().to_uppercase().starts_with("YES")
}

/// Parse `[item1, item2, ...]` into items, tolerating missing brackets,
/// quotes, and the literal "None".
fn parse_list(value: &str) -> Vec<String> {
    let inner = value.trim().trim_matches(['[', ']']);
    inner
        .split(',')
        .map(|item| item.trim().trim_matches(['"', '\'']).trim().to_string())
        .filter(|item| !item.is_empty() && !item.eq_ignore_ascii_case("none"))
        .collect()
}

/// Fold the parsed report into the orchestrator's two-state verdict.
fn fold_report(report: &VerificationReport) -> VerificationVerdict {
    let sufficient = report.supported
        && report.relevant
        && report.unsupported_claims.is_empty()
        && report.contradictions.is_empty();

    if sufficient {
        return VerificationVerdict {
            status: VerificationStatus::Sufficient,
            feedback: String::new(),
        };
    }

    let mut feedback = Vec::new();
    if !report.supported {
        feedback.push("The answer is not supported by the cited evidence.".to_string());
    }
    if !report.relevant {
        feedback.push("The answer does not address the question.".to_string());
    }
    if !report.unsupported_claims.is_empty() {
        feedback.push(format!(
            "Unsupported claims: {}",
            report.unsupported_claims.join(", ")
        ));
    }
    if !report.contradictions.is_empty() {
        feedback.push(format!(
            "Contradictions: {}",
            report.contradictions.join(", ")
        ));
    }
    if !report.additional_details.is_empty() {
        feedback.push(report.additional_details.clone());
    }

    VerificationVerdict {
        status: VerificationStatus::NeedsCorrection,
        feedback: feedback.join(" "),
    }
}
