//! Workflow state machine types.
//!
//! The control loop is an explicit finite-state machine: an enumerated
//! stage type plus a pure transition function over the accumulated state.
//! Every branch depends only on verdict values, never on wall-clock time,
//! so identical (scripted) stage responses reproduce identical runs.

use docchat_retrieval::RetrievalResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One user question against one corpus. Immutable per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub corpus_id: String,
}

impl Query {
    pub fn new(text: impl Into<String>, corpus_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            corpus_id: corpus_id.into(),
        }
    }
}

/// Relevance gate judgment, produced once per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    pub is_relevant: bool,
    pub rationale: String,
}

/// A draft answer with citations. A fresh draft is produced each round;
/// prior drafts stay on the workflow state for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub answer_text: String,
    pub cited_evidence_ids: BTreeSet<String>,
    pub round_number: u32,
}

/// Verification outcome for one draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Sufficient,
    NeedsCorrection,
}

/// Verifier judgment, produced once per draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub status: VerificationStatus,
    pub feedback: String,
}

/// Stages of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Start,
    RelevanceCheck,
    Research,
    Verify,
    /// Terminal: query judged unanswerable from the corpus
    Declined,
    /// Terminal: answer produced (verified or best-effort)
    Done,
}

impl WorkflowStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Declined | Self::Done)
    }
}

/// Mutable record threaded through the orchestrator for one query.
///
/// Owned exclusively by the workflow during processing, dropped when the
/// turn completes. Invariant: `round_number` increases by exactly 1 per
/// loop iteration and never exceeds `max_rounds`; `drafts` and `verdicts`
/// both have `round_number` entries except mid-iteration.
#[derive(Debug)]
pub struct WorkflowState {
    pub query: Query,
    pub relevance_verdict: Option<RelevanceVerdict>,
    pub retrieval_result: Option<RetrievalResult>,
    pub drafts: Vec<Draft>,
    pub verdicts: Vec<VerificationVerdict>,
    pub round_number: u32,
    pub max_rounds: u32,
}

impl WorkflowState {
    pub fn new(query: Query, max_rounds: u32) -> Self {
        Self {
            query,
            relevance_verdict: None,
            retrieval_result: None,
            drafts: Vec::new(),
            verdicts: Vec::new(),
            round_number: 0,
            max_rounds,
        }
    }

    /// Enter the next research round.
    pub fn begin_round(&mut self) {
        debug_assert!(self.round_number < self.max_rounds);
        self.round_number += 1;
    }

    pub fn last_draft(&self) -> Option<&Draft> {
        self.drafts.last()
    }

    pub fn last_verdict(&self) -> Option<&VerificationVerdict> {
        self.verdicts.last()
    }

    /// Feedback to carry into the next research round, if any.
    pub fn prior_feedback(&self) -> Option<&str> {
        self.last_verdict()
            .filter(|v| v.status == VerificationStatus::NeedsCorrection)
            .map(|v| v.feedback.as_str())
    }
}

/// Pure transition function of the state machine.
///
/// Branches only on the verdict values recorded in `state`.
pub fn next_stage(stage: WorkflowStage, state: &WorkflowState) -> WorkflowStage {
    match stage {
        WorkflowStage::Start => WorkflowStage::RelevanceCheck,

        WorkflowStage::RelevanceCheck => match state.relevance_verdict {
            Some(ref verdict) if verdict.is_relevant => WorkflowStage::Research,
            Some(_) => WorkflowStage::Declined,
            // No verdict recorded is a driver bug; decline rather than loop
            None => WorkflowStage::Declined,
        },

        WorkflowStage::Research => WorkflowStage::Verify,

        WorkflowStage::Verify => match state.last_verdict() {
            Some(verdict)
                if verdict.status == VerificationStatus::NeedsCorrection
                    && state.round_number < state.max_rounds =>
            {
                WorkflowStage::Research
            }
            // Sufficient, or the round budget is exhausted
            _ => WorkflowStage::Done,
        },

        terminal @ (WorkflowStage::Declined | WorkflowStage::Done) => terminal,
    }
}

/// Terminal status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerStatus {
    /// Query judged unanswerable from the corpus; no research ran
    Declined,
    /// Answer passed verification
    Verified,
    /// Answer returned despite unresolved verification or a stage failure
    BestEffort,
}

/// The single result the workflow boundary exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    pub status: AnswerStatus,
    pub answer_text: String,
    pub cited_evidence_ids: BTreeSet<String>,
    pub rounds_used: u32,
    /// Last verifier feedback (or stage failure detail) for diagnostics
    pub feedback: Option<String>,
}
