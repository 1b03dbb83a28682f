//! Workflow orchestrator: drives the state machine over the agents.
//!
//! One `Workflow` instance serves many concurrent queries; a semaphore
//! bounds how many run at once so a burst cannot exhaust provider quota.
//! Each stage call goes through [`crate::stage::run_stage`], which applies
//! the timeout, the single transient retry, and cancellation.

use crate::relevance::RelevanceGate;
use crate::stage::run_stage;
use crate::state::{
    next_stage, AnswerStatus, Query, WorkflowOutcome, WorkflowStage, WorkflowState,
};
use crate::state::VerificationStatus;
use crate::synthesizer::{reformulate_query, Synthesizer};
use crate::verifier::Verifier;
use docchat_core::{AppConfig, AppError, AppResult};
use docchat_llm::LlmClient;
use docchat_retrieval::HybridRetriever;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Tuning knobs for the control loop, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Maximum research/verify rounds per query (must be >= 1)
    pub max_rounds: u32,
    /// Evidence chunks retrieved per research round
    pub top_k: usize,
    /// Timeout applied to each stage call
    pub stage_timeout: Duration,
    /// Concurrent query ceiling
    pub max_concurrent_queries: usize,
}

impl From<&AppConfig> for WorkflowOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_rounds: config.max_rounds,
            top_k: config.top_k as usize,
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
            max_concurrent_queries: config.max_concurrent_queries,
        }
    }
}

/// The question-answering workflow over one retriever and one model client.
pub struct Workflow {
    gate: RelevanceGate,
    synthesizer: Synthesizer,
    verifier: Verifier,
    retriever: Arc<HybridRetriever>,
    semaphore: Arc<Semaphore>,
    options: WorkflowOptions,
}

impl Workflow {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        retriever: Arc<HybridRetriever>,
        options: WorkflowOptions,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(options.max_concurrent_queries.max(1)));
        Self {
            gate: RelevanceGate::new(Arc::clone(&llm), Arc::clone(&retriever)),
            synthesizer: Synthesizer::new(Arc::clone(&llm)),
            verifier: Verifier::new(llm),
            retriever,
            semaphore,
            options,
        }
    }

    /// Answer one query against one corpus.
    ///
    /// Blocks on the admission semaphore if the concurrency ceiling is
    /// reached. Cancellation propagates as [`AppError::Cancelled`]; every
    /// other failure mode comes back as a typed [`WorkflowOutcome`].
    pub async fn answer(
        &self,
        query: Query,
        cancel: CancellationToken,
    ) -> AppResult<WorkflowOutcome> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| AppError::Cancelled)?;

        tracing::info!(
            "Processing query against corpus '{}': {}",
            query.corpus_id,
            query.text
        );

        let mut state = WorkflowState::new(query, self.options.max_rounds.max(1));
        let mut stage = WorkflowStage::Start;

        loop {
            stage = next_stage(stage, &state);
            tracing::debug!("Entering stage {:?} (round {})", stage, state.round_number);

            match stage {
                WorkflowStage::Start => unreachable!("Start has no inbound transition"),

                WorkflowStage::RelevanceCheck => {
                    let verdict = run_stage(
                        "relevance_check",
                        self.options.stage_timeout,
                        &cancel,
                        || self.gate.check(&state.query),
                    )
                    .await;

                    match verdict {
                        Ok(verdict) => state.relevance_verdict = Some(verdict),
                        Err(err) => return self.fail(err, &state),
                    }
                }

                WorkflowStage::Research => {
                    let feedback = state.prior_feedback().map(str::to_string);
                    state.begin_round();

                    let retrieval_query =
                        reformulate_query(&state.query.text, feedback.as_deref());
                    let round = state.round_number;

                    let researched = run_stage(
                        "research",
                        self.options.stage_timeout,
                        &cancel,
                        || async {
                            let retrieval = self
                                .retriever
                                .retrieve(
                                    &retrieval_query,
                                    &state.query.corpus_id,
                                    self.options.top_k,
                                )
                                .await?;
                            let draft = self
                                .synthesizer
                                .synthesize(&state.query, &retrieval, feedback.as_deref(), round)
                                .await?;
                            Ok((retrieval, draft))
                        },
                    )
                    .await;

                    match researched {
                        Ok((retrieval, draft)) => {
                            state.retrieval_result = Some(retrieval);
                            state.drafts.push(draft);
                        }
                        Err(err) => return self.fail(err, &state),
                    }
                }

                WorkflowStage::Verify => {
                    let (draft, retrieval) = match (state.last_draft(), &state.retrieval_result) {
                        (Some(draft), Some(retrieval)) => (draft, retrieval),
                        _ => {
                            return Err(AppError::Other(
                                "Verify entered without a draft".to_string(),
                            ))
                        }
                    };

                    let verdict = run_stage(
                        "verify",
                        self.options.stage_timeout,
                        &cancel,
                        || self.verifier.verify(&state.query, draft, retrieval),
                    )
                    .await;

                    match verdict {
                        Ok(verdict) => state.verdicts.push(verdict),
                        Err(err) => return self.fail(err, &state),
                    }
                }

                WorkflowStage::Declined => {
                    let rationale = state
                        .relevance_verdict
                        .as_ref()
                        .map(|v| v.rationale.clone());
                    tracing::info!("Query declined: {}", rationale.as_deref().unwrap_or(""));

                    return Ok(WorkflowOutcome {
                        status: AnswerStatus::Declined,
                        answer_text:
                            "This question cannot be answered from the provided documents."
                                .to_string(),
                        cited_evidence_ids: BTreeSet::new(),
                        rounds_used: state.round_number,
                        feedback: rationale,
                    });
                }

                WorkflowStage::Done => return Ok(self.finish(&state)),
            }
        }
    }

    /// Map a completed loop onto the boundary result.
    ///
    /// Verified requires a Sufficient verdict on the final draft; a loop
    /// terminated by the round budget is best-effort, with the unresolved
    /// feedback attached.
    fn finish(&self, state: &WorkflowState) -> WorkflowOutcome {
        let draft = state.last_draft();
        let verdict = state.last_verdict();

        let status = match verdict {
            Some(v) if v.status == VerificationStatus::Sufficient => AnswerStatus::Verified,
            _ => AnswerStatus::BestEffort,
        };

        let feedback = verdict
            .filter(|v| v.status == VerificationStatus::NeedsCorrection)
            .map(|v| v.feedback.clone());

        tracing::info!(
            "Workflow finished: {:?} after {} round(s)",
            status,
            state.round_number
        );

        WorkflowOutcome {
            status,
            answer_text: draft
                .map(|d| d.answer_text.clone())
                .unwrap_or_else(|| "I cannot answer this question.".to_string()),
            cited_evidence_ids: draft
                .map(|d| d.cited_evidence_ids.clone())
                .unwrap_or_default(),
            rounds_used: state.round_number,
            feedback,
        }
    }

    /// Map a stage failure (already past its retry) onto the boundary.
    ///
    /// An empty corpus declines; cancellation propagates as an error; any
    /// other failure degrades to a best-effort answer built from whatever
    /// the loop produced before the failure.
    fn fail(&self, err: AppError, state: &WorkflowState) -> AppResult<WorkflowOutcome> {
        match err {
            AppError::Cancelled => Err(AppError::Cancelled),

            AppError::EmptyCorpus(_) => {
                tracing::warn!("Declining query: {}", err);
                Ok(WorkflowOutcome {
                    status: AnswerStatus::Declined,
                    answer_text:
                        "This question cannot be answered from the provided documents."
                            .to_string(),
                    cited_evidence_ids: BTreeSet::new(),
                    rounds_used: state.round_number,
                    feedback: Some(err.to_string()),
                })
            }

            err => {
                tracing::error!("Stage failed after retry: {}", err);
                let draft = state.last_draft();
                Ok(WorkflowOutcome {
                    status: AnswerStatus::BestEffort,
                    answer_text: draft
                        .map(|d| d.answer_text.clone())
                        .unwrap_or_else(|| "I cannot answer this question.".to_string()),
                    cited_evidence_ids: draft
                        .map(|d| d.cited_evidence_ids.clone())
                        .unwrap_or_default(),
                    rounds_used: state.round_number,
                    feedback: Some(err.to_string()),
                })
            }
        }
    }
}
