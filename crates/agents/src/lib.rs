//! Agentic question-answering workflow for DocChat.
//!
//! Sequences the relevance gate, research synthesizer, and verifier into a
//! bounded, self-correcting control loop over hybrid retrieval:
//!
//! ```text
//! Start -> RelevanceCheck -> {Declined | Research} -> Verify
//!                                          ^             |
//!                                          +-- loop -----+
//! ```
//!
//! The loop is bounded by `max_rounds`; a forced termination with an
//! unresolved verification is reported as a best-effort answer, never a
//! verified one.

pub mod relevance;
pub mod stage;
pub mod state;
pub mod synthesizer;
pub mod verifier;
pub mod workflow;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use relevance::RelevanceGate;
pub use state::{
    AnswerStatus, Draft, Query, RelevanceVerdict, VerificationStatus, VerificationVerdict,
    WorkflowOutcome, WorkflowStage, WorkflowState,
};
pub use synthesizer::Synthesizer;
pub use verifier::Verifier;
pub use workflow::Workflow;
