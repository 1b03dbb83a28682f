//! Error types for the DocChat workflow.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, LLM provider failures, retrieval,
//! and the workflow-stage failure modes the orchestrator converts into
//! terminal results.

use thiserror::Error;

/// Unified error type for DocChat.
///
/// All functions in the application return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Retrieval and corpus errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Retrieval requested against a corpus with no indexed content
    #[error("Corpus '{0}' has no indexed content")]
    EmptyCorpus(String),

    /// An external stage call exceeded its timeout
    #[error("Stage '{0}' timed out after {1}s")]
    StageTimeout(String, u64),

    /// A model-call stage returned output that could not be parsed
    #[error("Stage '{stage}' returned malformed output: {detail}")]
    MalformedOutput { stage: String, detail: String },

    /// The workflow was cancelled between stages
    #[error("Workflow cancelled")]
    Cancelled,

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error is a transient stage failure eligible for one
    /// local retry (timeouts and unparseable model output).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::StageTimeout(_, _) | AppError::MalformedOutput { .. }
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
