//! Command handlers for the DocChat CLI.

pub mod answer;

pub use answer::AnswerCommand;
