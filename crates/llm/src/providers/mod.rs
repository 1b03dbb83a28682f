//! LLM provider implementations.

pub mod gemini;
pub mod openai;
pub mod scripted;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use scripted::ScriptedClient;
