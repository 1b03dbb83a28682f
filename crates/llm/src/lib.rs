//! LLM integration crate for DocChat.
//!
//! This crate provides a provider-agnostic abstraction for the single
//! model-call capability the workflow stages consume: submit a prompt,
//! receive text. It supports multiple providers through a unified
//! trait-based interface, composed primary-first with a fallback.
//!
//! # Providers
//! - **Gemini**: primary (generateContent API)
//! - **OpenAI**: fallback (chat completions API)
//! - **Scripted**: deterministic canned responses for tests
//!
//! # Example
//! ```no_run
//! use docchat_llm::{LlmClient, LlmRequest, providers::GeminiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new("api-key", "gemini-1.5-flash");
//! let request = LlmRequest::new("Hello, world!").with_temperature(0.0);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod fallback;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_client_with_fallback};
pub use fallback::FallbackClient;
pub use providers::{GeminiClient, OpenAiClient, ScriptedClient};
