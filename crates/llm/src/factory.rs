//! LLM provider factory.
//!
//! Maps a provider name from configuration to a concrete client, wiring the
//! primary/fallback composition the workflow consumes.

use crate::client::LlmClient;
use crate::fallback::FallbackClient;
use crate::providers::{GeminiClient, OpenAiClient, ScriptedClient};
use docchat_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "openai", "scripted")
/// * `model` - Model identifier
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required for gemini/openai)
///
/// # Errors
/// Returns error if the provider is unknown or a required API key is missing.
pub fn create_client(
    provider: &str,
    model: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "gemini" => {
            let api_key = api_key
                .ok_or_else(|| AppError::Config("Gemini provider requires API key".to_string()))?;
            let client = match endpoint {
                Some(endpoint) => GeminiClient::with_endpoint(endpoint, api_key, model),
                None => GeminiClient::new(api_key, model),
            };
            Ok(Arc::new(client))
        }
        "openai" => {
            let api_key = api_key
                .ok_or_else(|| AppError::Config("OpenAI provider requires API key".to_string()))?;
            let client = match endpoint {
                Some(endpoint) => OpenAiClient::with_endpoint(endpoint, api_key, model),
                None => OpenAiClient::new(api_key, model),
            };
            Ok(Arc::new(client))
        }
        "scripted" => Ok(Arc::new(ScriptedClient::new())),
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

/// Create the primary/fallback composition used by the workflow stages.
pub fn create_client_with_fallback(
    primary: Arc<dyn LlmClient>,
    secondary: Option<Arc<dyn LlmClient>>,
) -> Arc<dyn LlmClient> {
    Arc::new(FallbackClient::new(primary, secondary))
}
