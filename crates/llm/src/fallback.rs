//! Primary/fallback client composition.
//!
//! The original deployment pairs Gemini (better free-tier limits) with an
//! OpenAI safety net: every completion always tries the primary first and
//! only counts as failed when both providers fail.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use docchat_core::{AppError, AppResult};
use std::sync::Arc;

/// LLM client that tries a primary provider, then a fallback.
pub struct FallbackClient {
    primary: Arc<dyn LlmClient>,
    secondary: Option<Arc<dyn LlmClient>>,
}

impl FallbackClient {
    /// Create a fallback composition over two clients.
    pub fn new(primary: Arc<dyn LlmClient>, secondary: Option<Arc<dyn LlmClient>>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait::async_trait]
impl LlmClient for FallbackClient {
    fn provider_name(&self) -> &str {
        self.primary.provider_name()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        match self.primary.complete(request).await {
            Ok(response) => Ok(response),
            Err(primary_err) => {
                let Some(ref secondary) = self.secondary else {
                    return Err(primary_err);
                };

                tracing::warn!(
                    "Primary provider '{}' failed ({}), trying fallback '{}'",
                    self.primary.provider_name(),
                    primary_err,
                    secondary.provider_name()
                );

                secondary.complete(request).await.map_err(|fallback_err| {
                    AppError::Llm(format!(
                        "All providers failed. {}: {}. {}: {}",
                        self.primary.provider_name(),
                        primary_err,
                        secondary.provider_name(),
                        fallback_err
                    ))
                })
            }
        }
    }
}
