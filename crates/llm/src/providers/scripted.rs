//! Scripted LLM provider for deterministic tests.
//!
//! Replays a queue of canned responses in order. The workflow stages are
//! non-deterministic only through their model calls, so swapping this in
//! makes every orchestrator branch reproducible.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docchat_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::Mutex;

enum ScriptedReply {
    Text(String),
    Failure(String),
}

/// LLM client that replays scripted responses.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    /// Create an empty scripted client. Completing against an empty script
    /// is an error, so tests fail loudly on unexpected extra calls.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful text reply.
    pub fn push_reply(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .expect("scripted client lock poisoned")
            .push_back(ScriptedReply::Text(text.into()));
    }

    /// Queue a provider failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .expect("scripted client lock poisoned")
            .push_back(ScriptedReply::Failure(message.into()));
    }

    /// Prompts received so far, in call order.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .expect("scripted client lock poisoned")
            .clone()
    }

    /// Number of completion calls made.
    pub fn call_count(&self) -> usize {
        self.prompts
            .lock()
            .expect("scripted client lock poisoned")
            .len()
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.prompts
            .lock()
            .map_err(|_| AppError::Llm("scripted client lock poisoned".to_string()))?
            .push(request.prompt.clone());

        let reply = self
            .replies
            .lock()
            .map_err(|_| AppError::Llm("scripted client lock poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| AppError::Llm("Scripted client exhausted".to_string()))?;

        match reply {
            ScriptedReply::Text(content) => Ok(LlmResponse {
                content,
                model: "scripted".to_string(),
                usage: LlmUsage::default(),
            }),
            ScriptedReply::Failure(message) => Err(AppError::Llm(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let client = ScriptedClient::new();
        client.push_reply("first");
        client.push_reply("second");

        let r1 = client.complete(&LlmRequest::new("a")).await.unwrap();
        let r2 = client.complete(&LlmRequest::new("b")).await.unwrap();

        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
        assert_eq!(client.recorded_prompts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let client = ScriptedClient::new();
        client.push_failure("rate limit");

        let err = client.complete(&LlmRequest::new("a")).await.unwrap_err();
        assert!(err.to_string().contains("rate limit"));
    }

    #[tokio::test]
    async fn test_exhausted_script_is_error() {
        let client = ScriptedClient::new();
        assert!(client.complete(&LlmRequest::new("a")).await.is_err());
        assert_eq!(client.call_count(), 1);
    }
}
