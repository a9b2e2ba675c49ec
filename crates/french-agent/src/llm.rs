//! The LLM boundary.
//!
//! [`LlmClient`] is the only way the rest of the system talks to a language
//! model: plain-text completion for conversational replies, and a structured
//! variant that requests a single JSON object for intent analysis.
//! [`OpenAiClient`] speaks the OpenAI-compatible chat-completions protocol;
//! [`ScriptedLlm`] is a deterministic double for tests and keyless dev runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use french_core::config::LlmConfig;
use french_core::error::FrenchError;
use french_core::types::Role;

/// Errors from an LLM invocation. All of these are recovered locally by the
/// caller; none abort a conversation turn.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<LlmError> for FrenchError {
    fn from(err: LlmError) -> Self {
        FrenchError::Llm(err.to_string())
    }
}

/// One turn of chat context handed to the model.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Injectable chat-completion client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Free-text completion for conversational replies.
    async fn complete(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String, LlmError>;

    /// JSON-object completion for intent analysis. The returned value is the
    /// parsed object; callers validate its shape separately.
    async fn complete_structured(
        &self,
        system_prompt: &str,
        turns: &[ChatTurn],
    ) -> Result<serde_json::Value, LlmError>;
}

// =============================================================================
// OpenAI-compatible client
// =============================================================================

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// Build a client from config, reading the API key from the configured
    /// environment variable (absent key means unauthenticated local endpoint).
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: std::env::var(&config.api_key_env).ok(),
        }
    }

    fn build_messages(system_prompt: &str, turns: &[ChatTurn]) -> Vec<serde_json::Value> {
        let mut messages = vec![json!({"role": "system", "content": system_prompt})];
        for turn in turns {
            messages.push(json!({"role": turn.role.to_string(), "content": turn.content}));
        }
        messages
    }

    async fn request(&self, body: serde_json::Value) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self.http.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| LlmError::Http(e.to_string()))?;
        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        if !status.is_success() {
            let detail = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown provider error")
                .to_string();
            return Err(LlmError::Provider(format!("{}: {}", status, detail)));
        }

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                LlmError::MalformedResponse("response missing choices[0].message.content".into())
            })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": Self::build_messages(system_prompt, turns),
        });
        self.request(body).await
    }

    async fn complete_structured(
        &self,
        system_prompt: &str,
        turns: &[ChatTurn],
    ) -> Result<serde_json::Value, LlmError> {
        // Analysis runs at temperature 0 for reproducible extraction.
        let body = json!({
            "model": self.model,
            "temperature": 0.0,
            "response_format": {"type": "json_object"},
            "messages": Self::build_messages(system_prompt, turns),
        });
        let content = self.request(body).await?;
        serde_json::from_str(&content)
            .map_err(|e| LlmError::MalformedResponse(format!("not a JSON object: {}", e)))
    }
}

// =============================================================================
// Scripted client
// =============================================================================

/// Deterministic LLM double: replays a queue of canned replies.
///
/// Used by the orchestrator tests and by the app when no API key is set.
/// When the queue is drained it returns a fixed fallback line rather than
/// erroring, so dev-mode conversations keep flowing.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: "Understood.".to_string(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Queue one more reply.
    pub fn push(&self, reply: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply.into());
        }
    }

    fn pop(&self) -> String {
        self.replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _system_prompt: &str, _turns: &[ChatTurn]) -> Result<String, LlmError> {
        Ok(self.pop())
    }

    async fn complete_structured(
        &self,
        _system_prompt: &str,
        _turns: &[ChatTurn],
    ) -> Result<serde_json::Value, LlmError> {
        let reply = self.pop();
        serde_json::from_str(&reply)
            .map_err(|e| LlmError::MalformedResponse(format!("scripted reply not JSON: {}", e)))
    }
}
