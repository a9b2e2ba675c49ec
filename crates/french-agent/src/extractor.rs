//! Intent extraction behind an injectable interface.
//!
//! [`LlmIntentExtractor`] is the production path: observer prompt + recent
//! history + the new input, through the structured LLM call, decoded
//! strictly. [`ScriptedExtractor`] replays predetermined analyses so the
//! conversation pipeline can be tested without a model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use french_core::types::{Message, Task};

use crate::intent::{Analysis, Intent};
use crate::llm::{ChatTurn, LlmClient};
use crate::prompts::{observer_prompt, task_context};

/// Converts free text into an intent record.
///
/// Implementations never return a hard error: extraction failures surface
/// as [`Analysis::failed`], which carries NO_TASK_IDENTIFIED.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn analyze(&self, user_input: &str, history: &[Message], tasks: &[Task]) -> Analysis;
}

/// LLM-backed extractor.
pub struct LlmIntentExtractor {
    llm: Arc<dyn LlmClient>,
}

impl LlmIntentExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IntentExtractor for LlmIntentExtractor {
    async fn analyze(&self, user_input: &str, history: &[Message], tasks: &[Task]) -> Analysis {
        let system_prompt = observer_prompt(&task_context(tasks));

        let mut turns: Vec<ChatTurn> = history
            .iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();
        turns.push(ChatTurn::user(user_input));

        let raw = match self.llm.complete_structured(&system_prompt, &turns).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Intent analysis call failed");
                return Analysis::failed(e.to_string(), Value::Null);
            }
        };

        match Intent::from_value(&raw) {
            Ok(intent) => Analysis::ok(intent, raw),
            Err(e) => {
                warn!(error = %e, "Analyzer output failed validation");
                Analysis::failed(e.to_string(), raw)
            }
        }
    }
}

/// Deterministic extractor double: replays a queue of analyses, then
/// NO_TASK_IDENTIFIED when drained.
pub struct ScriptedExtractor {
    queue: Mutex<VecDeque<Analysis>>,
}

impl ScriptedExtractor {
    pub fn new(analyses: Vec<Analysis>) -> Self {
        Self {
            queue: Mutex::new(analyses.into()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn push(&self, analysis: Analysis) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(analysis);
        }
    }
}

#[async_trait]
impl IntentExtractor for ScriptedExtractor {
    async fn analyze(&self, _user_input: &str, _history: &[Message], _tasks: &[Task]) -> Analysis {
        self.queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Analysis::ok(Intent::NoTask, Value::Null))
    }
}
