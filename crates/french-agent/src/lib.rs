//! The Mr. French agent: LLM boundary, intent extraction, task actions,
//! deadline formatting, the zone heuristic, and the reminder scheduler.
//!
//! Everything LLM-facing sits behind injectable traits ([`llm::LlmClient`],
//! [`extractor::IntentExtractor`]) so the conversation pipeline can be driven
//! deterministically in tests.

pub mod actions;
pub mod deadline;
pub mod extractor;
pub mod intent;
pub mod llm;
pub mod prompts;
pub mod reminder;
pub mod zone_rules;

pub use actions::{ActionKind, ActionOutcome, TaskActionHandler};
pub use extractor::{IntentExtractor, LlmIntentExtractor, ScriptedExtractor};
pub use intent::{Analysis, Intent, TaskDraft, TaskFilter};
pub use llm::{ChatTurn, LlmClient, LlmError, OpenAiClient, ScriptedLlm};
pub use reminder::ReminderScheduler;
pub use zone_rules::ZoneMonitor;
