//! Conversation orchestration: the per-turn pipeline that ingests a
//! message, analyzes it for task intents, applies the action, and routes
//! to the right responder persona.

pub mod error;
pub mod orchestrator;
pub mod state;

pub use error::ChatError;
pub use orchestrator::ConversationOrchestrator;
pub use state::{ConversationState, TurnOutcome};
