//! Application state shared across all route handlers.
//!
//! AppState holds references to the stores and the conversation
//! orchestrator. It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use french_chat::ConversationOrchestrator;
use french_core::config::FrenchConfig;
use french_store::{HistoryStore, TaskRepository, ZoneStore};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. The
/// orchestrator holds no per-request state, so one instance serves all
/// concurrent turns.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FrenchConfig>,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub tasks: Arc<TaskRepository>,
    pub history: Arc<HistoryStore>,
    pub zone: Arc<ZoneStore>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: FrenchConfig,
        orchestrator: ConversationOrchestrator,
        tasks: Arc<TaskRepository>,
        history: Arc<HistoryStore>,
        zone: Arc<ZoneStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            tasks,
            history,
            zone,
            start_time: Instant::now(),
        }
    }
}
