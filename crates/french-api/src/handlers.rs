//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path/query parameters via axum extractors,
//! drives the orchestrator or stores, and returns JSON responses. All
//! handlers are thin pass-throughs; the conversation pipeline owns the
//! interesting behavior.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use french_core::types::{Channel, Message, Speaker, TaskStatus, Zone};
use french_store::AuditEntry;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / query parameter types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub channel: String,
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogsParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ZoneRequest {
    pub zone: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated reply, absent for observe-only turns.
    pub reply: Option<String>,
    /// Intent tag from the analyzer, absent when the turn terminated
    /// before analysis.
    pub intent: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub channel: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<french_core::types::Task>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ZoneResponse {
    pub zone: Zone,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogsResponse {
    pub entries: Vec<AuditEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub reset: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub task_count: usize,
}

// =============================================================================
// Handler functions
// =============================================================================

fn parse_channel(s: &str) -> Result<Channel, ApiError> {
    s.parse()
        .map_err(|e: String| ApiError::BadRequest(e))
}

/// POST /chat - run one conversation turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let channel = parse_channel(&req.channel)?;
    let speaker: Speaker = req
        .speaker
        .parse()
        .map_err(|e: String| ApiError::BadRequest(e))?;

    let outcome = state
        .orchestrator
        .handle(channel, speaker, &req.text)
        .await?;

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        intent: outcome.analysis.map(|a| a.intent.tag().to_string()),
    }))
}

/// GET /chat/{channel}/history - chronological message log.
pub async fn history(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let channel = parse_channel(&channel)?;
    let limit = params.limit.unwrap_or(50).clamp(1, 500);

    let messages = state.history.recent(channel, limit)?;
    Ok(Json(HistoryResponse {
        channel: channel.to_string(),
        messages,
    }))
}

/// GET /tasks - list tasks, optionally filtered by status.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskListParams>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let status = match params.status.as_deref() {
        None | Some("all") | Some("All") => None,
        Some(s) => Some(
            s.parse::<TaskStatus>()
                .map_err(|e| ApiError::BadRequest(e))?,
        ),
    };

    let tasks = state.tasks.list(status)?;
    Ok(Json(TaskListResponse { tasks }))
}

/// GET /zone - current zone.
pub async fn get_zone(State(state): State<AppState>) -> Result<Json<ZoneResponse>, ApiError> {
    let zone = state.zone.get()?;
    Ok(Json(ZoneResponse { zone }))
}

/// POST /zone - set the zone directly.
pub async fn set_zone(
    State(state): State<AppState>,
    Json(req): Json<ZoneRequest>,
) -> Result<Json<ZoneResponse>, ApiError> {
    let zone: Zone = req
        .zone
        .parse()
        .map_err(|e: String| ApiError::BadRequest(e))?;
    let zone = state.zone.set(zone)?;
    Ok(Json(ZoneResponse { zone }))
}

/// DELETE /reset - clear tasks, history, audit log, and zone.
pub async fn reset(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    state.tasks.delete_all()?;
    state.history.clear_all()?;
    state.zone.reset()?;
    tracing::info!("All stores reset");
    Ok(Json(ResetResponse { reset: true }))
}

/// GET /logs - recent analyzer audit entries.
pub async fn logs(
    State(state): State<AppState>,
    Query(params): Query<LogsParams>,
) -> Result<Json<LogsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let entries = state.history.recent_audit(limit)?;
    Ok(Json(LogsResponse { entries }))
}

/// GET /health - liveness and basic stats.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let task_count = state.tasks.list(None)?.len();
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        task_count,
    }))
}
