//! The typed intent model.
//!
//! The analyzer LLM returns a loosely-shaped JSON object; [`Intent::from_value`]
//! decodes it into a tagged union with strict validation. Any schema mismatch
//! is an error the extractor downgrades to [`Intent::NoTask`], so undecodable
//! output can never reach the action handler as a half-formed intent.

use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use french_core::types::{TaskStatus, Zone};
use french_store::TaskChanges;

/// The analyzer output failed validation.
#[derive(Debug, Error)]
#[error("intent decode error: {0}")]
pub struct DecodeError(pub String);

/// Extracted fields for a new task, with the extraction defaults applied
/// (status Pending, date Today, time Unknown, no reward).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub task: String,
    pub status: TaskStatus,
    pub due_date: String,
    pub due_time: String,
    pub reward: String,
}

/// Filter carried by a task inquiry.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskFilter {
    All,
    Status(TaskStatus),
    /// Substring match on task names.
    Named(String),
}

/// One classified user intent.
#[derive(Debug, Clone)]
pub enum Intent {
    AddTask(TaskDraft),
    UpdateTask {
        original_task_name: String,
        updates: TaskChanges,
    },
    DeleteTask {
        task: String,
    },
    QueryTasks {
        filter: TaskFilter,
    },
    SetZone {
        zone: Zone,
    },
    NoTask,
}

impl Intent {
    /// Short tag name, used for audit logging and API responses.
    pub fn tag(&self) -> &'static str {
        match self {
            Intent::AddTask(_) => "ADD_TASK",
            Intent::UpdateTask { .. } => "UPDATE_TASK",
            Intent::DeleteTask { .. } => "DELETE_TASK",
            Intent::QueryTasks { .. } => "QUERY_TASKS",
            Intent::SetZone { .. } => "SET_TIMMY_ZONE",
            Intent::NoTask => "NO_TASK_IDENTIFIED",
        }
    }

    /// Decode a raw analyzer object into a typed intent.
    ///
    /// Accepts both prompt-revision shapes the model produces: extraction
    /// fields at the top level, or nested under a `details` object. The
    /// legacy `Rewards` key is harmonized to `Reward`.
    pub fn from_value(value: &Value) -> Result<Intent, DecodeError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DecodeError("analyzer output is not a JSON object".into()))?;

        let tag = obj
            .get("intent")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError("missing 'intent' field".into()))?;

        match tag {
            "ADD_TASK" => Ok(Intent::AddTask(decode_draft(value)?)),
            "UPDATE_TASK" => {
                let name = field_str(value, "original_task_name")
                    .ok_or_else(|| DecodeError("UPDATE_TASK missing 'original_task_name'".into()))?;
                let updates_value = value
                    .get("updates")
                    .or_else(|| value.get("details").and_then(|d| d.get("updates")))
                    .ok_or_else(|| DecodeError("UPDATE_TASK missing 'updates'".into()))?;
                let updates = decode_changes(updates_value)?;
                if updates.is_empty() {
                    return Err(DecodeError("UPDATE_TASK has an empty 'updates' object".into()));
                }
                Ok(Intent::UpdateTask {
                    original_task_name: name,
                    updates,
                })
            }
            "DELETE_TASK" => {
                let task = field_str(value, "task")
                    .or_else(|| field_str(value, "original_task_name"))
                    .ok_or_else(|| DecodeError("DELETE_TASK missing 'task'".into()))?;
                Ok(Intent::DeleteTask { task })
            }
            "TASK_INQUIRY" | "QUERY_TASKS" | "GET_TASK" => {
                let filter = field_str(value, "filter")
                    .or_else(|| field_str(value, "is_completed"))
                    .map(|f| decode_filter(&f))
                    .unwrap_or(TaskFilter::All);
                Ok(Intent::QueryTasks { filter })
            }
            "SET_TIMMY_ZONE_RED" => Ok(Intent::SetZone { zone: Zone::Red }),
            "SET_TIMMY_ZONE_GREEN" => Ok(Intent::SetZone { zone: Zone::Green }),
            "SET_TIMMY_ZONE_BLUE" => Ok(Intent::SetZone { zone: Zone::Blue }),
            "SET_TIMMY_ZONE" => {
                let zone_str = field_str(value, "zone")
                    .ok_or_else(|| DecodeError("SET_TIMMY_ZONE missing 'zone'".into()))?;
                let zone = Zone::from_str(&zone_str).map_err(DecodeError)?;
                Ok(Intent::SetZone { zone })
            }
            "NO_TASK_IDENTIFIED" | "NO_TASK" => Ok(Intent::NoTask),
            other => Err(DecodeError(format!("unknown intent tag: {}", other))),
        }
    }
}

/// The extractor's result for one turn: the typed intent, the raw analyzer
/// object (audited verbatim), and the failure reason when decoding fell back.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub intent: Intent,
    pub raw: Value,
    pub error: Option<String>,
}

impl Analysis {
    pub fn ok(intent: Intent, raw: Value) -> Self {
        Self {
            intent,
            raw,
            error: None,
        }
    }

    /// The NO_TASK_IDENTIFIED substitute used for any extraction failure.
    pub fn failed(reason: impl Into<String>, raw: Value) -> Self {
        Self {
            intent: Intent::NoTask,
            raw,
            error: Some(reason.into()),
        }
    }

    /// The JSON record written to the audit log.
    pub fn audit_record(&self) -> Value {
        serde_json::json!({
            "intent": self.intent.tag(),
            "raw": self.raw,
            "error": self.error,
        })
    }
}

// =============================================================================
// Field helpers
// =============================================================================

/// Read a string field from the top level or the nested `details` object,
/// harmonizing `Rewards` to `Reward`. Literal "null" and empty strings count
/// as absent.
fn field_str(value: &Value, key: &str) -> Option<String> {
    let lookup = |obj: &Value, key: &str| -> Option<String> {
        let direct = obj.get(key);
        let aliased = if key == "Reward" { obj.get("Rewards") } else { None };
        direct
            .or(aliased)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
            .map(String::from)
    };
    lookup(value, key).or_else(|| value.get("details").and_then(|d| lookup(d, key)))
}

fn decode_draft(value: &Value) -> Result<TaskDraft, DecodeError> {
    let task = field_str(value, "task")
        .ok_or_else(|| DecodeError("ADD_TASK missing 'task'".into()))?;

    let status = match field_str(value, "is_completed") {
        Some(s) => TaskStatus::from_str(&s).map_err(DecodeError)?,
        None => TaskStatus::Pending,
    };

    Ok(TaskDraft {
        task,
        status,
        due_date: field_str(value, "Due_Date")
            .filter(|d| !d.eq_ignore_ascii_case("none") && !d.eq_ignore_ascii_case("unknown"))
            .unwrap_or_else(|| "Today".to_string()),
        due_time: field_str(value, "Due_Time").unwrap_or_else(|| "Unknown".to_string()),
        reward: field_str(value, "Reward").unwrap_or_else(|| "None".to_string()),
    })
}

fn decode_changes(value: &Value) -> Result<TaskChanges, DecodeError> {
    let obj = value
        .as_object()
        .ok_or_else(|| DecodeError("'updates' is not a JSON object".into()))?;

    let mut changes = TaskChanges::default();
    for (key, val) in obj {
        let Some(s) = val.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        match key.as_str() {
            "task" => changes.task = Some(s.to_string()),
            "is_completed" => {
                changes.status = Some(TaskStatus::from_str(s).map_err(DecodeError)?)
            }
            "Due_Date" => changes.due_date = Some(s.to_string()),
            "Due_Time" => changes.due_time = Some(s.to_string()),
            "Reward" | "Rewards" => changes.reward = Some(s.to_string()),
            other => return Err(DecodeError(format!("unknown update field: {}", other))),
        }
    }
    Ok(changes)
}

fn decode_filter(raw: &str) -> TaskFilter {
    if raw.eq_ignore_ascii_case("all") {
        return TaskFilter::All;
    }
    match TaskStatus::from_str(raw) {
        Ok(status) => TaskFilter::Status(status),
        Err(_) => TaskFilter::Named(raw.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================
