//! Applies a decoded intent to the task store.
//!
//! Every branch returns a human-readable confirmation plus a typed
//! [`ActionKind`] the responder nodes use to pick their framing. Store
//! failures never escape: they are logged and collapsed into a generic
//! trouble message, per the error-recovery contract.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use french_core::error::FrenchError;
use french_core::types::{Channel, Message, Speaker, Task, TaskStatus, Zone};
use french_store::{HistoryStore, NewTask, TaskChanges, TaskRepository};

use crate::deadline::format_deadline;
use crate::intent::{Analysis, Intent, TaskDraft, TaskFilter};
use crate::prompts::STORE_TROUBLE;

/// What the applied intent actually did.
#[derive(Debug, Clone)]
pub enum ActionKind {
    Added(Task),
    Updated { task: Task, completed: bool },
    Deleted(String),
    Inquiry(Vec<Task>),
    ZoneRequest(Zone),
    Nothing,
}

/// Result of applying one intent.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub confirmation: String,
    pub kind: ActionKind,
}

impl ActionOutcome {
    fn nothing(confirmation: impl Into<String>) -> Self {
        Self {
            confirmation: confirmation.into(),
            kind: ActionKind::Nothing,
        }
    }
}

/// Dispatches intent records to the task store.
pub struct TaskActionHandler {
    tasks: Arc<TaskRepository>,
    history: Arc<HistoryStore>,
    similarity_threshold: f64,
}

impl TaskActionHandler {
    pub fn new(
        tasks: Arc<TaskRepository>,
        history: Arc<HistoryStore>,
        similarity_threshold: f64,
    ) -> Self {
        Self {
            tasks,
            history,
            similarity_threshold,
        }
    }

    /// Apply one analyzed intent. Never fails: store errors become the
    /// generic trouble confirmation.
    pub fn apply(&self, analysis: &Analysis, channel: Channel, speaker: Speaker) -> ActionOutcome {
        let result = match &analysis.intent {
            Intent::AddTask(draft) => self.add_task(draft, channel, speaker),
            Intent::UpdateTask {
                original_task_name,
                updates,
            } => self.update_task(original_task_name, updates),
            Intent::DeleteTask { task } => self.delete_task(task),
            Intent::QueryTasks { filter } => self.query_tasks(filter),
            Intent::SetZone { zone } => Ok(ActionOutcome {
                confirmation: format!("Okay, I've noted the request to set Timmy's zone to {}.", zone),
                kind: ActionKind::ZoneRequest(*zone),
            }),
            Intent::NoTask => Ok(ActionOutcome::nothing("")),
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(intent = analysis.intent.tag(), error = %e, "Task action failed");
                ActionOutcome::nothing(STORE_TROUBLE)
            }
        }
    }

    fn add_task(
        &self,
        draft: &TaskDraft,
        channel: Channel,
        speaker: Speaker,
    ) -> Result<ActionOutcome, FrenchError> {
        // Duplicate gate: a near-identical name means a rephrasing of an
        // existing chore, not a new one.
        if let Some(existing) = self
            .tasks
            .find_similar(&draft.task, self.similarity_threshold)?
        {
            return Ok(ActionOutcome::nothing(format!(
                "The task '{}' already exists. Would you like to update it instead?",
                existing.task
            )));
        }

        let recurrence = draft
            .due_date
            .eq_ignore_ascii_case("daily")
            .then(|| "Daily".to_string());

        let task = self.tasks.create(NewTask {
            task: draft.task.clone(),
            status: draft.status,
            due_date: draft.due_date.clone(),
            due_time: draft.due_time.clone(),
            reward: draft.reward.clone(),
            recurrence,
        })?;

        let deadline = format_deadline(&task.due_date, &task.due_time, Utc::now());
        let mut confirmation = format!(
            "Okay, I've added the task: '{}' for Timmy. Due: {}.",
            task.task, deadline
        );
        if task.reward != "None" {
            confirmation.push_str(&format!(" Reward: {}.", task.reward));
        }

        // A parent assigning through the mediator also tells the child.
        if channel == Channel::ParentMediator && speaker == Speaker::Parent {
            self.notify_child(&task, &deadline);
        }

        Ok(ActionOutcome {
            confirmation,
            kind: ActionKind::Added(task),
        })
    }

    /// Queue the new-assignment notification on the child-mediator channel.
    /// A failed write is logged and dropped; it never blocks the add.
    fn notify_child(&self, task: &Task, deadline: &str) {
        let mut content = format!(
            "Hi Timmy! Your parent just assigned you a new task: '{}'. It's due {}.",
            task.task, deadline
        );
        if task.reward != "None" {
            content.push_str(&format!(" You'll get {} for completing it!", task.reward));
        }

        let message = Message::from_speaker(Channel::ChildMediator, Speaker::Mediator, content);
        if let Err(e) = self.history.append(&message) {
            warn!(error = %e, "Failed to write child notification");
        }
    }

    fn update_task(
        &self,
        original_task_name: &str,
        updates: &TaskChanges,
    ) -> Result<ActionOutcome, FrenchError> {
        let Some(target) = self.resolve_by_name(original_task_name)? else {
            return Ok(ActionOutcome::nothing(format!(
                "I couldn't find a task named '{}' to update.",
                original_task_name
            )));
        };

        let updated = self.tasks.update(target.id, updates)?;
        let completed = updates.status == Some(TaskStatus::Completed);

        let confirmation = match updates.status {
            Some(status) => format!("I've updated '{}' to '{}'.", updated.task, status),
            None => format!("I've updated the task '{}' as requested.", updated.task),
        };

        Ok(ActionOutcome {
            confirmation,
            kind: ActionKind::Updated {
                task: updated,
                completed,
            },
        })
    }

    fn delete_task(&self, name: &str) -> Result<ActionOutcome, FrenchError> {
        let Some(target) = self.resolve_by_name(name)? else {
            return Ok(ActionOutcome::nothing(format!(
                "I couldn't find a task named '{}' to delete.",
                name
            )));
        };

        self.tasks.delete(target.id)?;
        Ok(ActionOutcome {
            confirmation: format!("Okay, I've removed the task: '{}'.", target.task),
            kind: ActionKind::Deleted(target.task),
        })
    }

    fn query_tasks(&self, filter: &TaskFilter) -> Result<ActionOutcome, FrenchError> {
        let matches = match filter {
            TaskFilter::All => self.tasks.list(None)?,
            TaskFilter::Status(status) => self.tasks.list(Some(*status))?,
            TaskFilter::Named(fragment) => {
                let needle = fragment.to_lowercase();
                self.tasks
                    .list(None)?
                    .into_iter()
                    .filter(|t| t.task.to_lowercase().contains(&needle))
                    .collect()
            }
        };

        Ok(ActionOutcome {
            confirmation: render_task_report(&matches),
            kind: ActionKind::Inquiry(matches),
        })
    }

    /// Resolve a task by name: exact match preferred (most recently updated
    /// first), fuzzy fallback above the similarity threshold.
    fn resolve_by_name(&self, name: &str) -> Result<Option<Task>, FrenchError> {
        let exact = self.tasks.find_by_name(name)?;
        if let Some(task) = exact.into_iter().next() {
            return Ok(Some(task));
        }
        self.tasks.find_similar(name, self.similarity_threshold)
    }
}

/// Render matched tasks for an inquiry reply, one line per task with its
/// natural-language deadline. An empty set yields the explicit sentence.
pub fn render_task_report(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "There are no tasks to report at the moment.".to_string();
    }

    let now = Utc::now();
    tasks
        .iter()
        .map(|task| {
            let mut line = format!("- '{}' (Status: {})", task.task, task.status);
            if task.due_date != "Unknown" || task.due_time != "Unknown" {
                line.push_str(&format!(
                    ", Due: {}",
                    format_deadline(&task.due_date, &task.due_time, now)
                ));
            }
            if task.reward != "None" {
                line.push_str(&format!(", Reward: {}", task.reward));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Tests
// =============================================================================
