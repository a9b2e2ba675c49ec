//! Periodic reminder scans and recurring-task resets.
//!
//! An independent background loop: every `interval_secs` it looks for
//! pending tasks whose deadline falls within the reminder window and queues
//! a mediator-authored nudge on the child-mediator channel. Once a day it
//! also resets completed recurring tasks back to Pending.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Notify;
use tracing::{info, warn};
use uuid::Uuid;

use french_core::config::ReminderConfig;
use french_core::types::{Channel, Message, Speaker, Task, TaskStatus};
use french_store::{HistoryStore, TaskChanges, TaskRepository};

use crate::deadline::{format_deadline, resolve_due};

/// Background reminder scheduler.
pub struct ReminderScheduler {
    tasks: Arc<TaskRepository>,
    history: Arc<HistoryStore>,
    config: ReminderConfig,
    shutdown: Arc<Notify>,
    /// Tasks already reminded this cycle, to avoid repeating the nudge
    /// every scan until the deadline passes.
    reminded: Mutex<HashSet<Uuid>>,
    last_recurring_reset: Mutex<Option<NaiveDate>>,
}

impl ReminderScheduler {
    pub fn new(
        tasks: Arc<TaskRepository>,
        history: Arc<HistoryStore>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            tasks,
            history,
            config,
            shutdown: Arc::new(Notify::new()),
            reminded: Mutex::new(HashSet::new()),
            last_recurring_reset: Mutex::new(None),
        }
    }

    /// Run the scheduler loop until shutdown is signaled.
    pub async fn run(&self) {
        if !self.config.enabled {
            info!("Reminder scheduler disabled in config");
            return;
        }

        let interval = std::time::Duration::from_secs(self.config.interval_secs);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.tick(Utc::now());
                }
                _ = self.shutdown.notified() => {
                    info!("Reminder scheduler shutting down");
                    return;
                }
            }
        }
    }

    /// Signal the scheduler to shut down gracefully.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// One scan: send due-soon reminders, then the daily recurring reset.
    /// Store failures are logged and skipped; the loop never dies.
    pub fn tick(&self, now: DateTime<Utc>) {
        match self.tasks.list(Some(TaskStatus::Pending)) {
            Ok(pending) => {
                for task in &pending {
                    if self.needs_reminder(task, now) {
                        self.send_reminder(task, now);
                    }
                }
            }
            Err(e) => warn!(error = %e, "Reminder scan failed to list tasks"),
        }

        self.reset_recurring(now);
    }

    fn needs_reminder(&self, task: &Task, now: DateTime<Utc>) -> bool {
        let Some(due) = resolve_due(&task.due_date, &task.due_time, now) else {
            return false;
        };
        let remaining = due - now;
        if remaining <= chrono::Duration::zero()
            || remaining > chrono::Duration::hours(self.config.window_hours)
        {
            return false;
        }
        self.reminded
            .lock()
            .map(|seen| !seen.contains(&task.id))
            .unwrap_or(false)
    }

    fn send_reminder(&self, task: &Task, now: DateTime<Utc>) {
        let content = format!(
            "Hey Timmy, just a reminder: '{}' is due {}.",
            task.task,
            format_deadline(&task.due_date, &task.due_time, now)
        );
        let message = Message::from_speaker(Channel::ChildMediator, Speaker::Mediator, content);

        match self.history.append(&message) {
            Ok(()) => {
                info!(task = %task.task, "Reminder sent");
                if let Ok(mut seen) = self.reminded.lock() {
                    seen.insert(task.id);
                }
            }
            Err(e) => warn!(task = %task.task, error = %e, "Failed to write reminder"),
        }
    }

    /// Once per calendar day, flip completed recurring tasks back to Pending
    /// so the next cycle can remind about them again.
    fn reset_recurring(&self, now: DateTime<Utc>) {
        let today = now.date_naive();
        {
            let Ok(mut last) = self.last_recurring_reset.lock() else {
                return;
            };
            if *last == Some(today) {
                return;
            }
            *last = Some(today);
        }

        let completed = match self.tasks.list(Some(TaskStatus::Completed)) {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "Recurring reset failed to list tasks");
                return;
            }
        };

        for task in completed {
            let recurring =
                task.recurrence.is_some() || task.due_date.eq_ignore_ascii_case("daily");
            if !recurring {
                continue;
            }

            let changes = TaskChanges {
                status: Some(TaskStatus::Pending),
                ..TaskChanges::default()
            };
            match self.tasks.update(task.id, &changes) {
                Ok(_) => {
                    info!(task = %task.task, "Recurring task reset to Pending");
                    if let Ok(mut seen) = self.reminded.lock() {
                        seen.remove(&task.id);
                    }
                }
                Err(e) => warn!(task = %task.task, error = %e, "Recurring reset failed"),
            }
        }
    }
}
