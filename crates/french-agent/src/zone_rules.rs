//! Automatic zone suggestion from task counts.
//!
//! After each conversation turn the monitor reviews the store: a pile of
//! pending tasks, or several already overdue today, suggests Red; otherwise
//! Green. Blue is explicit-only in both directions — the monitor neither
//! sets it nor overrides it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use french_core::config::ZoneConfig;
use french_core::error::FrenchError;
use french_core::types::{Task, TaskStatus, Zone};
use french_store::{TaskRepository, ZoneStore};

use crate::deadline::resolve_due;

/// Pure suggestion rule over the current task set.
pub fn suggest_zone(tasks: &[Task], now: DateTime<Utc>, config: &ZoneConfig) -> Zone {
    let pending: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .collect();

    if pending.len() >= config.red_pending_threshold {
        return Zone::Red;
    }

    let overdue_today = pending
        .iter()
        .filter(|t| {
            resolve_due(&t.due_date, &t.due_time, now)
                .map(|due| due < now && due.date_naive() == now.date_naive())
                .unwrap_or(false)
        })
        .count();

    if overdue_today >= config.red_overdue_threshold {
        Zone::Red
    } else {
        Zone::Green
    }
}

/// Applies the suggestion to the zone store after each turn.
pub struct ZoneMonitor {
    tasks: Arc<TaskRepository>,
    zone: Arc<ZoneStore>,
    config: ZoneConfig,
}

impl ZoneMonitor {
    pub fn new(tasks: Arc<TaskRepository>, zone: Arc<ZoneStore>, config: ZoneConfig) -> Self {
        Self {
            tasks,
            zone,
            config,
        }
    }

    /// Review the store and move the zone if the suggestion differs.
    /// A Blue zone is left untouched. Returns the zone now in effect.
    pub fn review(&self, now: DateTime<Utc>) -> Result<Zone, FrenchError> {
        let current = self.zone.get()?;
        if current == Zone::Blue {
            return Ok(current);
        }

        let suggested = suggest_zone(&self.tasks.list(None)?, now, &self.config);
        if suggested != current {
            info!(from = %current, to = %suggested, "Zone changed by task review");
            self.zone.set(suggested)?;
        }
        Ok(suggested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use french_core::types::Timestamp;
    use french_store::{Database, NewTask};
    use uuid::Uuid;

    fn task(status: TaskStatus, due_date: &str, due_time: &str) -> Task {
        Task {
            id: Uuid::new_v4(),
            task: "chore".to_string(),
            status,
            due_date: due_date.to_string(),
            due_time: due_time.to_string(),
            reward: "None".to_string(),
            recurrence: None,
            updated_at: Timestamp::now(),
        }
    }

    fn noon() -> DateTime<Utc> {
        chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 7, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_few_pending_tasks_is_green() {
        let tasks = vec![
            task(TaskStatus::Pending, "Tomorrow", "Unknown"),
            task(TaskStatus::Completed, "Today", "Unknown"),
        ];
        assert_eq!(suggest_zone(&tasks, noon(), &ZoneConfig::default()), Zone::Green);
    }

    #[test]
    fn test_many_pending_tasks_is_red() {
        let tasks: Vec<Task> = (0..5)
            .map(|_| task(TaskStatus::Pending, "Tomorrow", "Unknown"))
            .collect();
        assert_eq!(suggest_zone(&tasks, noon(), &ZoneConfig::default()), Zone::Red);
    }

    #[test]
    fn test_completed_tasks_do_not_count() {
        let tasks: Vec<Task> = (0..5)
            .map(|_| task(TaskStatus::Completed, "Today", "morning"))
            .collect();
        assert_eq!(suggest_zone(&tasks, noon(), &ZoneConfig::default()), Zone::Green);
    }

    #[test]
    fn test_same_day_overdue_is_red() {
        // Three pending tasks due this morning, reviewed at noon.
        let tasks: Vec<Task> = (0..3)
            .map(|_| task(TaskStatus::Pending, "Today", "morning"))
            .collect();
        assert_eq!(suggest_zone(&tasks, noon(), &ZoneConfig::default()), Zone::Red);
    }

    #[test]
    fn test_future_deadlines_today_are_not_overdue() {
        let tasks: Vec<Task> = (0..3)
            .map(|_| task(TaskStatus::Pending, "Today", "evening"))
            .collect();
        assert_eq!(suggest_zone(&tasks, noon(), &ZoneConfig::default()), Zone::Green);
    }

    #[test]
    fn test_blue_is_never_suggested() {
        assert_eq!(suggest_zone(&[], noon(), &ZoneConfig::default()), Zone::Green);
    }

    fn make_monitor() -> (ZoneMonitor, Arc<TaskRepository>, Arc<ZoneStore>) {
        let db = Arc::new(Database::in_memory().unwrap());
        let tasks = Arc::new(TaskRepository::new(Arc::clone(&db)));
        let zone = Arc::new(ZoneStore::new(Arc::clone(&db)));
        let monitor = ZoneMonitor::new(Arc::clone(&tasks), Arc::clone(&zone), ZoneConfig::default());
        (monitor, tasks, zone)
    }

    fn add_pending(tasks: &TaskRepository, n: usize) {
        for i in 0..n {
            tasks
                .create(NewTask {
                    task: format!("chore {}", i),
                    due_date: "Tomorrow".to_string(),
                    ..NewTask::default()
                })
                .unwrap();
        }
    }

    #[test]
    fn test_monitor_moves_green_to_red() {
        let (monitor, tasks, zone) = make_monitor();
        add_pending(&tasks, 5);
        assert_eq!(monitor.review(noon()).unwrap(), Zone::Red);
        assert_eq!(zone.get().unwrap(), Zone::Red);
    }

    #[test]
    fn test_monitor_moves_red_back_to_green() {
        let (monitor, _, zone) = make_monitor();
        zone.set(Zone::Red).unwrap();
        assert_eq!(monitor.review(noon()).unwrap(), Zone::Green);
        assert_eq!(zone.get().unwrap(), Zone::Green);
    }

    #[test]
    fn test_monitor_leaves_blue_alone() {
        let (monitor, tasks, zone) = make_monitor();
        zone.set(Zone::Blue).unwrap();
        add_pending(&tasks, 5);
        assert_eq!(monitor.review(noon()).unwrap(), Zone::Blue);
        assert_eq!(zone.get().unwrap(), Zone::Blue);
    }
}
