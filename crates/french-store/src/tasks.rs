//! Task repository: CRUD over task records plus exact and fuzzy name lookup.

use std::str::FromStr;
use std::sync::Arc;

use rusqlite::OptionalExtension;
use uuid::Uuid;

use french_core::error::FrenchError;
use french_core::types::{Task, TaskStatus, Timestamp};

use crate::db::Database;
use crate::matching::similarity;

/// Fields for creating a new task. Defaults mirror the extraction policy:
/// status Pending, date Today, time Unknown, no reward.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task: String,
    pub status: TaskStatus,
    pub due_date: String,
    pub due_time: String,
    pub reward: String,
    pub recurrence: Option<String>,
}

impl Default for NewTask {
    fn default() -> Self {
        Self {
            task: String::new(),
            status: TaskStatus::Pending,
            due_date: "Today".to_string(),
            due_time: "Unknown".to_string(),
            reward: "None".to_string(),
            recurrence: None,
        }
    }
}

/// Partial update applied to an existing task. Only provided fields change;
/// `updated_at` is always refreshed.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub task: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub reward: Option<String>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.task.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
            && self.due_time.is_none()
            && self.reward.is_none()
    }
}

/// SQLite-backed task store.
pub struct TaskRepository {
    db: Arc<Database>,
}

impl TaskRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new task record, assigning its id and `updated_at`.
    pub fn create(&self, new_task: NewTask) -> Result<Task, FrenchError> {
        let task = Task {
            id: Uuid::new_v4(),
            task: new_task.task,
            status: new_task.status,
            due_date: new_task.due_date,
            due_time: new_task.due_time,
            reward: new_task.reward,
            recurrence: new_task.recurrence,
            updated_at: Timestamp::now(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, task, status, due_date, due_time, reward, recurrence, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    task.id.to_string(),
                    task.task,
                    task.status.to_string(),
                    task.due_date,
                    task.due_time,
                    task.reward,
                    task.recurrence,
                    task.updated_at.0,
                ],
            )
            .map_err(|e| FrenchError::Storage(format!("Failed to create task: {}", e)))?;
            Ok(())
        })?;

        Ok(task)
    }

    /// Apply a partial update, refreshing `updated_at`. Returns the updated
    /// task, or an error if the id does not exist.
    pub fn update(&self, id: Uuid, changes: &TaskChanges) -> Result<Task, FrenchError> {
        let now = Timestamp::now();
        self.db.with_conn(|conn| {
            let affected = conn
                .execute(
                    "UPDATE tasks SET
                        task       = COALESCE(?2, task),
                        status     = COALESCE(?3, status),
                        due_date   = COALESCE(?4, due_date),
                        due_time   = COALESCE(?5, due_time),
                        reward     = COALESCE(?6, reward),
                        updated_at = ?7
                     WHERE id = ?1",
                    rusqlite::params![
                        id.to_string(),
                        changes.task,
                        changes.status.map(|s| s.to_string()),
                        changes.due_date,
                        changes.due_time,
                        changes.reward,
                        now.0,
                    ],
                )
                .map_err(|e| FrenchError::Storage(format!("Failed to update task: {}", e)))?;

            if affected == 0 {
                return Err(FrenchError::Storage(format!("No task with id {}", id)));
            }
            Ok(())
        })?;

        self.get(id)?
            .ok_or_else(|| FrenchError::Storage(format!("No task with id {}", id)))
    }

    /// Hard-delete a task. Returns whether a row was removed.
    pub fn delete(&self, id: Uuid) -> Result<bool, FrenchError> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute(
                    "DELETE FROM tasks WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                )
                .map_err(|e| FrenchError::Storage(format!("Failed to delete task: {}", e)))?;
            Ok(affected > 0)
        })
    }

    /// Fetch a single task by id.
    pub fn get(&self, id: Uuid) -> Result<Option<Task>, FrenchError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, task, status, due_date, due_time, reward, recurrence, updated_at
                     FROM tasks WHERE id = ?1",
                )
                .map_err(|e| FrenchError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![id.to_string()], |row| Ok(row_to_task(row)))
                .optional()
                .map_err(|e| FrenchError::Storage(e.to_string()))?;

            match result {
                Some(task) => Ok(Some(task?)),
                None => Ok(None),
            }
        })
    }

    /// List tasks, optionally filtered by status, most recently updated first.
    pub fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Task>, FrenchError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, task, status, due_date, due_time, reward, recurrence, updated_at
                     FROM tasks
                     WHERE (?1 IS NULL OR status = ?1)
                     ORDER BY updated_at DESC",
                )
                .map_err(|e| FrenchError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(
                    rusqlite::params![status.map(|s| s.to_string())],
                    |row| Ok(row_to_task(row)),
                )
                .map_err(|e| FrenchError::Storage(e.to_string()))?;

            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row.map_err(|e| FrenchError::Storage(e.to_string()))??);
            }
            Ok(tasks)
        })
    }

    /// Exact case-insensitive name lookup, most recently updated first.
    pub fn find_by_name(&self, name: &str) -> Result<Vec<Task>, FrenchError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, task, status, due_date, due_time, reward, recurrence, updated_at
                     FROM tasks
                     WHERE task = ?1 COLLATE NOCASE
                     ORDER BY updated_at DESC",
                )
                .map_err(|e| FrenchError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![name], |row| Ok(row_to_task(row)))
                .map_err(|e| FrenchError::Storage(e.to_string()))?;

            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row.map_err(|e| FrenchError::Storage(e.to_string()))??);
            }
            Ok(tasks)
        })
    }

    /// Fuzzy name lookup: the single task whose name is most similar to
    /// `name`, provided the similarity reaches `threshold`. Ties on score go
    /// to the most recently updated task (the list is already ordered so).
    pub fn find_similar(&self, name: &str, threshold: f64) -> Result<Option<Task>, FrenchError> {
        let mut best: Option<(f64, Task)> = None;
        for task in self.list(None)? {
            let score = similarity(name, &task.task);
            if score < threshold {
                continue;
            }
            match &best {
                Some((best_score, _)) if score <= *best_score => {}
                _ => best = Some((score, task)),
            }
        }
        Ok(best.map(|(_, task)| task))
    }

    /// Remove every task (used by the reset endpoint).
    pub fn delete_all(&self) -> Result<(), FrenchError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM tasks", [])
                .map_err(|e| FrenchError::Storage(format!("Failed to clear tasks: {}", e)))?;
            Ok(())
        })
    }
}

/// Map a SELECT row (in canonical column order) to a Task.
fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, FrenchError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| FrenchError::Storage(e.to_string()))?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| FrenchError::Storage(format!("Invalid UUID: {}", e)))?;

    let status_str: String = row
        .get(2)
        .map_err(|e| FrenchError::Storage(e.to_string()))?;
    let status = TaskStatus::from_str(&status_str).map_err(FrenchError::Storage)?;

    Ok(Task {
        id,
        task: row.get(1).map_err(|e| FrenchError::Storage(e.to_string()))?,
        status,
        due_date: row.get(3).map_err(|e| FrenchError::Storage(e.to_string()))?,
        due_time: row.get(4).map_err(|e| FrenchError::Storage(e.to_string()))?,
        reward: row.get(5).map_err(|e| FrenchError::Storage(e.to_string()))?,
        recurrence: row.get(6).map_err(|e| FrenchError::Storage(e.to_string()))?,
        updated_at: Timestamp(row.get(7).map_err(|e| FrenchError::Storage(e.to_string()))?),
    })
}
