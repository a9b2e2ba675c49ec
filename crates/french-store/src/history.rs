//! Per-channel conversation history and the analyzer audit log.
//!
//! Messages are append-only. Retrieval is either chronological (`recent`)
//! or relevance-ranked over the FTS5 shadow table (`similar`).

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use french_core::error::FrenchError;
use french_core::types::{Channel, Message, Role, Timestamp};

use crate::db::Database;

/// One analyzer run: the raw input and the full intent record, as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub channel: Channel,
    pub original_input: String,
    pub analysis: serde_json::Value,
    pub timestamp: Timestamp,
}

impl AuditEntry {
    pub fn new(channel: Channel, original_input: impl Into<String>, analysis: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            original_input: original_input.into(),
            analysis,
            timestamp: Timestamp::now(),
        }
    }
}

/// SQLite-backed message log.
pub struct HistoryStore {
    db: Arc<Database>,
}

impl HistoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one message to its channel's log.
    pub fn append(&self, message: &Message) -> Result<(), FrenchError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, channel, role, sender, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    message.id.to_string(),
                    message.channel.to_string(),
                    message.role.to_string(),
                    message.sender,
                    message.content,
                    message.timestamp.0,
                ],
            )
            .map_err(|e| FrenchError::History(format!("Failed to append message: {}", e)))?;
            Ok(())
        })
    }

    /// The most recent `n` messages of a channel, in chronological order.
    pub fn recent(&self, channel: Channel, n: usize) -> Result<Vec<Message>, FrenchError> {
        let mut messages = self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, channel, role, sender, content, timestamp
                     FROM messages
                     WHERE channel = ?1
                     ORDER BY timestamp DESC, rowid DESC
                     LIMIT ?2",
                )
                .map_err(|e| FrenchError::History(e.to_string()))?;

            let rows = stmt
                .query_map(
                    rusqlite::params![channel.to_string(), n as i64],
                    |row| Ok(row_to_message(row)),
                )
                .map_err(|e| FrenchError::History(e.to_string()))?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(|e| FrenchError::History(e.to_string()))??);
            }
            Ok(out)
        })?;
        messages.reverse();
        Ok(messages)
    }

    /// Relevance-ranked search over a channel's log (BM25, best first).
    ///
    /// The query text is free text from a user, so it is reduced to an
    /// OR-of-quoted-tokens FTS query rather than passed through raw.
    pub fn similar(
        &self,
        channel: Channel,
        query: &str,
        k: usize,
    ) -> Result<Vec<Message>, FrenchError> {
        let fts_query = to_fts_query(query);
        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT m.id, m.channel, m.role, m.sender, m.content, m.timestamp
                     FROM messages_fts
                     JOIN messages m ON m.rowid = messages_fts.rowid
                     WHERE messages_fts MATCH ?1 AND m.channel = ?2
                     ORDER BY rank
                     LIMIT ?3",
                )
                .map_err(|e| FrenchError::History(format!("FTS5 query prepare failed: {}", e)))?;

            let rows = stmt
                .query_map(
                    rusqlite::params![fts_query, channel.to_string(), k as i64],
                    |row| Ok(row_to_message(row)),
                )
                .map_err(|e| FrenchError::History(format!("FTS5 query failed: {}", e)))?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(|e| FrenchError::History(e.to_string()))??);
            }
            Ok(out)
        })
    }

    /// Record one analyzer run in the audit log.
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<(), FrenchError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO audit_log (id, channel, original_input, analysis, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    entry.id.to_string(),
                    entry.channel.to_string(),
                    entry.original_input,
                    entry.analysis.to_string(),
                    entry.timestamp.0,
                ],
            )
            .map_err(|e| FrenchError::History(format!("Failed to append audit entry: {}", e)))?;
            Ok(())
        })
    }

    /// The most recent `n` audit entries, newest first.
    pub fn recent_audit(&self, n: usize) -> Result<Vec<AuditEntry>, FrenchError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, channel, original_input, analysis, timestamp
                     FROM audit_log
                     ORDER BY timestamp DESC, rowid DESC
                     LIMIT ?1",
                )
                .map_err(|e| FrenchError::History(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![n as i64], |row| Ok(row_to_audit(row)))
                .map_err(|e| FrenchError::History(e.to_string()))?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(|e| FrenchError::History(e.to_string()))??);
            }
            Ok(out)
        })
    }

    /// Wipe every message and audit entry (used by the reset endpoint).
    pub fn clear_all(&self) -> Result<(), FrenchError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM messages", [])
                .map_err(|e| FrenchError::History(format!("Failed to clear messages: {}", e)))?;
            conn.execute("DELETE FROM audit_log", [])
                .map_err(|e| FrenchError::History(format!("Failed to clear audit log: {}", e)))?;
            Ok(())
        })
    }
}

/// Reduce free text to an FTS5 query: quoted tokens joined by OR.
fn to_fts_query(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, FrenchError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| FrenchError::History(e.to_string()))?;
    let channel_str: String = row
        .get(1)
        .map_err(|e| FrenchError::History(e.to_string()))?;
    let role_str: String = row
        .get(2)
        .map_err(|e| FrenchError::History(e.to_string()))?;

    Ok(Message {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| FrenchError::History(format!("Invalid UUID: {}", e)))?,
        channel: Channel::from_str(&channel_str).map_err(FrenchError::History)?,
        role: Role::from_str(&role_str).map_err(FrenchError::History)?,
        sender: row.get(3).map_err(|e| FrenchError::History(e.to_string()))?,
        content: row.get(4).map_err(|e| FrenchError::History(e.to_string()))?,
        timestamp: Timestamp(row.get(5).map_err(|e| FrenchError::History(e.to_string()))?),
    })
}

fn row_to_audit(row: &rusqlite::Row<'_>) -> Result<AuditEntry, FrenchError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| FrenchError::History(e.to_string()))?;
    let channel_str: String = row
        .get(1)
        .map_err(|e| FrenchError::History(e.to_string()))?;
    let analysis_str: String = row
        .get(3)
        .map_err(|e| FrenchError::History(e.to_string()))?;

    Ok(AuditEntry {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| FrenchError::History(format!("Invalid UUID: {}", e)))?,
        channel: Channel::from_str(&channel_str).map_err(FrenchError::History)?,
        original_input: row.get(2).map_err(|e| FrenchError::History(e.to_string()))?,
        analysis: serde_json::from_str(&analysis_str)
            .map_err(|e| FrenchError::History(format!("Invalid audit JSON: {}", e)))?,
        timestamp: Timestamp(row.get(4).map_err(|e| FrenchError::History(e.to_string()))?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use french_core::types::Speaker;

    fn make_store() -> HistoryStore {
        HistoryStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn say(store: &HistoryStore, channel: Channel, speaker: Speaker, content: &str) {
        store
            .append(&Message::from_speaker(channel, speaker, content))
            .unwrap();
    }

    #[test]
    fn test_append_and_recent_chronological() {
        let store = make_store();
        say(&store, Channel::ParentChild, Speaker::Parent, "first");
        say(&store, Channel::ParentChild, Speaker::Child, "second");
        say(&store, Channel::ParentChild, Speaker::Parent, "third");

        let recent = store.recent(Channel::ParentChild, 10).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "first");
        assert_eq!(recent[2].content, "third");
    }

    #[test]
    fn test_recent_respects_limit() {
        let store = make_store();
        for i in 0..5 {
            say(&store, Channel::ParentMediator, Speaker::Parent, &format!("msg {}", i));
        }
        let recent = store.recent(Channel::ParentMediator, 2).unwrap();
        assert_eq!(recent.len(), 2);
        // The two newest, still chronological.
        assert_eq!(recent[0].content, "msg 3");
        assert_eq!(recent[1].content, "msg 4");
    }

    #[test]
    fn test_channels_are_isolated() {
        let store = make_store();
        say(&store, Channel::ParentChild, Speaker::Parent, "for timmy");
        say(&store, Channel::ParentMediator, Speaker::Parent, "for mr french");

        let pc = store.recent(Channel::ParentChild, 10).unwrap();
        assert_eq!(pc.len(), 1);
        assert_eq!(pc[0].content, "for timmy");
        assert_eq!(store.recent(Channel::ChildMediator, 10).unwrap().len(), 0);
    }

    #[test]
    fn test_duplicate_appends_are_kept() {
        // Ingestion has no dedup by design.
        let store = make_store();
        say(&store, Channel::ParentChild, Speaker::Parent, "same text");
        say(&store, Channel::ParentChild, Speaker::Parent, "same text");
        assert_eq!(store.recent(Channel::ParentChild, 10).unwrap().len(), 2);
    }

    #[test]
    fn test_similar_ranks_matching_messages() {
        let store = make_store();
        say(&store, Channel::ChildMediator, Speaker::Child, "I finished my math homework");
        say(&store, Channel::ChildMediator, Speaker::Child, "can we play a game");

        let hits = store
            .similar(Channel::ChildMediator, "homework", 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("homework"));
    }

    #[test]
    fn test_similar_is_channel_scoped() {
        let store = make_store();
        say(&store, Channel::ParentChild, Speaker::Parent, "clean your room");
        say(&store, Channel::ChildMediator, Speaker::Child, "my room is clean now");

        let hits = store.similar(Channel::ParentChild, "room", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].channel, Channel::ParentChild);
    }

    #[test]
    fn test_similar_survives_fts_operators_in_query() {
        let store = make_store();
        say(&store, Channel::ParentMediator, Speaker::Parent, "add a task");
        // Quotes and operators in raw user text must not break the query.
        let hits = store
            .similar(Channel::ParentMediator, "\"task\" AND (NOT", 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_similar_empty_query() {
        let store = make_store();
        assert!(store
            .similar(Channel::ParentChild, "  ... ", 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_audit_round_trip() {
        let store = make_store();
        let entry = AuditEntry::new(
            Channel::ParentMediator,
            "add a task",
            serde_json::json!({"intent": "ADD_TASK", "task": "clean room"}),
        );
        store.append_audit(&entry).unwrap();

        let recent = store.recent_audit(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].original_input, "add a task");
        assert_eq!(recent[0].analysis["intent"], "ADD_TASK");
    }

    #[test]
    fn test_clear_all() {
        let store = make_store();
        say(&store, Channel::ParentChild, Speaker::Parent, "hello");
        store
            .append_audit(&AuditEntry::new(
                Channel::ParentChild,
                "hello",
                serde_json::json!({"intent": "NO_TASK_IDENTIFIED"}),
            ))
            .unwrap();

        store.clear_all().unwrap();
        assert!(store.recent(Channel::ParentChild, 10).unwrap().is_empty());
        assert!(store.recent_audit(10).unwrap().is_empty());
    }
}
