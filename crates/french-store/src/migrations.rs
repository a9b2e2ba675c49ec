//! Database schema migrations.
//!
//! Applies the initial schema: tasks, messages (with an FTS5 shadow table
//! for relevance-ranked history retrieval), the analyzer audit log, and the
//! single-row zone table.

use rusqlite::Connection;
use tracing::info;

use french_core::error::FrenchError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), FrenchError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| FrenchError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| FrenchError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), FrenchError> {
    conn.execute_batch(
        "
        -- Task records.
        CREATE TABLE IF NOT EXISTS tasks (
            id          TEXT PRIMARY KEY NOT NULL,
            task        TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'Pending'
                        CHECK (status IN ('Pending', 'Progress', 'Completed')),
            due_date    TEXT NOT NULL DEFAULT 'Unknown',
            due_time    TEXT NOT NULL DEFAULT 'Unknown',
            reward      TEXT NOT NULL DEFAULT 'None',
            recurrence  TEXT,
            updated_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_status
            ON tasks (status, updated_at DESC);

        -- Per-channel conversation log. Append-only.
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY NOT NULL,
            channel     TEXT NOT NULL
                        CHECK (channel IN ('parent-child', 'parent-mediator', 'child-mediator')),
            role        TEXT NOT NULL
                        CHECK (role IN ('user', 'assistant', 'system')),
            sender      TEXT NOT NULL,
            content     TEXT NOT NULL,
            timestamp   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_channel
            ON messages (channel, timestamp DESC);

        -- FTS5 shadow table over message content, kept in sync by triggers.
        CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
            content,
            content='messages',
            content_rowid='rowid'
        );

        CREATE TRIGGER IF NOT EXISTS messages_fts_insert
        AFTER INSERT ON messages BEGIN
            INSERT INTO messages_fts (rowid, content)
            VALUES (new.rowid, new.content);
        END;

        CREATE TRIGGER IF NOT EXISTS messages_fts_delete
        AFTER DELETE ON messages BEGIN
            INSERT INTO messages_fts (messages_fts, rowid, content)
            VALUES ('delete', old.rowid, old.content);
        END;

        -- Analyzer audit log: one row per analyzed turn.
        CREATE TABLE IF NOT EXISTS audit_log (
            id              TEXT PRIMARY KEY NOT NULL,
            channel         TEXT NOT NULL,
            original_input  TEXT NOT NULL,
            analysis        TEXT NOT NULL,
            timestamp       INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp
            ON audit_log (timestamp DESC);

        -- Single-row zone scalar.
        CREATE TABLE IF NOT EXISTS zone (
            id          INTEGER PRIMARY KEY CHECK (id = 1),
            zone        TEXT NOT NULL CHECK (zone IN ('Red', 'Green', 'Blue')),
            updated_at  INTEGER NOT NULL
        );

        -- Record migration.
        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| FrenchError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
