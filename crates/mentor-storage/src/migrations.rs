//! Database schema migrations.
//!
//! Applies the conversation schema: the append-only messages table and the
//! per-group interaction counters.

use rusqlite::Connection;
use tracing::info;

use mentor_core::error::MentorError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), MentorError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| MentorError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| MentorError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: conversation_schema");
    }

    Ok(())
}

/// Version 1: messages and group metrics.
fn apply_v1(conn: &Connection) -> Result<(), MentorError> {
    conn.execute_batch(
        "
        -- Append-only conversation log. `seq` breaks ties between equal timestamps.
        CREATE TABLE IF NOT EXISTS messages (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            group_id    TEXT NOT NULL,
            role        TEXT NOT NULL
                        CHECK (role IN ('student', 'mentor')),
            content     TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_group_created
            ON messages (group_id, created_at ASC, seq ASC);

        -- Interaction counters, one row per group.
        CREATE TABLE IF NOT EXISTS group_metrics (
            group_id     TEXT PRIMARY KEY NOT NULL,
            interactions INTEGER NOT NULL DEFAULT 0,
            updated_at   INTEGER NOT NULL
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'conversation_schema');
        ",
    )
    .map_err(|e| MentorError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}
