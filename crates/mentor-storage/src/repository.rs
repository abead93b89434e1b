//! Repository implementations for SQLite-backed persistence.
//!
//! `MessageRepository` is append-only: there is no update or delete.
//! `MetricsRepository` keeps one interaction counter per group.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use mentor_core::error::MentorError;
use mentor_core::types::{Category, ChatMessage, GroupId, Role};

use crate::db::Database;

/// Repository for conversation messages.
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist one message and return it with its assigned id and timestamp.
    ///
    /// Timestamps are milliseconds and strictly increase within a group, so
    /// ordering by `created_at` always reproduces the append order.
    pub fn append(
        &self,
        group_id: &GroupId,
        role: Role,
        content: &str,
    ) -> Result<ChatMessage, MentorError> {
        self.db.with_conn(|conn| {
            let last: Option<i64> = conn
                .query_row(
                    "SELECT MAX(created_at) FROM messages WHERE group_id = ?1",
                    rusqlite::params![group_id.as_str()],
                    |row| row.get(0),
                )
                .map_err(|e| MentorError::Storage(e.to_string()))?;

            let now = Utc::now().timestamp_millis();
            let created_at = match last {
                Some(last) if last >= now => last + 1,
                _ => now,
            };
            let id = Uuid::new_v4();

            conn.execute(
                "INSERT INTO messages (id, group_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id.to_string(),
                    group_id.as_str(),
                    role.as_str(),
                    content,
                    created_at,
                ],
            )
            .map_err(|e| MentorError::Storage(format!("Failed to append message: {}", e)))?;

            Ok(ChatMessage {
                id,
                group_id: group_id.clone(),
                role,
                // Category is not persisted.
                category: Category::default(),
                content: content.to_string(),
                created_at: millis_to_datetime(created_at),
            })
        })
    }

    /// All messages of a group, oldest first.
    pub fn fetch_by_group(&self, group_id: &GroupId) -> Result<Vec<ChatMessage>, MentorError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, group_id, role, content, created_at
                     FROM messages
                     WHERE group_id = ?1
                     ORDER BY created_at ASC, seq ASC",
                )
                .map_err(|e| MentorError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![group_id.as_str()], |row| {
                    Ok(row_to_message(row))
                })
                .map_err(|e| MentorError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let message = row.map_err(|e| MentorError::Storage(e.to_string()))??;
                messages.push(message);
            }
            Ok(messages)
        })
    }

    /// Number of stored messages for a group.
    pub fn count_by_group(&self, group_id: &GroupId) -> Result<u64, MentorError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM messages WHERE group_id = ?1",
                    rusqlite::params![group_id.as_str()],
                    |row| row.get(0),
                )
                .map_err(|e| MentorError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for per-group interaction counters.
pub struct MetricsRepository {
    db: Arc<Database>,
}

impl MetricsRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Add one interaction to the group's counter, creating it if needed.
    pub fn increment_interactions(&self, group_id: &GroupId) -> Result<(), MentorError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_metrics (group_id, interactions, updated_at)
                 VALUES (?1, 1, ?2)
                 ON CONFLICT(group_id) DO UPDATE SET
                     interactions = interactions + 1,
                     updated_at = excluded.updated_at",
                rusqlite::params![group_id.as_str(), Utc::now().timestamp()],
            )
            .map_err(|e| MentorError::Storage(format!("Failed to increment metric: {}", e)))?;
            Ok(())
        })
    }

    /// Current interaction count; zero for unknown groups.
    pub fn interactions(&self, group_id: &GroupId) -> Result<u64, MentorError> {
        self.db.with_conn(|conn| {
            let value: Option<i64> = conn
                .query_row(
                    "SELECT interactions FROM group_metrics WHERE group_id = ?1",
                    rusqlite::params![group_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| MentorError::Storage(e.to_string()))?;
            Ok(value.unwrap_or(0) as u64)
        })
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<ChatMessage, MentorError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| MentorError::Storage(e.to_string()))?;
    let group_id: String = row
        .get(1)
        .map_err(|e| MentorError::Storage(e.to_string()))?;
    let role_str: String = row
        .get(2)
        .map_err(|e| MentorError::Storage(e.to_string()))?;
    let content: String = row
        .get(3)
        .map_err(|e| MentorError::Storage(e.to_string()))?;
    let created_at: i64 = row
        .get(4)
        .map_err(|e| MentorError::Storage(e.to_string()))?;

    let id = Uuid::parse_str(&id_str)
        .map_err(|e| MentorError::Storage(format!("Invalid message id {}: {}", id_str, e)))?;
    let role = role_str.parse::<Role>().map_err(MentorError::Storage)?;

    Ok(ChatMessage {
        id,
        group_id: GroupId(group_id),
        role,
        category: Category::default(),
        content,
        created_at: millis_to_datetime(created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repos() -> (MessageRepository, MetricsRepository) {
        let db = Arc::new(Database::in_memory().unwrap());
        (
            MessageRepository::new(Arc::clone(&db)),
            MetricsRepository::new(db),
        )
    }

    #[test]
    fn test_fetch_empty_group() {
        let (messages, _) = repos();
        let history = messages.fetch_by_group(&GroupId::new("nuevo")).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_append_then_fetch() {
        let (messages, _) = repos();
        let group = GroupId::new("g-1");
        let stored = messages
            .append(&group, Role::Student, "¿Cómo dividimos el trabajo?")
            .unwrap();

        let history = messages.fetch_by_group(&group).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, stored.id);
        assert_eq!(history[0].role, Role::Student);
        assert_eq!(history[0].content, "¿Cómo dividimos el trabajo?");
        assert_eq!(history[0].created_at, stored.created_at);
    }

    #[test]
    fn test_rapid_appends_keep_order() {
        let (messages, _) = repos();
        let group = GroupId::new("g-1");
        for i in 0..50 {
            let role = if i % 2 == 0 { Role::Student } else { Role::Mentor };
            messages.append(&group, role, &format!("mensaje {}", i)).unwrap();
        }

        let history = messages.fetch_by_group(&group).unwrap();
        assert_eq!(history.len(), 50);
        for (i, msg) in history.iter().enumerate() {
            assert_eq!(msg.content, format!("mensaje {}", i));
        }
        for pair in history.windows(2) {
            assert!(pair[0].created_at < pair[1].created_at);
        }
    }

    #[test]
    fn test_fetch_is_idempotent() {
        let (messages, _) = repos();
        let group = GroupId::new("g-1");
        messages.append(&group, Role::Student, "uno").unwrap();
        messages.append(&group, Role::Mentor, "dos").unwrap();

        let first = messages.fetch_by_group(&group).unwrap();
        let second = messages.fetch_by_group(&group).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_groups_are_isolated() {
        let (messages, _) = repos();
        messages.append(&GroupId::new("a"), Role::Student, "hola a").unwrap();
        messages.append(&GroupId::new("b"), Role::Student, "hola b").unwrap();

        let a = messages.fetch_by_group(&GroupId::new("a")).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "hola a");
        assert_eq!(messages.count_by_group(&GroupId::new("b")).unwrap(), 1);
    }

    #[test]
    fn test_loaded_category_defaults_to_creative() {
        let (messages, _) = repos();
        let group = GroupId::new("g-1");
        messages.append(&group, Role::Student, "¿Qué herramienta usamos?").unwrap();
        let history = messages.fetch_by_group(&group).unwrap();
        assert_eq!(history[0].category, Category::Creative);
    }

    #[test]
    fn test_increment_interactions() {
        let (_, metrics) = repos();
        let group = GroupId::new("g-1");
        assert_eq!(metrics.interactions(&group).unwrap(), 0);
        metrics.increment_interactions(&group).unwrap();
        metrics.increment_interactions(&group).unwrap();
        assert_eq!(metrics.interactions(&group).unwrap(), 2);
        assert_eq!(metrics.interactions(&GroupId::new("other")).unwrap(), 0);
    }
}
