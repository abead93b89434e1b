//! Conversation persistence seen from the chat pipeline.

use std::sync::Arc;

use async_trait::async_trait;

use mentor_core::types::{ChatMessage, GroupId, Role};
use mentor_storage::MessageRepository;

use crate::error::ChatError;

/// Append-only conversation store keyed by group.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// All messages of the group, oldest first. Empty means a new conversation.
    async fn fetch_history(&self, group_id: &GroupId) -> Result<Vec<ChatMessage>, ChatError>;

    /// Persist one message; the store assigns its id and timestamp.
    async fn append(
        &self,
        group_id: &GroupId,
        role: Role,
        content: &str,
    ) -> Result<ChatMessage, ChatError>;
}

/// Store backed by the SQLite message repository.
pub struct SqliteMessageStore {
    repo: Arc<MessageRepository>,
}

impl SqliteMessageStore {
    pub fn new(repo: Arc<MessageRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn fetch_history(&self, group_id: &GroupId) -> Result<Vec<ChatMessage>, ChatError> {
        let repo = Arc::clone(&self.repo);
        let group_id = group_id.clone();
        tokio::task::spawn_blocking(move || repo.fetch_by_group(&group_id))
            .await
            .map_err(|e| ChatError::Persistence(format!("fetch task failed: {}", e)))?
            .map_err(ChatError::from)
    }

    async fn append(
        &self,
        group_id: &GroupId,
        role: Role,
        content: &str,
    ) -> Result<ChatMessage, ChatError> {
        let repo = Arc::clone(&self.repo);
        let group_id = group_id.clone();
        let content = content.to_string();
        tokio::task::spawn_blocking(move || repo.append(&group_id, role, &content))
            .await
            .map_err(|e| ChatError::Persistence(format!("append task failed: {}", e)))?
            .map_err(ChatError::from)
    }
}
