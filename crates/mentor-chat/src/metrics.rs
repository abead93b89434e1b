//! Per-group interaction counters.

use std::sync::Arc;

use async_trait::async_trait;

use mentor_core::types::GroupId;
use mentor_storage::MetricsRepository;

use crate::error::ChatError;

/// Fire-and-forget metric updates. Callers log failures and move on.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn increment_interactions(&self, group_id: &GroupId) -> Result<(), ChatError>;
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

#[async_trait]
impl MetricsSink for NoopMetrics {
    async fn increment_interactions(&self, _group_id: &GroupId) -> Result<(), ChatError> {
        Ok(())
    }
}

/// SQLite-backed counters.
pub struct SqliteMetricsSink {
    repo: Arc<MetricsRepository>,
}

impl SqliteMetricsSink {
    pub fn new(repo: Arc<MetricsRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl MetricsSink for SqliteMetricsSink {
    async fn increment_interactions(&self, group_id: &GroupId) -> Result<(), ChatError> {
        let repo = Arc::clone(&self.repo);
        let group_id = group_id.clone();
        tokio::task::spawn_blocking(move || repo.increment_interactions(&group_id))
            .await
            .map_err(|e| ChatError::Metrics(format!("metrics task failed: {}", e)))?
            .map_err(|e| ChatError::Metrics(e.to_string()))
    }
}
