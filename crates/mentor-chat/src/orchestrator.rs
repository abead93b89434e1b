//! Mentor reply generation.
//!
//! Replies resolve through an ordered list of strategies. Each one either
//! produces a reply or hands over to the next tier; the chain always ends in
//! [`FallbackStrategy`], which cannot fail. `generate_reply` therefore always
//! returns a non-empty string.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mentor_core::types::{ChatMessage, GroupContext, GroupId};

use crate::fallback::FallbackPool;
use crate::inference::{InferenceClient, InferenceRequest};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::prompt::build_system_prompt;
use crate::random::{self, RandomSource};

/// Everything a strategy needs to answer one student message.
#[derive(Debug, Clone, Copy)]
pub struct ReplyContext<'a> {
    pub group_id: &'a GroupId,
    pub user_text: &'a str,
    /// Prior conversation, oldest first, not including `user_text`.
    pub history: &'a [ChatMessage],
    pub group: &'a GroupContext,
}

/// Outcome of one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Reply(String),
    /// Defer to the next tier, with the reason for logging.
    Next(String),
}

/// One tier of the reply chain.
#[async_trait]
pub trait ReplyStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, ctx: &ReplyContext<'_>) -> Resolution;
}

/// Asks the remote inference service for a Socratic reply.
pub struct RemoteInferenceStrategy {
    client: Arc<dyn InferenceClient>,
}

impl RemoteInferenceStrategy {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    fn build_request(ctx: &ReplyContext<'_>) -> InferenceRequest {
        InferenceRequest {
            message: ctx.user_text.to_string(),
            history: ctx.history.iter().map(ChatMessage::to_history_turn).collect(),
            context: build_system_prompt(ctx.group),
        }
    }
}

#[async_trait]
impl ReplyStrategy for RemoteInferenceStrategy {
    fn name(&self) -> &'static str {
        "remote_inference"
    }

    async fn resolve(&self, ctx: &ReplyContext<'_>) -> Resolution {
        let request = Self::build_request(ctx);
        let client = Arc::clone(&self.client);

        // A panic inside the client surfaces as a JoinError.
        let joined = tokio::spawn(async move { client.complete(&request).await }).await;

        match joined {
            Ok(Ok(response)) => match response.reply {
                Some(reply) if !reply.trim().is_empty() => Resolution::Reply(reply.trim().to_string()),
                _ => Resolution::Next("inference returned an empty reply".to_string()),
            },
            Ok(Err(e)) => Resolution::Next(e.to_string()),
            Err(e) => Resolution::Next(format!("inference task failed: {}", e)),
        }
    }
}

/// Terminal tier: a random canned reply marked as offline.
pub struct FallbackStrategy {
    pool: FallbackPool,
    rng: Mutex<RandomSource>,
}

impl FallbackStrategy {
    pub fn new(pool: FallbackPool, rng: RandomSource) -> Self {
        Self {
            pool,
            rng: Mutex::new(rng),
        }
    }

    /// Always succeeds.
    pub fn reply(&self) -> String {
        self.pool.offline_reply(&self.rng)
    }
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        Self::new(FallbackPool::default(), random::os_seeded())
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Remote,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorReply {
    pub text: String,
    pub source: ReplySource,
}

/// Produces mentor replies through the strategy chain.
pub struct ResponseOrchestrator {
    strategies: Vec<Box<dyn ReplyStrategy>>,
    fallback: FallbackStrategy,
    metrics: Arc<dyn MetricsSink>,
}

impl ResponseOrchestrator {
    pub fn new(
        strategies: Vec<Box<dyn ReplyStrategy>>,
        fallback: FallbackStrategy,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            strategies,
            fallback,
            metrics,
        }
    }

    /// Remote inference first, fallback pool second.
    pub fn with_inference(
        client: Arc<dyn InferenceClient>,
        fallback: FallbackStrategy,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let remote: Box<dyn ReplyStrategy> = Box::new(RemoteInferenceStrategy::new(client));
        Self::new(vec![remote], fallback, metrics)
    }

    /// Fallback only; used when inference is disabled.
    pub fn offline(fallback: FallbackStrategy) -> Self {
        Self::new(Vec::new(), fallback, Arc::new(NoopMetrics))
    }

    /// Resolve a reply and report which tier produced it.
    pub async fn resolve(&self, ctx: &ReplyContext<'_>) -> MentorReply {
        for strategy in &self.strategies {
            match strategy.resolve(ctx).await {
                Resolution::Reply(text) => {
                    tracing::debug!(
                        group_id = %ctx.group_id,
                        strategy = strategy.name(),
                        "Reply generated"
                    );
                    if let Err(e) = self.metrics.increment_interactions(ctx.group_id).await {
                        tracing::warn!(group_id = %ctx.group_id, error = %e, "Failed to update interaction metric");
                    }
                    return MentorReply {
                        text,
                        source: ReplySource::Remote,
                    };
                }
                Resolution::Next(reason) => {
                    tracing::warn!(
                        group_id = %ctx.group_id,
                        strategy = strategy.name(),
                        reason = %reason,
                        "Reply strategy failed, trying next tier"
                    );
                }
            }
        }

        tracing::info!(group_id = %ctx.group_id, "Using offline fallback reply");
        MentorReply {
            text: self.fallback.reply(),
            source: ReplySource::Fallback,
        }
    }

    /// Generate the mentor's reply text. Never fails and never returns an
    /// empty string.
    pub async fn generate_reply(
        &self,
        group_id: &GroupId,
        user_text: &str,
        history: &[ChatMessage],
        group: &GroupContext,
    ) -> String {
        let ctx = ReplyContext {
            group_id,
            user_text,
            history,
            group,
        };
        self.resolve(&ctx).await.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::fallback::OFFLINE_MARKER;
    use crate::inference::InferenceResponse;
    use mentor_core::types::{Category, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Reply(&'static str),
        PayloadError,
        Panic,
    }

    struct FakeClient {
        behavior: Behavior,
        last_request: Mutex<Option<InferenceRequest>>,
    }

    impl FakeClient {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                last_request: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl InferenceClient for FakeClient {
        async fn complete(
            &self,
            request: &InferenceRequest,
        ) -> Result<InferenceResponse, ChatError> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            match self.behavior {
                Behavior::Reply(text) => Ok(InferenceResponse {
                    reply: Some(text.to_string()),
                    error: None,
                }),
                Behavior::PayloadError => Err(ChatError::Inference("quota exceeded".to_string())),
                Behavior::Panic => panic!("client bug"),
            }
        }
    }

    #[derive(Default)]
    struct CountingMetrics {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl MetricsSink for CountingMetrics {
        async fn increment_interactions(&self, _group_id: &GroupId) -> Result<(), ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ChatError::Metrics("table locked".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn fallback() -> FallbackStrategy {
        FallbackStrategy::new(FallbackPool::default(), random::seeded(3))
    }

    async fn run(orchestrator: &ResponseOrchestrator) -> MentorReply {
        let group_id = GroupId::new("g-1");
        let group = GroupContext {
            name: "Robótica".to_string(),
            milestones: vec!["Diseño".to_string()],
        };
        let history = vec![ChatMessage::local(
            group_id.clone(),
            Role::Mentor,
            Category::Creative,
            "¡Hola, equipo!".to_string(),
        )];
        let ctx = ReplyContext {
            group_id: &group_id,
            user_text: "¿Cómo dividimos el trabajo?",
            history: &history,
            group: &group,
        };
        orchestrator.resolve(&ctx).await
    }

    #[tokio::test]
    async fn test_remote_reply_increments_metric() {
        let client = FakeClient::new(Behavior::Reply("¿Qué tareas veis?"));
        let metrics = Arc::new(CountingMetrics::default());
        let orchestrator =
            ResponseOrchestrator::with_inference(client.clone(), fallback(), metrics.clone());

        let reply = run(&orchestrator).await;
        assert_eq!(reply.text, "¿Qué tareas veis?");
        assert_eq!(reply.source, ReplySource::Remote);
        assert_eq!(metrics.calls.load(Ordering::SeqCst), 1);

        let request = client.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.message, "¿Cómo dividimos el trabajo?");
        assert_eq!(request.history.len(), 1);
        assert_eq!(request.history[0].role, "assistant");
        assert!(request.context.contains("Robótica"));
    }

    #[tokio::test]
    async fn test_payload_error_falls_back() {
        let metrics = Arc::new(CountingMetrics::default());
        let orchestrator = ResponseOrchestrator::with_inference(
            FakeClient::new(Behavior::PayloadError),
            fallback(),
            metrics.clone(),
        );

        let reply = run(&orchestrator).await;
        assert_eq!(reply.source, ReplySource::Fallback);
        assert!(reply.text.ends_with(OFFLINE_MARKER));
        assert_eq!(metrics.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_client_panic_falls_back() {
        let orchestrator = ResponseOrchestrator::with_inference(
            FakeClient::new(Behavior::Panic),
            fallback(),
            Arc::new(NoopMetrics),
        );
        let reply = run(&orchestrator).await;
        assert_eq!(reply.source, ReplySource::Fallback);
        assert!(reply.text.ends_with(OFFLINE_MARKER));
    }

    #[tokio::test]
    async fn test_blank_reply_falls_back() {
        let orchestrator = ResponseOrchestrator::with_inference(
            FakeClient::new(Behavior::Reply("   ")),
            fallback(),
            Arc::new(NoopMetrics),
        );
        let reply = run(&orchestrator).await;
        assert_eq!(reply.source, ReplySource::Fallback);
    }

    #[tokio::test]
    async fn test_metric_failure_does_not_affect_reply() {
        let metrics = Arc::new(CountingMetrics {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let orchestrator = ResponseOrchestrator::with_inference(
            FakeClient::new(Behavior::Reply("¿Y si probáis otra vez?")),
            fallback(),
            metrics.clone(),
        );
        let reply = run(&orchestrator).await;
        assert_eq!(reply.text, "¿Y si probáis otra vez?");
        assert_eq!(metrics.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_offline_orchestrator() {
        let orchestrator = ResponseOrchestrator::offline(fallback());
        let text = orchestrator
            .generate_reply(&GroupId::new("g"), "hola", &[], &GroupContext::default())
            .await;
        assert!(text.ends_with(OFFLINE_MARKER));
        assert!(!text.trim().is_empty());
    }

    struct Declines;

    #[async_trait]
    impl ReplyStrategy for Declines {
        fn name(&self) -> &'static str {
            "declines"
        }

        async fn resolve(&self, _ctx: &ReplyContext<'_>) -> Resolution {
            Resolution::Next("not today".to_string())
        }
    }

    #[tokio::test]
    async fn test_chain_tries_tiers_in_order() {
        let orchestrator = ResponseOrchestrator::new(
            vec![
                Box::new(Declines) as Box<dyn ReplyStrategy>,
                Box::new(RemoteInferenceStrategy::new(FakeClient::new(Behavior::Reply(
                    "segunda capa",
                )))),
            ],
            fallback(),
            Arc::new(NoopMetrics),
        );
        let reply = run(&orchestrator).await;
        assert_eq!(reply.text, "segunda capa");
        assert_eq!(reply.source, ReplySource::Remote);
    }
}
