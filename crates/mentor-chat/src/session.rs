//! Chat session controller.
//!
//! One session per open group conversation. A send runs the pipeline
//! classify -> optimistic append -> persist student -> generate reply ->
//! persist mentor -> present -> notify listeners. Persistence and inference
//! failures are recovered inside the pipeline, so an accepted send always
//! ends with a mentor message in the view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use mentor_core::config::ChatConfig;
use mentor_core::events::SessionEvent;
use mentor_core::types::{Category, ChatMessage, GroupContext, GroupId, Role};
use mentor_dictation::{InputBuffer, VoiceInputBridge};

use crate::classifier::classify;
use crate::error::ChatError;
use crate::orchestrator::ResponseOrchestrator;
use crate::presenter::{RevealHandle, StreamingPresenter};
use crate::store::MessageStore;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Collaborators a session is built from.
pub struct SessionDeps {
    pub store: Arc<dyn MessageStore>,
    pub orchestrator: Arc<ResponseOrchestrator>,
    pub presenter: Arc<StreamingPresenter>,
    pub voice: Arc<VoiceInputBridge>,
}

/// Result of an accepted send.
#[derive(Debug)]
pub struct SendOutcome {
    pub student: ChatMessage,
    pub mentor: ChatMessage,
    /// Completes when the mentor reply is fully revealed.
    pub reveal: RevealHandle,
}

pub struct ChatSession {
    group_id: GroupId,
    group: GroupContext,
    config: ChatConfig,
    store: Arc<dyn MessageStore>,
    orchestrator: Arc<ResponseOrchestrator>,
    presenter: Arc<StreamingPresenter>,
    voice: Arc<VoiceInputBridge>,
    messages: Mutex<Vec<ChatMessage>>,
    sending: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

/// Clears the in-flight flag when a send finishes or is dropped.
struct SendGuard<'a>(&'a AtomicBool);

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatSession {
    pub fn new(group_id: GroupId, group: GroupContext, config: ChatConfig, deps: SessionDeps) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            group_id,
            group,
            config,
            store: deps.store,
            orchestrator: deps.orchestrator,
            presenter: deps.presenter,
            voice: deps.voice,
            messages: Mutex::new(Vec::new()),
            sending: AtomicBool::new(false),
            events,
        }
    }

    /// Build a session and load its stored history.
    pub async fn open(
        group_id: GroupId,
        group: GroupContext,
        config: ChatConfig,
        deps: SessionDeps,
    ) -> Self {
        let session = Self::new(group_id, group, config, deps);
        session.load_history().await;
        session
    }

    /// Replace the view with the stored conversation.
    ///
    /// A failed fetch is logged and leaves the view empty.
    pub async fn load_history(&self) -> usize {
        let history = match self.store.fetch_history(&self.group_id).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(group_id = %self.group_id, error = %e, "Failed to load history");
                Vec::new()
            }
        };
        let count = history.len();
        *lock(&self.messages) = history;

        tracing::info!(group_id = %self.group_id, count, "History loaded");
        let _ = self.events.send(SessionEvent::HistoryLoaded {
            group_id: self.group_id.clone(),
            count,
        });
        count
    }

    /// Send one student message and produce the mentor's reply.
    ///
    /// Only input rejections are returned as errors.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ChatError> {
        let text = self.validate(text)?;
        let _guard = self.begin_send()?;
        self.run_turn(text).await
    }

    /// Send the committed input buffer. The buffer is cleared when the send
    /// is accepted and left untouched when it is rejected.
    pub async fn send_input(&self) -> Result<SendOutcome, ChatError> {
        let input = self.voice.buffer();
        let text = input.text();
        let trimmed = self.validate(&text)?;
        let _guard = self.begin_send()?;
        input.take();
        self.run_turn(trimmed).await
    }

    fn begin_send(&self) -> Result<SendGuard<'_>, ChatError> {
        if self
            .sending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(group_id = %self.group_id, "Send ignored while a reply is pending");
            return Err(ChatError::SendInProgress);
        }
        Ok(SendGuard(&self.sending))
    }

    async fn run_turn(&self, text: &str) -> Result<SendOutcome, ChatError> {
        let category = classify(text);
        let local = ChatMessage::local(self.group_id.clone(), Role::Student, category, text.to_string());
        let prior = {
            let mut messages = lock(&self.messages);
            let prior = messages.clone();
            messages.push(local.clone());
            prior
        };
        tracing::debug!(group_id = %self.group_id, %category, "Student message added");

        let student = match self.store.append(&self.group_id, Role::Student, text).await {
            Ok(stored) => {
                let stored = ChatMessage { category, ..stored };
                self.replace_message(local.id, stored.clone());
                stored
            }
            Err(e) => {
                tracing::warn!(group_id = %self.group_id, error = %e, "Failed to persist student message");
                local
            }
        };

        let reply = self
            .orchestrator
            .generate_reply(&self.group_id, text, &prior, &self.group)
            .await;

        let mentor = match self.store.append(&self.group_id, Role::Mentor, &reply).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(group_id = %self.group_id, error = %e, "Failed to persist mentor reply");
                ChatMessage::local(self.group_id.clone(), Role::Mentor, Category::default(), reply)
            }
        };
        lock(&self.messages).push(mentor.clone());

        let reveal = self.presenter.present(mentor.clone());

        let _ = self.events.send(SessionEvent::TurnCompleted {
            group_id: self.group_id.clone(),
            student: student.clone(),
            mentor: mentor.clone(),
        });

        Ok(SendOutcome {
            student,
            mentor,
            reveal,
        })
    }

    fn validate<'t>(&self, text: &'t str) -> Result<&'t str, ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }
        Ok(text)
    }

    fn replace_message(&self, id: uuid::Uuid, message: ChatMessage) {
        let mut messages = lock(&self.messages);
        if let Some(slot) = messages.iter_mut().find(|m| m.id == id) {
            *slot = message;
        }
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn group(&self) -> &GroupContext {
        &self.group
    }

    /// Snapshot of the conversation view, oldest first.
    pub fn messages(&self) -> Vec<ChatMessage> {
        lock(&self.messages).clone()
    }

    /// True while a reply is being generated.
    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    /// Whether the send control should be enabled.
    pub fn can_send(&self) -> bool {
        self.config.enabled && !self.is_sending()
    }

    /// Whether the UI should show the dictation control at all.
    pub fn voice_control_visible(&self) -> bool {
        self.voice.is_available()
    }

    pub fn voice(&self) -> &VoiceInputBridge {
        &self.voice
    }

    /// The committed text input shared by typing and dictation.
    pub fn input(&self) -> &InputBuffer {
        self.voice.buffer()
    }

    pub fn presenter(&self) -> &StreamingPresenter {
        &self.presenter
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Tear down per-session resources: reveal timer, speech, recognizer.
    pub fn close(&self) {
        self.presenter.shutdown();
        self.voice.release();
        tracing::info!(group_id = %self.group_id, "Chat session closed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FallbackPool;
    use crate::orchestrator::FallbackStrategy;
    use crate::presenter::{PresenterView, RevealPolicy};
    use crate::random;
    use crate::speech::NullSpeech;
    use crate::store::SqliteMessageStore;
    use mentor_core::config::VoiceConfig;
    use mentor_dictation::NoopCapabilityProvider;
    use mentor_storage::{Database, MessageRepository};
    use uuid::Uuid;

    struct SilentView;

    impl PresenterView for SilentView {
        fn render_prefix(&self, _message_id: Uuid, _prefix: &str) {}
        fn scroll_to_latest(&self) {}
        fn finalize(&self, _message: &ChatMessage) {}
    }

    fn session_with(config: ChatConfig) -> ChatSession {
        let db = Arc::new(Database::in_memory().unwrap());
        let deps = SessionDeps {
            store: Arc::new(SqliteMessageStore::new(Arc::new(MessageRepository::new(db)))),
            orchestrator: Arc::new(ResponseOrchestrator::offline(FallbackStrategy::new(
                FallbackPool::default(),
                random::seeded(1),
            ))),
            presenter: Arc::new(StreamingPresenter::new(
                Arc::new(SilentView),
                Arc::new(NullSpeech),
                RevealPolicy::immediate(),
            )),
            voice: Arc::new(VoiceInputBridge::new(
                &NoopCapabilityProvider,
                &VoiceConfig::default(),
                InputBuffer::new(),
            )),
        };
        ChatSession::new(GroupId::new("g-1"), GroupContext::default(), config, deps)
    }

    #[tokio::test]
    async fn test_rejects_empty_message() {
        let session = session_with(ChatConfig::default());
        let err = session.send("   ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_too_long_message() {
        let session = session_with(ChatConfig {
            enabled: true,
            max_message_length: 5,
        });
        let err = session.send("¿Qué hacemos?").await.unwrap_err();
        assert!(matches!(err, ChatError::MessageTooLong(5)));
        // Length counts characters, not bytes.
        assert!(session.send("¿Qué?").await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_chat() {
        let session = session_with(ChatConfig {
            enabled: false,
            max_message_length: 2000,
        });
        assert!(!session.can_send());
        assert!(matches!(session.send("hola").await, Err(ChatError::Disabled)));
    }

    #[tokio::test]
    async fn test_send_trims_and_keeps_category() {
        let session = session_with(ChatConfig::default());
        let outcome = session.send("  ¿Qué herramienta usamos?  ").await.unwrap();
        assert_eq!(outcome.student.content, "¿Qué herramienta usamos?");
        assert_eq!(outcome.student.category, Category::Technical);
        assert_eq!(outcome.mentor.role, Role::Mentor);

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, outcome.student.id);
        assert_eq!(messages[0].category, Category::Technical);
        assert_eq!(messages[1].id, outcome.mentor.id);
        assert!(!session.is_sending());
    }

    #[tokio::test]
    async fn test_send_input_clears_buffer() {
        let session = session_with(ChatConfig::default());
        session.input().set("¿Cómo dividimos el trabajo?");
        let outcome = session.send_input().await.unwrap();
        assert_eq!(outcome.student.category, Category::Organizational);
        assert!(session.input().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_input_is_kept() {
        let session = session_with(ChatConfig {
            enabled: true,
            max_message_length: 3,
        });
        session.input().set("demasiado largo");
        assert!(session.send_input().await.is_err());
        assert_eq!(session.input().text(), "demasiado largo");
    }

    #[tokio::test]
    async fn test_input_kept_while_reply_pending() {
        let session = session_with(ChatConfig::default());
        session.input().set("¿Y ahora qué?");

        let guard = session.begin_send().unwrap();
        let err = session.send_input().await.unwrap_err();
        assert!(matches!(err, ChatError::SendInProgress));
        assert_eq!(session.input().text(), "¿Y ahora qué?");
        assert!(session.messages().is_empty());

        drop(guard);
        session.send_input().await.unwrap();
        assert!(session.input().is_empty());
    }

    #[tokio::test]
    async fn test_events_broadcast() {
        let session = session_with(ChatConfig::default());
        let mut rx = session.subscribe();

        session.load_history().await;
        let outcome = session.send("hola").await.unwrap();

        match rx.recv().await.unwrap() {
            SessionEvent::HistoryLoaded { count, .. } => assert_eq!(count, 0),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            SessionEvent::TurnCompleted { student, mentor, .. } => {
                assert_eq!(student.id, outcome.student.id);
                assert_eq!(mentor.id, outcome.mentor.id);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_releases_resources() {
        let session = session_with(ChatConfig::default());
        assert!(!session.voice_control_visible());
        session.close();
        let outcome = session.send("hola").await.unwrap();
        // The turn still completes; only the reveal is refused.
        assert_eq!(
            outcome.reveal.finished().await,
            crate::presenter::RevealOutcome::Cancelled
        );
    }
}
