//! Live-typing reveal of finished mentor replies.
//!
//! `Idle -> Typing(message) -> Idle`. At most one message is typing per
//! presenter; presenting a new one cancels the running reveal and any speech
//! in progress. Every step is tagged with a generation number so a cancelled
//! reveal can never touch the view again.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::Rng;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use mentor_core::config::{PresenterConfig, SpeechConfig, SpeechTiming};
use mentor_core::types::ChatMessage;

use crate::random::{self, RandomSource};
use crate::speech::{sanitize_for_speech, SpeechSynthesizer};

/// UI surface the presenter draws into.
///
/// Callbacks run while the presenter holds its state lock, so they must not
/// call back into the presenter.
pub trait PresenterView: Send + Sync {
    /// Show the first characters of a message that is still typing.
    fn render_prefix(&self, message_id: Uuid, prefix: &str);
    fn scroll_to_latest(&self);
    /// Replace the typing placeholder with the full message.
    fn finalize(&self, message: &ChatMessage);
}

/// Timing and speech settings for a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub speech_timing: SpeechTiming,
    pub locale: String,
}

impl RevealPolicy {
    pub fn from_config(presenter: &PresenterConfig, speech: &SpeechConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(presenter.min_delay_ms),
            max_delay: Duration::from_millis(presenter.max_delay_ms),
            speech_timing: presenter.speech_timing,
            locale: speech.locale.clone(),
        }
    }

    /// No delay between characters.
    pub fn immediate() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            speech_timing: SpeechTiming::default(),
            locale: SpeechConfig::default().locale,
        }
    }

    /// Delay before the next character, uniform in `[min_delay, max_delay]`.
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(rng.random_range(min..=max))
    }
}

impl Default for RevealPolicy {
    fn default() -> Self {
        Self::from_config(&PresenterConfig::default(), &SpeechConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingState {
    Idle,
    Typing {
        message_id: Uuid,
        /// Characters shown so far.
        revealed: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Completed,
    Cancelled,
}

/// Completion handle for one reveal.
#[derive(Debug)]
pub struct RevealHandle {
    message_id: Uuid,
    done: oneshot::Receiver<RevealOutcome>,
}

impl RevealHandle {
    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    /// Wait until the reveal completes or is cancelled.
    pub async fn finished(self) -> RevealOutcome {
        self.done.await.unwrap_or(RevealOutcome::Cancelled)
    }
}

struct Shared {
    state: TypingState,
    generation: u64,
    closed: bool,
}

pub struct StreamingPresenter {
    view: Arc<dyn PresenterView>,
    speech: Arc<dyn SpeechSynthesizer>,
    policy: Arc<RevealPolicy>,
    rng: Arc<Mutex<RandomSource>>,
    shared: Arc<Mutex<Shared>>,
    /// Held while an utterance is checked and queued.
    speech_gate: Arc<tokio::sync::Mutex<()>>,
    /// Always locked before `shared`.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamingPresenter {
    pub fn new(
        view: Arc<dyn PresenterView>,
        speech: Arc<dyn SpeechSynthesizer>,
        policy: RevealPolicy,
    ) -> Self {
        Self::with_rng(view, speech, policy, random::os_seeded())
    }

    pub fn with_rng(
        view: Arc<dyn PresenterView>,
        speech: Arc<dyn SpeechSynthesizer>,
        policy: RevealPolicy,
        rng: RandomSource,
    ) -> Self {
        Self {
            view,
            speech,
            policy: Arc::new(policy),
            rng: Arc::new(Mutex::new(rng)),
            shared: Arc::new(Mutex::new(Shared {
                state: TypingState::Idle,
                generation: 0,
                closed: false,
            })),
            speech_gate: Arc::new(tokio::sync::Mutex::new(())),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TypingState {
        lock(&self.shared).state.clone()
    }

    pub fn policy(&self) -> &RevealPolicy {
        &self.policy
    }

    /// Start revealing `message`, cancelling whatever was typing before.
    ///
    /// The presenter is in `Typing` when this returns. Must be called from
    /// within a tokio runtime.
    pub fn present(&self, message: ChatMessage) -> RevealHandle {
        let message_id = message.id;
        let (tx, rx) = oneshot::channel();

        // The task slot stays locked until the new reveal is stored, so
        // concurrent callers cannot abort each other's reveal.
        let mut task = lock(&self.task);
        let generation = {
            let mut shared = lock(&self.shared);
            if shared.closed {
                let _ = tx.send(RevealOutcome::Cancelled);
                return RevealHandle {
                    message_id,
                    done: rx,
                };
            }
            shared.generation += 1;
            shared.state = TypingState::Typing {
                message_id,
                revealed: 0,
            };
            shared.generation
        };

        if let Some(previous) = task.take() {
            previous.abort();
        }
        self.speech.cancel_all();
        tracing::debug!(%message_id, "Reveal started");

        let reveal = Reveal {
            view: Arc::clone(&self.view),
            speech: Arc::clone(&self.speech),
            speech_gate: Arc::clone(&self.speech_gate),
            policy: Arc::clone(&self.policy),
            rng: Arc::clone(&self.rng),
            shared: Arc::clone(&self.shared),
            generation,
        };
        *task = Some(tokio::spawn(async move {
            let outcome = reveal.run(message).await;
            let _ = tx.send(outcome);
        }));

        RevealHandle {
            message_id,
            done: rx,
        }
    }

    /// Stop the current reveal and speech, returning to `Idle`.
    pub fn cancel(&self) {
        let mut task = lock(&self.task);
        {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.state = TypingState::Idle;
        }
        if let Some(previous) = task.take() {
            previous.abort();
        }
        self.speech.cancel_all();
    }

    /// Cancel and refuse further reveals. Called on view teardown.
    pub fn shutdown(&self) {
        lock(&self.shared).closed = true;
        self.cancel();
        tracing::debug!("Presenter shut down");
    }
}

impl Drop for StreamingPresenter {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// State owned by one running reveal task.
struct Reveal {
    view: Arc<dyn PresenterView>,
    speech: Arc<dyn SpeechSynthesizer>,
    speech_gate: Arc<tokio::sync::Mutex<()>>,
    policy: Arc<RevealPolicy>,
    rng: Arc<Mutex<RandomSource>>,
    shared: Arc<Mutex<Shared>>,
    generation: u64,
}

impl Reveal {
    async fn run(self, message: ChatMessage) -> RevealOutcome {
        if self.policy.speech_timing == SpeechTiming::OnStart {
            self.speak(&message.content).await;
        }

        let content = message.content.as_str();
        for (count, (start, ch)) in content.char_indices().enumerate() {
            let delay = {
                let mut rng = lock(&self.rng);
                self.policy.next_delay(&mut **rng)
            };
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }

            let prefix = &content[..start + ch.len_utf8()];
            let mut shared = lock(&self.shared);
            if shared.generation != self.generation {
                return RevealOutcome::Cancelled;
            }
            self.view.render_prefix(message.id, prefix);
            self.view.scroll_to_latest();
            shared.state = TypingState::Typing {
                message_id: message.id,
                revealed: count + 1,
            };
        }

        {
            let mut shared = lock(&self.shared);
            if shared.generation != self.generation {
                return RevealOutcome::Cancelled;
            }
            shared.state = TypingState::Idle;
            self.view.finalize(&message);
            self.view.scroll_to_latest();
        }
        tracing::debug!(message_id = %message.id, "Reveal completed");

        if self.policy.speech_timing == SpeechTiming::OnComplete {
            self.speak(&message.content).await;
        }
        RevealOutcome::Completed
    }

    async fn speak(&self, text: &str) {
        let clean = sanitize_for_speech(text);
        if clean.is_empty() {
            return;
        }

        let _gate = self.speech_gate.lock().await;
        if !self.is_current() {
            return;
        }
        if let Err(e) = self.speech.speak(&clean, &self.policy.locale).await {
            tracing::warn!(error = %e, "Speech output failed");
        }
        // A newer reveal may have cancelled speech while this utterance was
        // being queued.
        if !self.is_current() {
            self.speech.cancel_all();
        }
    }

    fn is_current(&self) -> bool {
        lock(&self.shared).generation == self.generation
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
