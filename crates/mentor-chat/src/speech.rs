//! Speech output for mentor replies.

use std::process::Stdio;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::process::{Child, Command};

use mentor_core::config::SpeechConfig;

use crate::error::ChatError;

/// A text-to-speech backend. One instance is owned per session.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Start speaking `text`. Returns once the utterance has been queued.
    ///
    /// The presenter passes text through [`sanitize_for_speech`] first and
    /// never submits an empty utterance.
    async fn speak(&self, text: &str, locale: &str) -> Result<(), ChatError>;

    /// Stop the current utterance and drop anything pending.
    fn cancel_all(&self);
}

/// Speech disabled or unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSpeech;

#[async_trait]
impl SpeechSynthesizer for NullSpeech {
    async fn speak(&self, _text: &str, _locale: &str) -> Result<(), ChatError> {
        Ok(())
    }

    fn cancel_all(&self) {}
}

/// Speaks through an external program such as `espeak-ng` or `say`.
///
/// Argument templates may contain `{locale}` and `{text}`.
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
    current: Mutex<Option<Child>>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current: Mutex::new(None),
        }
    }

    /// `None` when speech is disabled or no program is configured.
    pub fn from_config(config: &SpeechConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let program = config.command.as_deref()?.trim();
        if program.is_empty() {
            return None;
        }
        Some(Self::new(program, config.args.clone()))
    }

    #[cfg(test)]
    fn is_speaking(&self) -> bool {
        match lock(&self.current).as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn render_args(&self, text: &str, locale: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{locale}", locale).replace("{text}", text))
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSpeech {
    async fn speak(&self, text: &str, locale: &str) -> Result<(), ChatError> {
        let clean = sanitize_for_speech(text);
        if clean.is_empty() {
            return Ok(());
        }

        let child = Command::new(&self.program)
            .args(self.render_args(&clean, locale))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ChatError::Speech(format!("Failed to start {}: {}", self.program, e)))?;

        // Replacing the previous child drops it, which kills it.
        *lock(&self.current) = Some(child);
        tracing::debug!(program = %self.program, locale, "Speech started");
        Ok(())
    }

    fn cancel_all(&self) {
        if let Some(mut child) = lock(&self.current).take() {
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "Speech process already finished");
            }
        }
    }
}

impl Drop for CommandSpeech {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn is_markdown_emphasis(c: char) -> bool {
    matches!(c, '*' | '_' | '~' | '`' | '#')
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F300..=0x1F5FF   // symbols and pictographs
            | 0x1F600..=0x1F64F // emoticons
            | 0x1F680..=0x1F6FF // transport and map
            | 0x1F900..=0x1F9FF // supplemental symbols and pictographs
            | 0x1FA70..=0x1FAFF // symbols and pictographs extended-A
            | 0x2600..=0x26FF   // misc symbols
            | 0x2700..=0x27BF   // dingbats
            | 0x1F1E6..=0x1F1FF // regional indicators
            | 0xFE00..=0xFE0F   // variation selectors
            | 0x200D            // zero-width joiner
    )
}

/// Strip markdown emphasis and emoji, then collapse whitespace.
pub fn sanitize_for_speech(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !is_markdown_emphasis(*c) && !is_emoji(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
