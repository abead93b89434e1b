use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MentorError, Result};

/// Top-level configuration for the mentor application.
///
/// Loaded from `~/.socratic-mentor/config.toml` by default. Each section
/// corresponds to one part of the chat pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MentorConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub presenter: PresenterConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl MentorConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MentorConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist, cannot be parsed, or fails validation.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.chat.max_message_length == 0 {
            return Err(MentorError::Config(
                "chat.max_message_length must be greater than zero".to_string(),
            ));
        }
        if self.presenter.min_delay_ms > self.presenter.max_delay_ms {
            return Err(MentorError::Config(format!(
                "presenter.min_delay_ms ({}) exceeds presenter.max_delay_ms ({})",
                self.presenter.min_delay_ms, self.presenter.max_delay_ms
            )));
        }
        if self.speech.locale.trim().is_empty() {
            return Err(MentorError::Config("speech.locale must not be empty".to_string()));
        }
        if self.voice.locale.trim().is_empty() {
            return Err(MentorError::Config("voice.locale must not be empty".to_string()));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite conversation store.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.socratic-mentor/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Chat input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Whether sending is enabled at all.
    pub enabled: bool,
    /// Maximum student message length in characters.
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_message_length: 2000,
        }
    }
}

/// Remote inference service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// When false, every reply comes from the offline fallback pool.
    pub enabled: bool,
    /// HTTP endpoint accepting `{message, history, context}` JSON.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://127.0.0.1:8787/api/mentor".to_string(),
            timeout_secs: 20,
        }
    }
}

/// When speech output starts relative to the typing reveal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechTiming {
    /// Speak as soon as the reveal begins.
    #[default]
    OnStart,
    /// Speak once the full reply is revealed.
    OnComplete,
}

/// Live-typing reveal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    /// Lower bound of the per-character delay in milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound of the per-character delay in milliseconds.
    pub max_delay_ms: u64,
    pub speech_timing: SpeechTiming,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 20,
            max_delay_ms: 60,
            speech_timing: SpeechTiming::OnStart,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// BCP 47 locale tag passed to the synthesizer.
    pub locale: String,
    /// External text-to-speech program, e.g. `espeak-ng`.
    pub command: Option<String>,
    /// Argument templates; `{locale}` and `{text}` are substituted.
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            locale: "es-ES".to_string(),
            command: None,
            args: vec!["-v".to_string(), "{locale}".to_string(), "{text}".to_string()],
        }
    }
}

/// Voice dictation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub enabled: bool,
    /// Recognition locale.
    pub locale: String,
    /// Surface non-final transcripts for live feedback.
    pub interim_results: bool,
    /// Keep capturing after the first utterance.
    pub continuous: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locale: "es-ES".to_string(),
            interim_results: true,
            continuous: false,
        }
    }
}
