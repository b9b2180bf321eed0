use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SottoError};
use crate::types::{HotkeyMode, TranscriptionTask};

/// Top-level configuration for the Sotto application.
///
/// Loaded from `~/.sotto/config.toml` by default. Only user-editable
/// preferences live here; the engine's internal timing policy is fixed and
/// not part of the configuration surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SottoConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub dictation: DictationConfig,
}

impl SottoConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SottoConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
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
        let content =
            toml::to_string_pretty(self).map_err(|e| SottoError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Audio source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Seconds of continuous silence after which a toggle-mode recording
    /// stops automatically.
    pub silence_auto_stop_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            silence_auto_stop_secs: 2.0,
        }
    }
}

/// Dictation preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictationConfig {
    /// Hotkey activation behavior.
    pub hotkey_mode: HotkeyMode,
    /// Language hint passed to the transcription engine. `None` auto-detects.
    pub language: Option<String>,
    /// Transcribe or translate.
    pub task: TranscriptionTask,
    /// Boost microphone gain for quiet speech.
    pub whisper_mode: bool,
}

impl Default for DictationConfig {
    fn default() -> Self {
        Self {
            hotkey_mode: HotkeyMode::Toggle,
            language: None,
            task: TranscriptionTask::Transcribe,
            whisper_mode: false,
        }
    }
}
