//! Configuration for the voice interaction controller.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opening agent message seeded into a fresh conversation.
pub const DEFAULT_GREETING: &str = "Namaste — I'm Sakhi. I can check your field, scan leaves, \
     predict yield, and help lock a good price. What would you like to do?";

/// Top-level configuration for the assistant's voice controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Speech capture settings.
    pub capture: CaptureConfig,
    /// Speech playback settings.
    pub playback: PlaybackConfig,
    /// Agent message seeded into a fresh conversation. Empty disables it.
    pub greeting: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            playback: PlaybackConfig::default(),
            greeting: DEFAULT_GREETING.to_owned(),
        }
    }
}

/// Speech recognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// BCP-47 recognition language tag.
    pub language: String,
    /// Ask the platform to keep each recognizer instance open across
    /// pauses instead of ending at the first silence.
    pub continuous: bool,
    /// Ask the recognizer for provisional in-progress transcripts.
    pub interim_results: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            language: "en-IN".to_owned(),
            continuous: true,
            interim_results: true,
        }
    }
}

/// Voice output arming policy across conversation turns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackPolicy {
    /// Voice output stays armed until explicitly disabled.
    #[default]
    Sticky,
    /// Voice output disarms itself after one utterance completes or
    /// errors, and must be rearmed for the next turn.
    SingleShot,
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Arming policy for voice output.
    pub policy: PlaybackPolicy,
    /// Persona spoken by default, by catalog id.
    pub default_persona: String,
    /// Speaking rate multiplier.
    pub rate: f32,
    /// Whether voice output starts armed.
    pub start_enabled: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            policy: PlaybackPolicy::Sticky,
            default_persona: "en-female-soft".to_owned(),
            rate: 1.0,
            start_enabled: true,
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::VoiceError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VoiceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/sakhi/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Ok(config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("sakhi").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("sakhi")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/sakhi-config/config.toml")
        }
    }
}
