//! audioread configuration management.

use anyhow::{Context, Result};
use audioread_core::ReaderSettings;
use audioread_core::library::default_data_dir;
use audioread_core::speech::{MAX_RATE, MIN_RATE, SpeechOptions};
use audioread_core::text::{DEFAULT_MAX_CHUNK_SIZE, DEFAULT_WORDS_PER_PAGE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_RATE: f32 = 1.0;
const DEFAULT_WORDS_PER_MINUTE: u32 = 180;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioReadConfig {
    /// Maximum characters per speech chunk
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Target words per page when the document has no page breaks
    #[serde(default = "default_words_per_page")]
    pub words_per_page: usize,

    /// Playback rate (0.5-2.0)
    #[serde(default = "default_rate")]
    pub rate: f32,

    /// Preferred voice. None uses the engine default.
    #[serde(default)]
    pub voice: Option<String>,

    /// Console narrator pace at rate 1.0
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,

    /// Reopen documents where reading stopped
    #[serde(default = "default_resume_last_position")]
    pub resume_last_position: bool,

    /// Where the library is stored. None means the platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

fn default_words_per_page() -> usize {
    DEFAULT_WORDS_PER_PAGE
}

fn default_rate() -> f32 {
    DEFAULT_RATE
}

fn default_words_per_minute() -> u32 {
    DEFAULT_WORDS_PER_MINUTE
}

fn default_resume_last_position() -> bool {
    true
}

impl Default for AudioReadConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            words_per_page: default_words_per_page(),
            rate: default_rate(),
            voice: None,
            words_per_minute: default_words_per_minute(),
            resume_last_position: default_resume_last_position(),
            data_dir: None,
        }
    }
}

impl AudioReadConfig {
    /// Get the config file path: ~/.config/cli-programs/audioread.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("audioread.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: AudioReadConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding the library's JSON files.
    pub fn store_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_data_dir()?.join("store")),
        }
    }

    pub fn speech_options(&self) -> SpeechOptions {
        let options = SpeechOptions::new().with_rate(self.rate);
        match &self.voice {
            Some(voice) => options.with_voice(voice.clone()),
            None => options,
        }
    }

    pub fn reader_settings(&self) -> ReaderSettings {
        ReaderSettings {
            max_chunk_size: self.max_chunk_size.max(1),
            words_per_page: self.words_per_page.max(1),
            options: self.speech_options(),
            resume_last_position: self.resume_last_position,
        }
    }
}

/// Clamp a rate to what speech engines accept.
pub fn clamp_rate(rate: f32) -> f32 {
    rate.clamp(MIN_RATE, MAX_RATE)
}
