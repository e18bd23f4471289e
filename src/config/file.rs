//! Configuration file management for micpost.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory. Every field has a default,
//! so a missing file or a partial file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioConfig {
    /// Maximum size in bytes of each chunk delivered by the capture backend
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,
}

fn default_chunk_bytes() -> usize {
    64 * 1024
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: default_chunk_bytes(),
        }
    }
}

/// Upload endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadConfig {
    /// URL that receives the multipart POST
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Name of the multipart field carrying the recording
    #[serde(default = "default_field_name")]
    pub field_name: String,
    /// File name declared for the recording part
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// MIME type the recording is tagged with
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_endpoint() -> String {
    "http://localhost:8080/upload".to_string()
}

fn default_field_name() -> String {
    "audio".to_string()
}

fn default_file_name() -> String {
    "recording.wav".to_string()
}

fn default_mime_type() -> String {
    "audio/wav".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            field_name: default_field_name(),
            file_name: default_file_name(),
            mime_type: default_mime_type(),
        }
    }
}

/// Local playback configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Play each recording back as soon as it is finalized
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Player command to use instead of the platform default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            player: None,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MicpostConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl MicpostConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// Returns the defaults when no config file exists yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Loads configuration from an explicit path, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(path)?;
        let config: MicpostConfig = toml::from_str(&config_content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Writes configuration to an explicit path.
    ///
    /// # Errors
    /// - If the parent directory cannot be created
    /// - If the file cannot be written
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Retrieves the path to the config file, `~/.config/micpost/micpost.toml`.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join("micpost").join("micpost.toml"))
}
