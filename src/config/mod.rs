use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub recorder: RecorderConfig,
    pub messages: MessagesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL the upload and playback endpoints are resolved against.
    pub base_url: String,
    /// Port the development server binds on 127.0.0.1.
    pub bind_port: u16,
    pub max_upload_bytes: usize,
    /// Transcode uploads to Ogg/Opus with ffmpeg when it is installed.
    pub transcode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3838".to_string(),
            bind_port: 3838,
            max_upload_bytes: 10 * 1024 * 1024,
            transcode: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Keep the input stream open between attempts.
    pub leave_stream_open: bool,
    /// Payload encoding produced when capture stops. Only "wav" is built in.
    pub encoder: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 1,
            leave_stream_open: true,
            encoder: "wav".to_string(),
        }
    }
}

/// User-facing banner strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub permission_request: String,
    pub stream_error_prefix: String,
    pub unsupported: String,
    pub connectivity_failure: String,
    pub connectivity_retry_hint: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            permission_request: "We need access to your microphone. Please allow recording."
                .to_string(),
            stream_error_prefix: "Error while initializing recording: ".to_string(),
            unsupported: "Audio recording is not supported here. Try another device or browser."
                .to_string(),
            connectivity_failure: "Cannot connect to the server :(".to_string(),
            connectivity_retry_hint: "Cannot connect to the server :(\nPlease try again..."
                .to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config = Self::from_toml(&content)?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
