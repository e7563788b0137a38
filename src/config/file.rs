//! TOML configuration file loading
//!
//! Supports `~/.config/talkback/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct TalkbackConfigFile {
    /// Inference server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Audio capture/playback configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Button trigger configuration
    #[serde(default)]
    pub trigger: TriggerFileConfig,
}

/// Inference server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Endpoint URL (e.g. "http://192.168.1.2:5000/chat")
    pub url: Option<String>,

    /// Seconds of read inactivity tolerated while the server runs inference
    pub upload_timeout_secs: Option<u64>,
}

/// Audio capture/playback configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Capture/playback sample rate in Hz
    pub sample_rate: Option<u32>,

    /// Fixed recording length in seconds
    pub record_secs: Option<u32>,

    /// Device-native transfer chunk size in bytes
    pub chunk_bytes: Option<usize>,
}

/// Button trigger configuration
#[derive(Debug, Default, Deserialize)]
pub struct TriggerFileConfig {
    /// Delay before a new press is recognized after a session, in ms
    pub debounce_ms: Option<u64>,

    /// Button poll interval in ms
    pub poll_interval_ms: Option<u64>,
}

/// Load the TOML config file from `path`, or the standard path if none is
/// given.
///
/// Returns `TalkbackConfigFile::default()` if the file doesn't exist or
/// can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> TalkbackConfigFile {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_file_path() {
            Some(p) => p,
            None => return TalkbackConfigFile::default(),
        },
    };

    if !path.exists() {
        return TalkbackConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                TalkbackConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            TalkbackConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/talkback/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("talkback").join("config.toml"))
}
