//! Configuration management for talkback

pub mod file;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Default capture/playback sample rate (speech)
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Default fixed recording length. Bounded by the capture buffer: the whole
/// clip lives in one allocation.
pub const DEFAULT_RECORD_SECS: u32 = 4;

/// Default device-native transfer chunk size
pub const DEFAULT_CHUNK_BYTES: usize = 1024;

const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 20;
const DEFAULT_DEBOUNCE_MS: u64 = 1_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

/// Talkback configuration, immutable after load
#[derive(Debug, Clone)]
pub struct Config {
    /// Inference server endpoint for WAV uploads
    pub server_url: String,

    /// Read-inactivity timeout on the upload connection; long, because the
    /// server runs inference synchronously before answering
    pub upload_timeout: Duration,

    /// Capture/playback sample rate in Hz
    pub sample_rate: u32,

    /// Fixed recording length in seconds
    pub record_secs: u32,

    /// Device-native transfer chunk size in bytes
    pub chunk_bytes: usize,

    /// Debounce window after a session completes
    pub debounce: Duration,

    /// Button poll interval
    pub poll_interval: Duration,
}

impl Config {
    /// Load configuration (env > toml > default).
    ///
    /// `server_url` comes from the CLI (flag or `TALKBACK_SERVER_URL`) and
    /// wins over the config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no server URL is configured anywhere or
    /// a value fails validation.
    pub fn load(config_path: Option<&Path>, server_url: Option<String>) -> Result<Self> {
        let fc = file::load_config_file(config_path);

        let server_url = server_url.or(fc.server.url).ok_or_else(|| {
            Error::Config(
                "server url not configured (pass --server-url, set TALKBACK_SERVER_URL, \
                 or set server.url in config.toml)"
                    .to_string(),
            )
        })?;

        let config = Self {
            server_url,
            upload_timeout: Duration::from_secs(
                env_parse("TALKBACK_UPLOAD_TIMEOUT_SECS")
                    .or(fc.server.upload_timeout_secs)
                    .unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS),
            ),
            sample_rate: env_parse("TALKBACK_SAMPLE_RATE")
                .or(fc.audio.sample_rate)
                .unwrap_or(DEFAULT_SAMPLE_RATE),
            record_secs: env_parse("TALKBACK_RECORD_SECS")
                .or(fc.audio.record_secs)
                .unwrap_or(DEFAULT_RECORD_SECS),
            chunk_bytes: env_parse("TALKBACK_CHUNK_BYTES")
                .or(fc.audio.chunk_bytes)
                .unwrap_or(DEFAULT_CHUNK_BYTES),
            debounce: Duration::from_millis(
                env_parse("TALKBACK_DEBOUNCE_MS")
                    .or(fc.trigger.debounce_ms)
                    .unwrap_or(DEFAULT_DEBOUNCE_MS),
            ),
            poll_interval: Duration::from_millis(
                env_parse("TALKBACK_POLL_INTERVAL_MS")
                    .or(fc.trigger.poll_interval_ms)
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(Error::Config("server url must not be empty".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(Error::Config("audio.sample_rate must be positive".to_string()));
        }
        if self.record_secs == 0 {
            return Err(Error::Config("audio.record_secs must be positive".to_string()));
        }
        if self.chunk_bytes == 0 {
            return Err(Error::Config("audio.chunk_bytes must be positive".to_string()));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_server_url_is_an_error() {
        // Nonexistent file path keeps the real user config out of the test
        let missing = Path::new("/nonexistent/talkback-test.toml");
        let err = Config::load(Some(missing), None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_defaults_apply() {
        let missing = Path::new("/nonexistent/talkback-test.toml");
        let config =
            Config::load(Some(missing), Some("http://localhost:5000/chat".to_string())).unwrap();

        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.record_secs, DEFAULT_RECORD_SECS);
        assert_eq!(config.chunk_bytes, DEFAULT_CHUNK_BYTES);
        assert_eq!(config.upload_timeout, Duration::from_secs(20));
        assert_eq!(config.debounce, Duration::from_millis(1_000));
    }

    #[test]
    fn test_file_overlay() {
        let dir = std::env::temp_dir().join("talkback-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[server]\nurl = \"http://10.0.0.5:5000/chat\"\n\
             [audio]\nsample_rate = 8000\nrecord_secs = 2\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.server_url, "http://10.0.0.5:5000/chat");
        assert_eq!(config.sample_rate, 8_000);
        assert_eq!(config.record_secs, 2);
        // Unset fields keep their defaults
        assert_eq!(config.chunk_bytes, DEFAULT_CHUNK_BYTES);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let dir = std::env::temp_dir().join("talkback-config-zero-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[audio]\nsample_rate = 0\n").unwrap();

        let err = Config::load(Some(&path), Some("http://localhost:5000".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        std::fs::remove_file(&path).ok();
    }
}
