//! Error types for the talkback pipeline

use thiserror::Error;

/// Result type alias for talkback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the talkback pipeline
///
/// Everything except [`Error::Config`] and [`Error::Allocation`] is local to
/// one session: the daemon logs it and returns to idle.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Capture buffer could not be sized at startup
    #[error("allocation error: {0}")]
    Allocation(String),

    /// Capture device error
    #[error("capture error: {0}")]
    Capture(String),

    /// Capture device failed to deliver a full clip in time
    #[error("capture timed out: {0}")]
    CaptureTimeout(String),

    /// Playback device error
    #[error("playback error: {0}")]
    Playback(String),

    /// Network unavailable at session start
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Server rejected the upload; body is diagnostic text
    #[error("upload failed with status {status}: {body}")]
    Upload {
        /// HTTP status the server answered with
        status: reqwest::StatusCode,
        /// Response body, reported as-is
        body: String,
    },

    /// Malformed response audio
    #[error("decode error: {0}")]
    Decode(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
