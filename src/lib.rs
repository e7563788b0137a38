//! Talkback - push-to-talk voice pipeline
//!
//! Records a fixed-length clip on a button press, uploads it as a WAV file
//! to a speech inference server, and streams the server's WAV response to
//! the speaker as it arrives. Playback starts before the response has
//! finished downloading, so the response never has to fit in memory.
//!
//! # Architecture
//!
//! ```text
//! ┌────────┐  press   ┌────────────────┐  one session at a time
//! │ button ├─────────▶│ SessionTrigger ├──────────────┐
//! └────────┘          └────────────────┘              ▼
//!              ┌───────────────────────────────────────────────┐
//!              │           UploadPlaybackPipeline              │
//!              │  prime ─▶ record ─▶ upload ─▶ stream playback │
//!              └──────┬───────────────┬───────────────┬────────┘
//!                     ▼               ▼               ▼
//!             AudioFrameSource   HTTP (WAV)       AudioSink
//!               (microphone)   inference server   (speaker)
//! ```
//!
//! The devices sit behind the `AudioFrameSource`/`AudioSink` traits, so the
//! session state machine is exercised in tests with scripted fakes and a
//! local HTTP server instead of hardware.

pub mod audio;
pub mod config;
pub mod daemon;
pub mod error;
pub mod pipeline;
pub mod trigger;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
