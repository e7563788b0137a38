//! Audio capture and playback
//!
//! The pipeline only ever touches devices through the [`AudioFrameSource`]
//! and [`AudioSink`] seams, so the session state machine runs unchanged
//! against the real cpal devices or the scripted fakes used in tests.

mod buffer;
mod capture;
mod playback;
pub mod wav;

pub use buffer::CaptureBuffer;
pub use capture::CpalFrameSource;
pub use playback::CpalSink;

use crate::Result;

/// Blocking pull of raw PCM from a capture device.
///
/// Implementations deliver little-endian 16-bit mono samples at the rate the
/// device was opened with.
pub trait AudioFrameSource {
    /// Read and discard `len` bytes, flushing samples the driver buffered
    /// while the device was idle.
    ///
    /// # Errors
    ///
    /// Returns a capture error if the device stalls before delivering.
    fn prime_discard(&mut self, len: usize) -> Result<()>;

    /// Fill `dest` completely, reading in device-native chunks.
    ///
    /// On success exactly `dest.len()` bytes were written. A device that
    /// cannot deliver them fails with [`crate::Error::CaptureTimeout`]; the
    /// partial contents must not be forwarded anywhere.
    ///
    /// # Errors
    ///
    /// Returns a capture error on device failure or stall.
    fn fill(&mut self, dest: &mut [u8]) -> Result<()>;
}

/// Blocking push of raw PCM to a playback device.
pub trait AudioSink {
    /// Write all of `chunk`, blocking until the device queue accepts it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Playback`] if the device does not drain
    /// within its timeout. The failure aborts the rest of the session but is
    /// not fatal to the process.
    fn write(&mut self, chunk: &[u8]) -> Result<()>;
}
