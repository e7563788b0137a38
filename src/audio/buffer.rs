//! The single reusable capture buffer
//!
//! One allocation holds a full recording session: the 44-byte WAV header
//! followed by exactly `sample_rate * record_secs * 2` bytes of samples. It
//! is sized once at startup and reused for every session, which is what
//! bounds the recording length: the whole clip must fit in memory before
//! anything goes on the wire.

use crate::audio::wav;
use crate::{Error, Result};

/// Fixed-capacity buffer for one recording session.
///
/// Layout invariant: bytes `[0, 44)` hold a WAV header describing the rest;
/// bytes `[44, len)` hold little-endian 16-bit mono PCM in capture order.
pub struct CaptureBuffer {
    data: Vec<u8>,
    sample_rate: u32,
    wave_data_size: u32,
}

impl CaptureBuffer {
    /// Allocate a buffer for `record_secs` seconds of audio at `sample_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the requested size overflows, or
    /// [`Error::Allocation`] if the allocator refuses the buffer. Allocation
    /// failure is fatal to the process: nothing useful can run without it.
    pub fn new(sample_rate: u32, record_secs: u32) -> Result<Self> {
        let wave_data_size = sample_rate
            .checked_mul(record_secs)
            .and_then(|n| n.checked_mul(wav::BYTES_PER_SAMPLE))
            .ok_or_else(|| {
                Error::Config(format!(
                    "recording of {record_secs}s at {sample_rate}Hz overflows the capture buffer"
                ))
            })?;
        let total = wav::HEADER_LEN + wave_data_size as usize;

        let mut data = Vec::new();
        data.try_reserve_exact(total).map_err(|e| {
            Error::Allocation(format!(
                "cannot reserve {total} bytes for the capture buffer ({e}); shorten the recording"
            ))
        })?;
        data.resize(total, 0);

        Ok(Self {
            data,
            sample_rate,
            wave_data_size,
        })
    }

    /// Rewrite the WAV header region.
    ///
    /// Called at the start of every session; the values never change for a
    /// given configuration.
    pub fn stamp_header(&mut self) {
        let header = wav::build_header(self.sample_rate, self.wave_data_size);
        self.data[..wav::HEADER_LEN].copy_from_slice(&header);
    }

    /// The sample region, excluding the header.
    pub fn sample_region_mut(&mut self) -> &mut [u8] {
        &mut self.data[wav::HEADER_LEN..]
    }

    /// The complete WAV file: header plus sample region.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size of the sample region in bytes.
    #[must_use]
    pub const fn wave_data_size(&self) -> u32 {
        self.wave_data_size
    }

    /// Total size of the buffer (header + samples).
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    /// Sample rate the buffer was sized for.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
