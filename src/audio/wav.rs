//! WAV container framing
//!
//! The device always emits its own canonical 44-byte header, so only that
//! fixed layout is supported: RIFF, a 16-byte `fmt ` chunk (PCM, mono,
//! 16-bit) and a `data` chunk. Inbound responses are assumed to carry the
//! same layout; [`check_riff_prefix`] verifies the magic bytes of the header
//! the pipeline strips, and anything else is rejected before a byte reaches
//! the amplifier.

use crate::{Error, Result};

/// Length of the canonical WAV header
pub const HEADER_LEN: usize = 44;

/// Channel count the pipeline records
pub const CHANNELS: u16 = 1;

/// Bits per sample the pipeline records
pub const BITS_PER_SAMPLE: u16 = 16;

/// Bytes per sample (16-bit PCM)
pub const BYTES_PER_SAMPLE: u32 = 2;

/// Build the canonical 44-byte header for a 16-bit mono PCM stream.
///
/// `wave_data_size` counts the sample region only, excluding the header
/// itself; the RIFF size field becomes `wave_data_size + 36`. All multi-byte
/// fields are little-endian.
#[must_use]
pub fn build_header(sample_rate: u32, wave_data_size: u32) -> [u8; HEADER_LEN] {
    let file_size = wave_data_size + 36;
    let byte_rate = sample_rate * u32::from(CHANNELS) * BYTES_PER_SAMPLE;
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);

    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&file_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&wave_data_size.to_le_bytes());
    header
}

/// Verify the RIFF/WAVE magic of a response header.
///
/// Only the magic is checked; field values are the server's business and the
/// header length is assumed fixed at [`HEADER_LEN`].
///
/// # Errors
///
/// Returns [`Error::Decode`] if the prefix is too short or the magic bytes
/// do not match.
pub fn check_riff_prefix(header: &[u8]) -> Result<()> {
    if header.len() < 12 {
        return Err(Error::Decode(format!(
            "header prefix too short: {} bytes",
            header.len()
        )));
    }
    if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return Err(Error::Decode("response is not a RIFF/WAVE stream".to_string()));
    }
    Ok(())
}
