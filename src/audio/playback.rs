//! Audio playback to the speaker/amplifier

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::audio::AudioSink;
use crate::{Error, Result};

/// How long `write` tolerates a full output queue with no drain progress
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll interval while waiting for the output queue to drain
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Queued audio high watermark, in seconds worth of samples. `write` blocks
/// once this much is buffered, which keeps sink memory flat during long
/// streamed responses.
const WATERMARK_SECS: u32 = 1;

/// Pushes 16-bit mono PCM to the default output device.
///
/// `write` queues samples; the cpal output callback drains the queue,
/// duplicating each sample across the device's channels and playing silence
/// when the queue is empty.
pub struct CpalSink {
    queue: Arc<Mutex<VecDeque<i16>>>,
    high_watermark: usize,
    /// HTTP chunking can split a sample; the odd byte carries over.
    pending: Option<u8>,
    _stream: Stream,
}

impl CpalSink {
    /// Open the default output device at `sample_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Playback`] if no output device is available, no
    /// mono or stereo config supports the rate, or the stream cannot start.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Playback("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Playback(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(sample_rate)
                        && c.max_sample_rate() >= SampleRate(sample_rate)
                })
            })
            .ok_or_else(|| Error::Playback("no suitable output config found".to_string()))?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();
        let channels = config.channels as usize;

        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let consumer = Arc::clone(&queue);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if let Ok(mut q) = consumer.lock() {
                        for frame in data.chunks_mut(channels) {
                            let sample = q.pop_front().map_or(0.0, |s| f32::from(s) / 32768.0);
                            for out in frame.iter_mut() {
                                *out = sample;
                            }
                        }
                    } else {
                        data.fill(0.0);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Playback(e.to_string()))?;

        stream.play().map_err(|e| Error::Playback(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels,
            "audio playback initialized"
        );

        Ok(Self {
            queue,
            high_watermark: (sample_rate * WATERMARK_SECS) as usize,
            pending: None,
            _stream: stream,
        })
    }

    /// Block until everything queued has been played out.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Playback`] if the device stops draining.
    pub fn drain(&self) -> Result<()> {
        let mut last_progress = Instant::now();
        let mut last_len = usize::MAX;

        loop {
            let len = self.queue.lock().map_or(0, |q| q.len());
            if len == 0 {
                break;
            }
            if len < last_len {
                last_len = len;
                last_progress = Instant::now();
            } else if last_progress.elapsed() > WRITE_TIMEOUT {
                return Err(Error::Playback("output device stopped draining".to_string()));
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        // Let the device swallow its last buffer
        std::thread::sleep(Duration::from_millis(100));
        Ok(())
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let mut samples = Vec::with_capacity(chunk.len() / 2 + 1);
        let mut iter = chunk.iter().copied();

        if let Some(lo) = self.pending.take() {
            match iter.next() {
                Some(hi) => samples.push(i16::from_le_bytes([lo, hi])),
                None => {
                    self.pending = Some(lo);
                    return Ok(());
                }
            }
        }
        loop {
            match (iter.next(), iter.next()) {
                (Some(lo), Some(hi)) => samples.push(i16::from_le_bytes([lo, hi])),
                (Some(lo), None) => {
                    self.pending = Some(lo);
                    break;
                }
                _ => break,
            }
        }

        let mut offset = 0;
        let mut last_progress = Instant::now();

        while offset < samples.len() {
            let pushed = if let Ok(mut queue) = self.queue.lock() {
                if queue.len() >= self.high_watermark {
                    0
                } else {
                    let room = self.high_watermark - queue.len();
                    let n = room.min(samples.len() - offset);
                    queue.extend(&samples[offset..offset + n]);
                    n
                }
            } else {
                0
            };

            if pushed == 0 {
                if last_progress.elapsed() > WRITE_TIMEOUT {
                    return Err(Error::Playback(
                        "output device not ready within timeout".to_string(),
                    ));
                }
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
            offset += pushed;
            last_progress = Instant::now();
        }

        Ok(())
    }
}
