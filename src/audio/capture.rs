//! Audio capture from the microphone

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::audio::AudioFrameSource;
use crate::{Error, Result};

/// How long `fill` tolerates zero progress before declaring the device
/// stalled
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll interval while waiting for the driver to produce samples
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Pulls 16-bit mono PCM from the default input device.
///
/// The cpal input callback converts and queues samples continuously; `fill`
/// drains the queue in device-native chunks.
pub struct CpalFrameSource {
    queue: Arc<Mutex<VecDeque<u8>>>,
    chunk_len: usize,
    _stream: Stream,
}

impl CpalFrameSource {
    /// Open the default input device at `sample_rate`, reading mono.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`] if no input device is available, the
    /// device does not support the rate, or the stream cannot be started.
    pub fn new(sample_rate: u32, chunk_len: usize) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Capture("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Capture(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .ok_or_else(|| Error::Capture("no suitable input config found".to_string()))?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let producer = Arc::clone(&queue);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut q) = producer.lock() {
                        for &sample in data {
                            #[allow(clippy::cast_possible_truncation)]
                            let s = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                            q.extend(s.to_le_bytes());
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Capture(e.to_string()))?;

        stream.play().map_err(|e| Error::Capture(e.to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            chunk_len,
            "audio capture initialized"
        );

        Ok(Self {
            queue,
            chunk_len,
            _stream: stream,
        })
    }

    /// Move up to `dest.len()` queued bytes into `dest`, returning the count.
    fn drain_into(&self, dest: &mut [u8]) -> usize {
        let Ok(mut queue) = self.queue.lock() else {
            return 0;
        };
        let n = dest.len().min(queue.len());
        for (slot, byte) in dest[..n].iter_mut().zip(queue.drain(..n)) {
            *slot = byte;
        }
        n
    }
}

impl AudioFrameSource for CpalFrameSource {
    fn prime_discard(&mut self, len: usize) -> Result<()> {
        // Everything queued so far predates this session.
        if let Ok(mut queue) = self.queue.lock() {
            queue.clear();
        }
        let mut scratch = vec![0u8; len];
        self.fill(&mut scratch)
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        let total = dest.len();
        let mut written = 0;
        let mut last_progress = Instant::now();

        while written < total {
            let want = self.chunk_len.min(total - written);
            let n = self.drain_into(&mut dest[written..written + want]);
            if n == 0 {
                if last_progress.elapsed() > STALL_TIMEOUT {
                    return Err(Error::CaptureTimeout(format!(
                        "input device stalled after {written} of {total} bytes"
                    )));
                }
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
            written += n;
            last_progress = Instant::now();
        }

        Ok(())
    }
}
