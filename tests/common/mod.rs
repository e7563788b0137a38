//! Shared test utilities
//!
//! Scripted audio devices and a local HTTP server so pipeline tests run
//! without hardware or a real inference backend.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use talkback::audio::{AudioFrameSource, AudioSink};
use talkback::{Error, Result};

/// Deterministic PCM byte pattern, addressed by stream position
#[must_use]
pub fn pattern_byte(pos: u64) -> u8 {
    #[allow(clippy::cast_possible_truncation)]
    let byte = (pos.wrapping_mul(31).wrapping_add(7) % 251) as u8;
    byte
}

/// Capture device that emits the [`pattern_byte`] stream
#[derive(Default)]
pub struct PatternSource {
    pos: u64,
}

impl PatternSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioFrameSource for PatternSource {
    fn prime_discard(&mut self, len: usize) -> Result<()> {
        self.pos += len as u64;
        Ok(())
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        for slot in dest.iter_mut() {
            *slot = pattern_byte(self.pos);
            self.pos += 1;
        }
        Ok(())
    }
}

/// Capture device that always stalls
pub struct StalledSource;

impl AudioFrameSource for StalledSource {
    fn prime_discard(&mut self, _len: usize) -> Result<()> {
        Ok(())
    }

    fn fill(&mut self, _dest: &mut [u8]) -> Result<()> {
        Err(Error::CaptureTimeout("input device stalled".to_string()))
    }
}

/// Sink that records writes into a shared buffer the test keeps a handle to
pub struct SharedSink {
    data: Arc<Mutex<Vec<u8>>>,
}

impl SharedSink {
    #[must_use]
    pub fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let data = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                data: Arc::clone(&data),
            },
            data,
        )
    }
}

impl AudioSink for SharedSink {
    fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.data.lock().unwrap().extend_from_slice(chunk);
        Ok(())
    }
}

/// Serve `app` on an ephemeral local port, returning its address
pub async fn spawn_server(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    addr
}
