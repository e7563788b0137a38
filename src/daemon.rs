//! Daemon - the push-to-talk service loop
//!
//! Owns the devices, the capture buffer and the trigger; runs sessions one
//! at a time until interrupted.

use std::time::Instant;

use tokio::sync::mpsc;

use crate::audio::{CaptureBuffer, CpalFrameSource, CpalSink};
use crate::pipeline::UploadPlaybackPipeline;
use crate::trigger::{ButtonInput, SessionTrigger, StdinButton};
use crate::{Config, Result};

/// The talkback daemon - records, uploads, and plays back on button press
pub struct Daemon {
    config: Config,
}

impl Daemon {
    /// Create a new daemon instance
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the daemon until interrupted.
    ///
    /// Buffer and device setup failures are fatal; after startup every error
    /// is local to one session and the loop returns to idle.
    ///
    /// # Errors
    ///
    /// Returns an error if startup allocation or device setup fails, or if
    /// the button input disappears.
    #[allow(clippy::future_not_send)]
    pub async fn run(self) -> Result<()> {
        let buffer = CaptureBuffer::new(self.config.sample_rate, self.config.record_secs)?;
        tracing::info!(
            bytes = buffer.total_len(),
            sample_rate = self.config.sample_rate,
            record_secs = self.config.record_secs,
            "capture buffer allocated"
        );

        let source = CpalFrameSource::new(self.config.sample_rate, self.config.chunk_bytes)?;
        let sink = CpalSink::new(self.config.sample_rate)?;
        let mut pipeline = UploadPlaybackPipeline::new(
            source,
            sink,
            buffer,
            self.config.server_url.clone(),
            self.config.upload_timeout,
            self.config.chunk_bytes,
        )?;

        let mut trigger = SessionTrigger::new(self.config.debounce);
        let mut button = StdinButton::new();

        // Ctrl-C ends the loop between sessions
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        tracing::info!(url = %self.config.server_url, "ready - press enter to talk");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                () = tokio::time::sleep(self.config.poll_interval) => {
                    let pressed = button.is_pressed()?;
                    if !trigger.poll(pressed, Instant::now()) {
                        continue;
                    }

                    tracing::info!("button pressed, session starting");
                    match pipeline.run_session().await {
                        Ok(()) => tracing::info!("session complete"),
                        Err(e) => tracing::error!(error = %e, "session failed"),
                    }
                    trigger.complete(Instant::now());
                    tracing::info!("finished, waiting for next press");
                }
            }
        }

        Ok(())
    }
}
