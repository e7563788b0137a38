//! The record → upload → playback pipeline
//!
//! One session walks PrimingCapture → Recording → Uploading → AwaitingHeader
//! → Streaming → Done; any failure exits straight to Done. Streaming is the
//! latency-critical part: response audio is forwarded to the sink chunk by
//! chunk as it arrives, so playback starts before the server has finished
//! sending and the response never has to fit in memory.

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};

use crate::audio::{AudioFrameSource, AudioSink, CaptureBuffer, wav};
use crate::{Error, Result};

/// How long to wait for the TCP connection itself
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Declared length of a response body, header included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseLength {
    /// `Content-Length` was present; stream exactly this many bytes.
    Known(u64),
    /// Chunked or close-delimited; stream until the connection closes.
    Unknown,
}

/// Drives one full record → upload → playback session.
///
/// Owns the capture buffer for its whole lifetime; the buffer is stamped and
/// refilled in place each session, never reallocated.
pub struct UploadPlaybackPipeline<S, K> {
    source: S,
    sink: K,
    buffer: CaptureBuffer,
    client: reqwest::Client,
    server_url: String,
    chunk_len: usize,
}

impl<S: AudioFrameSource, K: AudioSink> UploadPlaybackPipeline<S, K> {
    /// Build a pipeline around the given devices and buffer.
    ///
    /// `upload_timeout` bounds read inactivity on the connection, which
    /// covers the long synchronous inference wait for the first response
    /// byte without capping how long a healthy stream may play.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        source: S,
        sink: K,
        buffer: CaptureBuffer,
        server_url: String,
        upload_timeout: Duration,
        chunk_len: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(upload_timeout)
            .build()?;

        Ok(Self {
            source,
            sink,
            buffer,
            client,
            server_url,
            chunk_len,
        })
    }

    /// Run one session to completion.
    ///
    /// Every error is local to this session: the buffer and devices stay
    /// usable and the caller returns to idle.
    ///
    /// # Errors
    ///
    /// Returns the first capture, transport, upload, decode, or playback
    /// error encountered; no upload happens after a capture failure and no
    /// playback after an upload failure.
    pub async fn run_session(&mut self) -> Result<()> {
        tracing::debug!("priming capture");
        self.source.prime_discard(self.chunk_len)?;

        tracing::debug!(bytes = self.buffer.total_len(), "recording");
        self.buffer.stamp_header();
        self.source.fill(self.buffer.sample_region_mut())?;

        tracing::info!(url = %self.server_url, bytes = self.buffer.total_len(), "uploading");
        let response = self
            .client
            .post(&self.server_url)
            .header(CONTENT_TYPE, "audio/wav")
            .header(CONTENT_LENGTH, self.buffer.total_len())
            .body(self.buffer.as_bytes().to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::Connectivity(e.to_string())
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            // Non-200 bodies are diagnostic text from the server.
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upload { status, body });
        }

        let declared = response
            .content_length()
            .map_or(ResponseLength::Unknown, ResponseLength::Known);
        tracing::debug!(?declared, "response ok, streaming to sink");

        let body = response.bytes_stream().map(|item| item.map_err(Error::from));
        let played = play_body(&mut self.sink, body, declared, self.chunk_len).await?;
        tracing::info!(bytes = played, "playback finished");

        Ok(())
    }
}

/// Strip the leading 44-byte WAV header from a response body stream and
/// forward the remainder to the sink in bounded chunks.
///
/// `declared` is the length the server claimed for the whole body, header
/// included; with [`ResponseLength::Unknown`] the stream runs until the
/// connection closes. Returns the number of audio bytes forwarded.
///
/// The `.await` on each chunk is the loop's single suspension point: while
/// the connection is idle the task parks there instead of spinning, and the
/// explicit yield after every forwarded chunk keeps a fast sender from
/// starving the rest of the process.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the body ends inside the header or the
/// header magic is wrong, a playback error from the sink, or a transport
/// error from the stream.
pub async fn play_body<K, B>(
    sink: &mut K,
    body: B,
    declared: ResponseLength,
    chunk_len: usize,
) -> Result<u64>
where
    K: AudioSink,
    B: Stream<Item = Result<Bytes>>,
{
    let header_len = wav::HEADER_LEN as u64;
    let mut remaining = match declared {
        ResponseLength::Known(n) if n < header_len => {
            return Err(Error::Decode(format!(
                "response too short for a WAV header: {n} bytes"
            )));
        }
        ResponseLength::Known(n) => ResponseLength::Known(n - header_len),
        ResponseLength::Unknown => ResponseLength::Unknown,
    };

    let mut header = [0u8; wav::HEADER_LEN];
    let mut header_have = 0usize;
    let mut played: u64 = 0;

    let mut body = std::pin::pin!(body);
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        let mut data = chunk.as_ref();

        // AwaitingHeader: the header may arrive split across chunks.
        if header_have < wav::HEADER_LEN {
            let take = (wav::HEADER_LEN - header_have).min(data.len());
            header[header_have..header_have + take].copy_from_slice(&data[..take]);
            header_have += take;
            data = &data[take..];
            if header_have == wav::HEADER_LEN {
                wav::check_riff_prefix(&header)?;
            }
        }

        for piece in data.chunks(chunk_len) {
            // Anything past the declared length is not audio.
            let limit = match remaining {
                ResponseLength::Known(n) => usize::try_from(n).unwrap_or(usize::MAX),
                ResponseLength::Unknown => usize::MAX,
            };
            let piece = &piece[..piece.len().min(limit)];
            if piece.is_empty() {
                break;
            }
            sink.write(piece)?;
            played += piece.len() as u64;
            if let ResponseLength::Known(n) = &mut remaining {
                *n -= piece.len() as u64;
            }
            tokio::task::yield_now().await;
        }

        if remaining == ResponseLength::Known(0) {
            break;
        }
    }

    if header_have < wav::HEADER_LEN {
        return Err(Error::Decode(format!(
            "response ended inside the WAV header ({header_have} of {} bytes)",
            wav::HEADER_LEN
        )));
    }
    if let ResponseLength::Known(n) = remaining {
        if n > 0 {
            tracing::warn!(missing = n, "connection closed before declared length");
        }
    }

    Ok(played)
}
