//! End-to-end session tests against a local HTTP server
//!
//! Exercises the real upload path and the streaming playback state machine
//! with scripted devices instead of audio hardware.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;

use common::{PatternSource, SharedSink, StalledSource, pattern_byte, spawn_server};
use talkback::Error;
use talkback::audio::{CaptureBuffer, wav};
use talkback::pipeline::UploadPlaybackPipeline;

const SAMPLE_RATE: u32 = 16_000;
const RECORD_SECS: u32 = 1;
const CHUNK_BYTES: usize = 1024;

fn wav_response(audio_len: usize) -> Vec<u8> {
    let mut body = wav::build_header(SAMPLE_RATE, u32::try_from(audio_len).unwrap()).to_vec();
    body.extend((0..audio_len).map(|i| u8::try_from(i % 256).unwrap()));
    body
}

fn pipeline_against(
    addr: std::net::SocketAddr,
) -> (
    UploadPlaybackPipeline<PatternSource, SharedSink>,
    Arc<Mutex<Vec<u8>>>,
) {
    let (sink, played) = SharedSink::new();
    let buffer = CaptureBuffer::new(SAMPLE_RATE, RECORD_SECS).unwrap();
    let pipeline = UploadPlaybackPipeline::new(
        PatternSource::new(),
        sink,
        buffer,
        format!("http://{addr}/chat"),
        Duration::from_secs(5),
        CHUNK_BYTES,
    )
    .unwrap();
    (pipeline, played)
}

#[tokio::test]
async fn test_session_uploads_canonical_wav_and_plays_response() {
    let received: Arc<Mutex<Option<(HeaderMap, Vec<u8>)>>> = Arc::new(Mutex::new(None));
    let response = wav_response(10_000);

    let app = Router::new().route(
        "/chat",
        post({
            let received = Arc::clone(&received);
            let response = response.clone();
            move |headers: HeaderMap, body: Bytes| async move {
                *received.lock().unwrap() = Some((headers, body.to_vec()));
                response
            }
        }),
    );
    let addr = spawn_server(app).await;

    let (mut pipeline, played) = pipeline_against(addr);
    pipeline.run_session().await.unwrap();

    // The request body is the byte-exact WAV fixture: header plus the
    // pattern the device emitted after the primed discard.
    let wave_data_size = SAMPLE_RATE * RECORD_SECS * 2;
    let mut expected = wav::build_header(SAMPLE_RATE, wave_data_size).to_vec();
    expected.extend(
        (0..u64::from(wave_data_size)).map(|i| pattern_byte(CHUNK_BYTES as u64 + i)),
    );

    let (headers, body) = received.lock().unwrap().take().expect("server saw upload");
    assert_eq!(headers.get("content-type").unwrap(), "audio/wav");
    assert_eq!(
        headers.get("content-length").unwrap().to_str().unwrap(),
        expected.len().to_string()
    );
    assert_eq!(body, expected);

    // Exactly the post-header audio reached the sink, in order.
    assert_eq!(played.lock().unwrap().as_slice(), &response[44..]);
}

#[tokio::test]
async fn test_chunked_response_without_length_plays_until_close() {
    let response = wav_response(7_000);
    let app = Router::new().route(
        "/chat",
        post({
            let response = response.clone();
            move || async move {
                let chunks: Vec<Result<Bytes, std::io::Error>> = response
                    .chunks(997)
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect();
                Body::from_stream(futures::stream::iter(chunks))
            }
        }),
    );
    let addr = spawn_server(app).await;

    let (mut pipeline, played) = pipeline_against(addr);
    tokio::time::timeout(Duration::from_secs(10), pipeline.run_session())
        .await
        .expect("streaming must terminate when the connection closes")
        .unwrap();

    assert_eq!(played.lock().unwrap().as_slice(), &response[44..]);
}

#[tokio::test]
async fn test_server_error_reaches_caller_with_diagnostic_body() {
    let app = Router::new().route(
        "/chat",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "inference backend down") }),
    );
    let addr = spawn_server(app).await;

    let (mut pipeline, played) = pipeline_against(addr);
    let err = pipeline.run_session().await.unwrap_err();

    match err {
        Error::Upload { status, body } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            assert_eq!(body, "inference backend down");
        }
        other => panic!("expected upload error, got {other}"),
    }
    assert!(played.lock().unwrap().is_empty(), "no bytes on a failed upload");
}

#[tokio::test]
async fn test_capture_timeout_skips_the_upload() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route(
        "/chat",
        post({
            let hits = Arc::clone(&hits);
            move || async move {
                hits.fetch_add(1, Ordering::SeqCst);
                wav_response(100)
            }
        }),
    );
    let addr = spawn_server(app).await;

    let (sink, played) = SharedSink::new();
    let buffer = CaptureBuffer::new(SAMPLE_RATE, RECORD_SECS).unwrap();
    let mut pipeline = UploadPlaybackPipeline::new(
        StalledSource,
        sink,
        buffer,
        format!("http://{addr}/chat"),
        Duration::from_secs(5),
        CHUNK_BYTES,
    )
    .unwrap();

    let err = pipeline.run_session().await.unwrap_err();
    assert!(matches!(err, Error::CaptureTimeout(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 0, "no request after capture failure");
    assert!(played.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_server_is_a_connectivity_error() {
    // Bind a port and immediately drop it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (mut pipeline, played) = pipeline_against(addr);
    let err = pipeline.run_session().await.unwrap_err();

    assert!(matches!(err, Error::Connectivity(_)), "got {err}");
    assert!(played.lock().unwrap().is_empty());
}
