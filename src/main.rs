use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talkback::audio::{AudioFrameSource, AudioSink, CpalFrameSource, CpalSink};
use talkback::config::{DEFAULT_CHUNK_BYTES, DEFAULT_SAMPLE_RATE};
use talkback::{Config, Daemon};

/// Talkback - push-to-talk voice pipeline for speech inference servers
#[derive(Parser)]
#[command(name = "talkback", version, about)]
struct Cli {
    /// Inference server endpoint URL
    #[arg(long, env = "TALKBACK_SERVER_URL")]
    server_url: Option<String>,

    /// Path to a TOML config file (defaults to ~/.config/talkback/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,talkback=info",
        1 => "info,talkback=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration),
            Command::TestSpeaker => test_speaker(),
        };
    }

    let config = Config::load(cli.config.as_deref(), cli.server_url)?;
    tracing::debug!(?config, "loaded configuration");

    let daemon = Daemon::new(config);
    daemon.run().await?;

    Ok(())
}

/// Test microphone input
fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut source = CpalFrameSource::new(DEFAULT_SAMPLE_RATE, DEFAULT_CHUNK_BYTES)?;
    println!("Sample rate: {DEFAULT_SAMPLE_RATE} Hz");
    println!("---");

    // One second of 16-bit mono per pass
    let mut second = vec![0u8; DEFAULT_SAMPLE_RATE as usize * 2];
    source.prime_discard(DEFAULT_CHUNK_BYTES)?;

    for i in 0..duration {
        source.fill(&mut second)?;

        let rms = calculate_rms(&second);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (rms * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {rms:.4} | [{meter}]", i + 1);
    }

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// RMS energy of little-endian 16-bit samples, normalized to [0, 1]
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(bytes: &[u8]) -> f32 {
    if bytes.len() < 2 {
        return 0.0;
    }
    let sum_squares: f32 = bytes
        .chunks_exact(2)
        .map(|pair| {
            let s = f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0;
            s * s
        })
        .sum();
    (sum_squares / (bytes.len() / 2) as f32).sqrt()
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let mut sink = CpalSink::new(DEFAULT_SAMPLE_RATE)?;

    let frequency = 440.0_f32;
    let num_samples = DEFAULT_SAMPLE_RATE as usize * 2;

    let mut tone = Vec::with_capacity(num_samples * 2);
    for i in 0..num_samples {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f32 / DEFAULT_SAMPLE_RATE as f32;
        let sample = (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3;
        #[allow(clippy::cast_possible_truncation)]
        let sample = (sample * 32767.0) as i16;
        tone.extend_from_slice(&sample.to_le_bytes());
    }

    println!("Playing {num_samples} samples at {DEFAULT_SAMPLE_RATE} Hz...");
    sink.write(&tone)?;
    sink.drain()?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Try: pavucontrol (to check output levels)");

    Ok(())
}
