//! Render a raw YM2149 register dump, or a short built-in demo, to WAV.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ym2149_synth::pitch::Freq;
use ym2149_synth::regdump;
use ym2149_synth::ym2149::ENVELOPE_NO_WRITE;
use ym2149_synth::{EnvelopeShape, RefreshRate, Synth, SynthConfig, WavSink};

/// Frames per second of the built-in demo.
const DEMO_RATE: u32 = 50;
/// Length of the built-in demo.
const DEMO_SECONDS: usize = 2;

#[derive(Parser)]
#[command(name = "ym2149-render")]
#[command(about = "Render YM2149 register frames to a band-limited WAV file")]
struct Args {
    /// Raw register dump, 16 bytes per frame (omit for the demo)
    input: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long, default_value = "out.wav")]
    output: PathBuf,

    /// JSON synth configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames per second in the dump
    #[arg(short, long, default_value_t = DEMO_RATE)]
    rate: u32,

    /// Output sample rate, overriding the configuration
    #[arg(long)]
    sample_rate: Option<u64>,

    /// Spread the channels across a stereo field
    #[arg(long)]
    stereo: bool,
}

/// Arpeggio on A, an envelope bass on B, and a noise hat on C.
fn demo_frames(clock: u64) -> Vec<[u8; 16]> {
    const ARP: [f64; 4] = [69.0, 72.0, 76.0, 81.0];
    let count = DEMO_RATE as usize * DEMO_SECONDS;
    let bass = Freq::from_midi(45.0);
    let shape = EnvelopeShape::SawDown;
    let env = bass.env_period(clock, shape);
    let bass_tone = bass.tone_period(clock);
    let hat = Freq(8000.0).noise_period(clock);

    (0..count)
        .map(|i| {
            let lead = Freq::from_midi(ARP[(i / 3) % ARP.len()]).tone_period(clock);
            let mut frame = [0u8; 16];
            frame[0] = lead.lo();
            frame[1] = lead.hi();
            frame[2] = bass_tone.lo();
            frame[3] = bass_tone.hi();
            frame[6] = hat.lo();
            // Tone on A and B, noise on C.
            frame[7] = if i % 8 == 4 { 0x1C } else { 0x3C };
            frame[8] = 0x0C;
            frame[9] = 0x10;
            frame[10] = if i % 8 == 4 { 0x0A } else { 0x00 };
            frame[11] = env.lo();
            frame[12] = env.hi();
            frame[13] = if i == 0 { shape.code() } else { ENVELOPE_NO_WRITE };
            frame
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SynthConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SynthConfig::default(),
    };
    if let Some(rate) = args.sample_rate {
        config.output_rate = rate;
    }
    config.stereo |= args.stereo;
    config.validate()?;

    let frames = match &args.input {
        Some(path) => regdump::load(path)
            .with_context(|| format!("reading register dump {}", path.display()))?,
        None => demo_frames(config.nominal_clock),
    };
    let rate = RefreshRate::new(args.rate as u64, 1)?;

    let sample_rate = u32::try_from(config.output_rate).context("sample rate out of range")?;
    let sink = WavSink::create(&args.output, sample_rate, config.output_channels() as u16)?;
    let mut synth = Synth::new(&config, sink)?;

    tracing::info!(
        frames = frames.len(),
        rate = args.rate,
        output = %args.output.display(),
        "rendering"
    );
    let written = synth.play_frames(&frames, rate)?;
    synth.flush()?;
    synth.into_sink().finalize()?;

    println!(
        "Wrote {} samples ({:.2} s) to {}",
        written,
        written as f64 / config.output_rate as f64,
        args.output.display()
    );
    Ok(())
}
