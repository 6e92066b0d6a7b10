//! Band-limited YM2149 / AY-3-8910 synthesis
//!
//! Models the Yamaha YM2149 Programmable Sound Generator as a dataflow graph of
//! small nodes evaluated one block of naive (chip-rate) frames at a time. Every
//! edge the chip produces is mixed into the host-rate output as a minimum-phase
//! band-limited step, so the result is alias free without oversampling.
//!
//! # Features
//! - Versioned registers with derived views; nodes see writes at block boundaries
//! - Tone, noise, envelope and MFP timer oscillators with exact phase carry
//! - Per-block memoization so shared generators run once per block
//! - Logarithmic DAC and mono or panned stereo mixing
//! - Exact block scheduling at any rational refresh rate
//! - WAV, in-memory and ring-buffer sinks
//!
//! # Crate feature flags
//! - `streaming` (default): ring-buffer sink for real-time consumers (`streaming`)
//!
//! # Quick start
//! ```no_run
//! use ym2149_synth::{MemorySink, Register, Synth, SynthConfig};
//!
//! let config = SynthConfig::default();
//! let mut synth = Synth::new(&config, MemorySink::new(1)).unwrap();
//! synth.chip().set(Register::ToneALo, 0x1C);
//! synth.chip().set(Register::ToneAHi, 0x01);
//! synth.chip().set(Register::MixerCtrl, 0x3E);
//! synth.chip().set(Register::LevelA, 0x0F);
//! for _ in 0..50 {
//!     synth.run_period(50.into()).unwrap();
//! }
//! let samples = &synth.sink().samples;
//! ```

#![warn(missing_docs)]

pub mod buf; // Diff rings and slice kernels
pub mod config; // Construction parameters
pub mod dac; // Levels and the logarithmic DAC
pub mod lfsr; // Noise shift register
pub mod mfp; // MFP 68901 timers
pub mod minblep; // Band-limited steps
pub mod mix; // Binary and analogue mixing
pub mod node; // Block-memoized dataflow nodes
pub mod osc; // Oscillators
pub mod out; // Output stage and sinks
pub mod pitch; // Frequency helpers
pub mod reg; // Versioned registers
pub mod regdump; // Raw register frame dumps
pub mod shapes; // Waveform tables
#[cfg(feature = "streaming")]
pub mod streaming; // Ring-buffer output
pub mod synth; // Top-level engine
pub mod timer; // Block scheduling
pub mod ym2149; // Chip model

/// Error types for synthesis operations
#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    /// Invalid construction parameter
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// Real-time output error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Malformed input data
    #[error("Parse error: {0}")]
    ParseError(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for SynthError {
    /// Falls back to `Other`; prefer a specific variant where one applies.
    fn from(msg: String) -> Self {
        SynthError::Other(msg)
    }
}

impl From<&str> for SynthError {
    fn from(msg: &str) -> Self {
        SynthError::Other(msg.to_string())
    }
}

/// Result type for synthesis operations
pub type Result<T> = std::result::Result<T, SynthError>;

// Public API exports
pub use config::SynthConfig;
pub use minblep::MinBleps;
pub use node::Block;
pub use out::{AudioSink, MemorySink, Stream, WavSink};
pub use pitch::{Freq, Period, Pitch};
pub use reg::{DerivedReg, Readable, Reg, Versioned};
pub use shapes::EnvelopeShape;
#[cfg(feature = "streaming")]
pub use streaming::{RingBuffer, RingSink, StreamConfig};
pub use synth::{SharedSynth, Synth};
pub use timer::{MinBlockRateTimer, RefreshRate, SimpleTimer, SyncTimer, Timer};
pub use ym2149::{Register, Ym2149};
