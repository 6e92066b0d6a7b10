//! Precomputed oscillator waveforms
//!
//! Tone, noise and every envelope shape are encoded once as [`DiffRing`]s and
//! shared by all oscillators for the life of the process.

use std::fmt;
use std::sync::OnceLock;

use crate::buf::DiffRing;
use crate::dac::{amplitude, level_of};
use crate::lfsr::Lfsr;

/// Number of levels in one envelope ramp.
pub const ENVELOPE_STEPS: usize = 32;

static TONE: OnceLock<DiffRing> = OnceLock::new();
static NOISE: OnceLock<DiffRing> = OnceLock::new();
static ENVELOPES: OnceLock<Vec<DiffRing>> = OnceLock::new();

/// Square wave, high first.
pub fn tone() -> &'static DiffRing {
    TONE.get_or_init(|| DiffRing::new(&[1, 0], 0))
}

/// One full period of the chip's noise LFSR.
pub fn noise() -> &'static DiffRing {
    NOISE.get_or_init(|| DiffRing::new(&Lfsr::ym2149().sequence(), 0))
}

/// Envelope Shape Control - Register R13
///
/// The 16 hardware codes collapse onto 8 distinct waveforms. Code `0x10`
/// selects a sine-like ramp that the chip itself cannot produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeShape {
    /// 1000: falling saw, repeating
    SawDown = 0x08,
    /// 1001 (and 0000-0011): fall once, then silence
    DecayLow = 0x09,
    /// 1010: triangle starting high
    TriangleDown = 0x0A,
    /// 1011: fall once, then hold at maximum
    DecayHigh = 0x0B,
    /// 1100: rising saw, repeating
    SawUp = 0x0C,
    /// 1101: rise once, then hold at maximum
    AttackHigh = 0x0D,
    /// 1110: triangle starting low
    TriangleUp = 0x0E,
    /// 1111 (and 0100-0111): rise once, then silence
    AttackLow = 0x0F,
    /// 10000: sine-like ramp, repeating
    Sine = 0x10,
}

impl EnvelopeShape {
    const ALL: [EnvelopeShape; 9] = [
        EnvelopeShape::SawDown,
        EnvelopeShape::DecayLow,
        EnvelopeShape::TriangleDown,
        EnvelopeShape::DecayHigh,
        EnvelopeShape::SawUp,
        EnvelopeShape::AttackHigh,
        EnvelopeShape::TriangleUp,
        EnvelopeShape::AttackLow,
        EnvelopeShape::Sine,
    ];

    /// Create from raw register value (5 bits honoured).
    pub fn from_value(val: u8) -> Self {
        if val & 0x10 != 0 {
            return EnvelopeShape::Sine;
        }
        match val & 0x0F {
            0x00..=0x03 => EnvelopeShape::DecayLow,
            0x04..=0x07 => EnvelopeShape::AttackLow,
            0x08 => EnvelopeShape::SawDown,
            0x09 => EnvelopeShape::DecayLow,
            0x0A => EnvelopeShape::TriangleDown,
            0x0B => EnvelopeShape::DecayHigh,
            0x0C => EnvelopeShape::SawUp,
            0x0D => EnvelopeShape::AttackHigh,
            0x0E => EnvelopeShape::TriangleUp,
            _ => EnvelopeShape::AttackLow,
        }
    }

    /// Canonical register code.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Whether one cycle of this shape spans two ramps.
    pub fn is_triangle(&self) -> bool {
        matches!(self, EnvelopeShape::TriangleDown | EnvelopeShape::TriangleUp)
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    /// Encoded waveform for this shape.
    pub fn ring(&self) -> &'static DiffRing {
        &ENVELOPES.get_or_init(build_envelopes)[self.index()]
    }

    fn build(&self) -> DiffRing {
        let up: Vec<u8> = (0..ENVELOPE_STEPS as u8).collect();
        let down: Vec<u8> = up.iter().rev().copied().collect();
        let hold_after = |ramp: &[u8], level: u8| {
            let mut levels = ramp.to_vec();
            levels.push(level);
            DiffRing::new(&levels, ramp.len())
        };
        match self {
            EnvelopeShape::SawDown => DiffRing::new(&down, 0),
            EnvelopeShape::SawUp => DiffRing::new(&up, 0),
            EnvelopeShape::TriangleDown => DiffRing::new(&[&down[..], &up[..]].concat(), 0),
            EnvelopeShape::TriangleUp => DiffRing::new(&[&up[..], &down[..]].concat(), 0),
            EnvelopeShape::DecayLow => hold_after(&down, 0),
            EnvelopeShape::DecayHigh => hold_after(&down, 31),
            EnvelopeShape::AttackLow => hold_after(&up, 0),
            EnvelopeShape::AttackHigh => hold_after(&up, 31),
            EnvelopeShape::Sine => DiffRing::new(&sine_levels(), 0),
        }
    }
}

impl fmt::Display for EnvelopeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeShape::SawDown => write!(f, "Sawtooth-Down"),
            EnvelopeShape::DecayLow => write!(f, "Decay-Hold-Low"),
            EnvelopeShape::TriangleDown => write!(f, "Triangle (down first)"),
            EnvelopeShape::DecayHigh => write!(f, "Decay-Hold-High"),
            EnvelopeShape::SawUp => write!(f, "Sawtooth-Up"),
            EnvelopeShape::AttackHigh => write!(f, "Attack-Hold-High"),
            EnvelopeShape::TriangleUp => write!(f, "Triangle (up first)"),
            EnvelopeShape::AttackLow => write!(f, "Attack-Hold-Low"),
            EnvelopeShape::Sine => write!(f, "Sine"),
        }
    }
}

fn build_envelopes() -> Vec<DiffRing> {
    EnvelopeShape::ALL.iter().map(|s| s.build()).collect()
}

/// One sinusoid over 32 steps, quantized through the level curve.
fn sine_levels() -> Vec<u8> {
    let min_amp = amplitude(0.0);
    (0..ENVELOPE_STEPS)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / ENVELOPE_STEPS as f64;
            let amp = min_amp + (1.0 - min_amp) * (phase.sin() + 1.0) / 2.0;
            level_of(amp).round().clamp(0.0, 31.0) as u8
        })
        .collect()
}
