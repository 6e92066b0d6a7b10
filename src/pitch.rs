//! Frequency and period conversions
//!
//! The chip divides its master clock by 16 for tone and noise, and by 256 per
//! envelope ramp (512 for a full triangle cycle).

use crate::shapes::EnvelopeShape;

/// Frequency of MIDI note 69 (A4).
pub const A4_FREQ: f64 = 440.0;
/// MIDI note number of A4.
pub const A4_MIDI: f64 = 69.0;

/// A frequency in Hz.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Freq(pub f64);

/// A (fractional) MIDI note number.
///
/// Displays as a fixed-width note label: name and octave padded with dots,
/// then the cents offset when it is at least 10, e.g. `A..4+12` or `C#.5   `.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pitch(pub f64);

/// A chip period register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(pub u32);

impl Freq {
    /// Equal-tempered frequency of a (fractional) MIDI note.
    pub fn from_midi(note: f64) -> Self {
        Freq(A4_FREQ * 2f64.powf((note - A4_MIDI) / 12.0))
    }

    /// MIDI note number of this frequency.
    pub fn to_midi(&self) -> f64 {
        A4_MIDI + 12.0 * (self.0 / A4_FREQ).log2()
    }

    /// This frequency as a MIDI pitch.
    pub fn pitch(&self) -> Pitch {
        Pitch(self.to_midi())
    }

    /// Nearest 12-bit tone period at `clock` Hz.
    pub fn tone_period(&self, clock: u64) -> Period {
        Period(Self::period(clock as f64 / (16.0 * self.0), 0x0fff))
    }

    /// Nearest 5-bit noise period at `clock` Hz.
    pub fn noise_period(&self, clock: u64) -> Period {
        Period(Self::period(clock as f64 / (16.0 * self.0), 0x1f))
    }

    /// Nearest 16-bit envelope period giving one `shape` cycle at this frequency.
    pub fn env_period(&self, clock: u64, shape: EnvelopeShape) -> Period {
        let steps = if shape.is_triangle() { 512.0 } else { 256.0 };
        Period(Self::period(clock as f64 / (steps * self.0), 0xffff))
    }

    fn period(ideal: f64, max: u32) -> u32 {
        if !ideal.is_finite() {
            return max;
        }
        (ideal.round() as u32).clamp(1, max)
    }
}

impl Pitch {
    const NAMES: [&'static str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];

    /// Equal-tempered frequency of this pitch.
    pub fn freq(&self) -> Freq {
        Freq::from_midi(self.0)
    }
}

impl std::fmt::Display for Pitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nearest = (self.0 - 0.5).ceil();
        let cents = ((self.0 - nearest) * 100.0).round() as i64;
        let nearest = nearest as i64;
        let name = Self::NAMES[nearest.rem_euclid(12) as usize];
        let octave = nearest.div_euclid(12) - 1;
        write!(f, "{name:.<2}{octave:.>2}")?;
        if cents.abs() < 10 {
            write!(f, "   ")
        } else {
            write!(f, "{cents:+}")
        }
    }
}

impl Period {
    /// Tone frequency at `clock` Hz, `None` for period 0.
    pub fn tone_freq(&self, clock: u64) -> Option<Freq> {
        (self.0 != 0).then(|| Freq(clock as f64 / (16.0 * self.0 as f64)))
    }

    /// Envelope cycle frequency at `clock` Hz, `None` for period 0.
    pub fn env_freq(&self, clock: u64, shape: EnvelopeShape) -> Option<Freq> {
        let steps = if shape.is_triangle() { 512.0 } else { 256.0 };
        (self.0 != 0).then(|| Freq(clock as f64 / (steps * self.0 as f64)))
    }

    /// Low byte of the period.
    pub fn lo(&self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// High byte of the period.
    pub fn hi(&self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }
}
