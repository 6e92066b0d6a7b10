//! Synth configuration
//!
//! All construction-time parameters in one serde-loadable struct. Nothing here
//! can change once a [`crate::Synth`] is built.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, SynthError};

/// Atari ST YM2149 master clock.
pub const DEFAULT_NOMINAL_CLOCK: u64 = 2_000_000;
/// Default output sample rate (44.1 kHz).
pub const DEFAULT_OUTPUT_RATE: u64 = 44_100;

/// Construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Chip master clock in Hz.
    pub nominal_clock: u64,
    /// Host output rate in Hz.
    pub output_rate: u64,
    /// Divides the naive rate; must divide 16 leaving an even scale.
    pub underclock: u32,
    /// log2 of the output's peak-to-peak range (16 matches i16 PCM).
    pub log2_max_peak_to_peak: f64,
    /// Two output channels with the chip channels spread across them.
    pub stereo: bool,
    /// Outermost channel position, 0 (mono) to 1 (hard left/right).
    pub max_pan: f64,
    /// Pan law in dB (3 is constant power).
    pub pan_law: f64,
    /// Cap on minBLEP sub-sample phases.
    pub minblep_max_scale: usize,
    /// Fewest blocks per second when the sink has no fixed buffer size.
    pub min_block_rate: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            nominal_clock: DEFAULT_NOMINAL_CLOCK,
            output_rate: DEFAULT_OUTPUT_RATE,
            underclock: 1,
            log2_max_peak_to_peak: 16.0,
            stereo: false,
            max_pan: 0.75,
            pan_law: 3.0,
            minblep_max_scale: 500,
            min_block_rate: 100,
        }
    }
}

impl SynthConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: SynthConfig = serde_json::from_str(text)
            .map_err(|e| SynthError::ConfigError(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SynthError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Check every field and the relationships between them.
    pub fn validate(&self) -> Result<()> {
        if self.nominal_clock == 0 || self.output_rate == 0 {
            return Err(SynthError::ConfigError(
                "clock and output rate must be positive".into(),
            ));
        }
        if self.underclock == 0 || 16 % self.underclock != 0 || (16 / self.underclock) % 2 != 0 {
            return Err(SynthError::ConfigError(format!(
                "underclock {} must divide 16 and leave an even scale",
                self.underclock
            )));
        }
        if self.nominal_clock % self.underclock as u64 != 0 {
            return Err(SynthError::ConfigError(format!(
                "clock {} is not divisible by underclock {}",
                self.nominal_clock, self.underclock
            )));
        }
        if self.output_rate > self.naive_rate() {
            return Err(SynthError::ConfigError(format!(
                "output rate {} exceeds naive rate {}",
                self.output_rate,
                self.naive_rate()
            )));
        }
        if !(0.0..=1.0).contains(&self.max_pan) {
            return Err(SynthError::ConfigError(format!(
                "max_pan {} must lie in [0, 1]",
                self.max_pan
            )));
        }
        if !(self.pan_law.is_finite() && self.pan_law > 0.0) {
            return Err(SynthError::ConfigError(format!(
                "pan_law {} must be positive",
                self.pan_law
            )));
        }
        if !self.log2_max_peak_to_peak.is_finite() {
            return Err(SynthError::ConfigError(
                "log2_max_peak_to_peak must be finite".into(),
            ));
        }
        if self.minblep_max_scale == 0 || self.min_block_rate == 0 {
            return Err(SynthError::ConfigError(
                "minblep_max_scale and min_block_rate must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Naive frames per 16 master clocks.
    pub fn scale(&self) -> u32 {
        16 / self.underclock.max(1)
    }

    /// Naive frames per second.
    pub fn naive_rate(&self) -> u64 {
        self.nominal_clock * self.scale() as u64 / 16
    }

    /// Number of interleaved output channels.
    pub fn output_channels(&self) -> usize {
        if self.stereo {
            2
        } else {
            1
        }
    }
}
