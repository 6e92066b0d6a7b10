//! Mixers
//!
//! Two kinds of mixing happen in the graph:
//! - [`BinMix`] is the chip's R7 logic, combining tone and noise per channel
//! - [`IdealMixer`] sums the channel DAC outputs into one analog signal
//!
//! For stereo output one [`IdealMixer`] is built per output channel, each with
//! its own per-channel gains from [`stereo_gains`].

use crate::buf::and_into;
use crate::node::{pull_into, pull_with, Block, Produce, Upstream};
use crate::reg::Readable;

/// Binary tone/noise mix for one channel.
///
/// Both flags set: AND of the two signals. One flag set: that signal. Neither:
/// constant 1, which lets a fixed level act as a DC offset (digi-drums).
pub struct BinMix {
    tone: Upstream<u8>,
    noise: Upstream<u8>,
    tone_flag: Box<dyn Readable<bool>>,
    noise_flag: Box<dyn Readable<bool>>,
    scratch: Vec<u8>,
}

impl BinMix {
    /// Mix over the channel's tone, the shared noise and the R7 enable flags.
    pub fn new(
        tone: Upstream<u8>,
        noise: Upstream<u8>,
        tone_flag: impl Readable<bool> + 'static,
        noise_flag: impl Readable<bool> + 'static,
    ) -> Self {
        BinMix {
            tone,
            noise,
            tone_flag: Box::new(tone_flag),
            noise_flag: Box::new(noise_flag),
            scratch: Vec::new(),
        }
    }
}

impl Produce for BinMix {
    type Sample = u8;

    fn produce(&mut self, block: &Block, out: &mut [u8]) {
        match (self.tone_flag.value(), self.noise_flag.value()) {
            (true, true) => {
                self.scratch.resize(out.len(), 0);
                pull_into(&self.tone, block, &mut self.scratch);
                let tone = &self.scratch;
                pull_with(&self.noise, block, |noise| and_into(tone, noise, out));
            }
            (true, false) => pull_into(&self.tone, block, out),
            (false, true) => pull_into(&self.noise, block, out),
            (false, false) => out.fill(1),
        }
    }
}

/// Analog sum of channel DAC outputs.
///
/// The output starts at a datum half way down the peak-to-peak range and each
/// channel is subtracted, scaled by its gain.
pub struct IdealMixer {
    datum: f32,
    inputs: Vec<(Upstream<f32>, f32)>,
    unity: bool,
    scratch: Vec<f32>,
}

impl IdealMixer {
    /// Mixer over `(dac, gain)` pairs.
    pub fn new(inputs: Vec<(Upstream<f32>, f32)>, log2_max_peak_to_peak: f64) -> Self {
        let unity = inputs.iter().all(|&(_, gain)| gain == 1.0);
        if unity {
            tracing::debug!(channels = inputs.len(), "mixer gains are all unity");
        }
        IdealMixer {
            datum: 2f64.powf(log2_max_peak_to_peak - 1.5) as f32,
            inputs,
            unity,
            scratch: Vec::new(),
        }
    }

    /// Reference level the channels are subtracted from.
    pub fn datum(&self) -> f32 {
        self.datum
    }
}

impl Produce for IdealMixer {
    type Sample = f32;

    fn produce(&mut self, block: &Block, out: &mut [f32]) {
        out.fill(self.datum);
        for (dac, gain) in &self.inputs {
            let gain = *gain;
            if gain == 0.0 {
                continue;
            }
            if self.unity {
                pull_with(dac, block, |buf| {
                    out.iter_mut().zip(buf).for_each(|(o, &v)| *o -= v)
                });
            } else {
                self.scratch.resize(out.len(), 0.0);
                pull_into(dac, block, &mut self.scratch);
                out.iter_mut()
                    .zip(&self.scratch)
                    .for_each(|(o, &v)| *o -= gain * v);
            }
        }
    }
}

/// Per-channel `(left, right)` gains for `n` channels spread across `max_pan`.
///
/// Channel `i` sits at `(2i - (n-1)) / (n-1) * max_pan` and each side is
/// weighted by `((1 -/+ loc) / 2)^(pan_law / 6)`, so a 3 dB law keeps power
/// constant across the field.
pub fn stereo_gains(n: usize, max_pan: f64, pan_law: f64) -> Vec<(f32, f32)> {
    let exponent = pan_law / 6.0;
    (0..n)
        .map(|i| {
            let loc = if n > 1 {
                (2.0 * i as f64 - (n - 1) as f64) / (n - 1) as f64 * max_pan
            } else {
                0.0
            };
            let left = ((1.0 - loc) / 2.0).powf(exponent);
            let right = ((1.0 + loc) / 2.0).powf(exponent);
            (left as f32, right as f32)
        })
        .collect()
}
