//! Level and DAC stages
//!
//! The chip's volume is logarithmic: each 5-bit level step is 1.5 dB, so
//! `amplitude(level) = 2^((level - 31) / 4)`. Fixed 4-bit volumes are promoted
//! to 5-bit as `level * 2 + 1`, which means 4-bit 0 is not silent.

use crate::buf::{map_into, mul_assign};
use crate::node::{pull_into, pull_with, Block, Produce, Upstream};
use crate::reg::Readable;

/// Highest 5-bit level.
pub const MAX_LEVEL: u8 = 31;

/// Amplitude (0, 1] for a 5-bit level.
pub fn amplitude(level: f64) -> f64 {
    2f64.powf((level - MAX_LEVEL as f64) / 4.0)
}

/// Inverse of [`amplitude`]. Only used to build tables.
pub fn level_of(amplitude: f64) -> f64 {
    MAX_LEVEL as f64 + 4.0 * amplitude.log2()
}

/// Promote a 4-bit fixed volume to the 5-bit scale.
#[inline]
pub fn promote_fixed(level4: u8) -> u8 {
    (level4 & 0x0f) * 2 + 1
}

/// Per-channel 5-bit level: envelope or fixed volume, gated by the mixer signal.
pub struct LevelNode {
    mode: Box<dyn Readable<bool>>,
    fixed: Box<dyn Readable<u8>>,
    env: Upstream<u8>,
    binmix: Upstream<u8>,
    timer_gate: Option<(Box<dyn Readable<bool>>, Upstream<u8>)>,
    scratch: Vec<u8>,
}

impl LevelNode {
    /// Level stage; `mode` selects the envelope over the 4-bit `fixed` volume.
    pub fn new(
        mode: impl Readable<bool> + 'static,
        fixed: impl Readable<u8> + 'static,
        env: Upstream<u8>,
        binmix: Upstream<u8>,
    ) -> Self {
        LevelNode {
            mode: Box::new(mode),
            fixed: Box::new(fixed),
            env,
            binmix,
            timer_gate: None,
            scratch: Vec::new(),
        }
    }

    /// Additionally gate by `rtone` whenever `flag` is set.
    pub fn with_timer_gate(
        mut self,
        flag: impl Readable<bool> + 'static,
        rtone: Upstream<u8>,
    ) -> Self {
        self.timer_gate = Some((Box::new(flag), rtone));
        self
    }
}

impl Produce for LevelNode {
    type Sample = u8;

    fn produce(&mut self, block: &Block, out: &mut [u8]) {
        if self.mode.value() {
            pull_into(&self.env, block, out);
        } else {
            out.fill(promote_fixed(self.fixed.value()));
        }
        pull_with(&self.binmix, block, |mix| mul_assign(out, mix));
        if let Some((flag, rtone)) = &self.timer_gate {
            if flag.value() {
                self.scratch.resize(out.len(), 0);
                pull_into(rtone, block, &mut self.scratch);
                mul_assign(out, &self.scratch);
            }
        }
    }
}

/// Lookup from 5-bit level to output amplitude for one of `channels` channels.
pub fn dac_table(log2_max_peak_to_peak: f64, channels: usize) -> [f32; 32] {
    let unit = 2f64.powf(log2_max_peak_to_peak - 0.5) / channels.max(1) as f64;
    let mut table = [0f32; 32];
    for (level, v) in table.iter_mut().enumerate() {
        *v = (amplitude(level as f64) * unit) as f32;
    }
    table
}

/// Maps a level buffer through the DAC table.
pub struct DacNode {
    level: Upstream<u8>,
    table: [f32; 32],
}

impl DacNode {
    /// DAC over a level node.
    pub fn new(level: Upstream<u8>, log2_max_peak_to_peak: f64, channels: usize) -> Self {
        DacNode {
            level,
            table: dac_table(log2_max_peak_to_peak, channels),
        }
    }
}

impl Produce for DacNode {
    type Sample = f32;

    fn produce(&mut self, block: &Block, out: &mut [f32]) {
        let table = &self.table;
        pull_with(&self.level, block, |levels| map_into(levels, table, out));
    }
}
