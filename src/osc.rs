//! Oscillators
//!
//! Each oscillator walks a [`DiffRing`] at a step size derived from its period
//! register and writes the resulting (non-band-limited) level per naive frame.
//! Position is tracked as `progress`, the time since the last step, which is
//! carried across blocks so splitting a run into blocks never shifts an edge.
//!
//! Time is counted in integer units: one naive frame is `unit` units. For the
//! chip's own oscillators a unit is a frame; the MFP-driven timer tone uses the
//! MFP clock so that its fractional step sizes stay exact.

use crate::buf::{integrate, DiffRing, RingCursor};
use crate::node::{Block, Produce};
use crate::reg::Readable;
use crate::shapes::{self, EnvelopeShape};

/// Ring walker shared by all oscillators.
#[derive(Debug)]
pub struct DiffCore {
    ring: &'static DiffRing,
    cursor: RingCursor,
    dc: i16,
    progress: u64,
    unit: u64,
    diffs: Vec<i16>,
}

impl DiffCore {
    /// Core over `ring`, one frame being `unit` time units.
    pub fn new(ring: &'static DiffRing, unit: u64) -> Self {
        DiffCore {
            ring,
            cursor: RingCursor::new(),
            dc: 0,
            progress: 0,
            unit: unit.max(1),
            diffs: Vec::new(),
        }
    }

    /// Restart at the beginning of `ring`, stepping at the next frame.
    pub fn reset(&mut self, ring: &'static DiffRing) {
        self.ring = ring;
        self.cursor = RingCursor::new();
        self.progress = 0;
    }

    /// Level currently held.
    pub fn dc(&self) -> u8 {
        self.dc as u8
    }

    /// Units elapsed since the last step (0 means a step is due now).
    pub fn progress(&self) -> u64 {
        self.progress
    }

    /// Fill `out`, stepping every `step` units. `None` or zero holds the current level.
    pub fn run(&mut self, step: Option<u64>, out: &mut [u8]) {
        let n = out.len() as u64;
        if n == 0 {
            return;
        }
        let step = match step {
            Some(s) if s > 0 => s,
            _ => {
                out.fill(self.dc as u8);
                return;
            }
        };
        let unit = self.unit as i64;
        let span = n as i64 * unit;
        let last_frame = span - unit;
        // An edge due up to one frame ago is a sub-frame carry from the
        // previous block and keeps its exact time. Anything later than that
        // means the period shrank, which steps at frame 0.
        let mut pos = match self.progress as i64 - step as i64 {
            _ if self.progress == 0 => 0,
            overdue if overdue >= unit => 0,
            overdue => -overdue,
        };
        if pos > last_frame {
            self.progress += span as u64;
            out.fill(self.dc as u8);
            return;
        }
        self.diffs.clear();
        self.diffs.resize(out.len(), 0);
        let mut level = self.dc;
        let mut last = pos;
        while pos <= last_frame {
            let d = self.cursor.next_diff(self.ring, level);
            level += d;
            let index = if pos <= 0 { 0 } else { (pos as u64).div_ceil(self.unit) };
            self.diffs[index as usize] += d;
            last = pos;
            pos += step as i64;
        }
        self.progress = (span - last) as u64;
        self.dc = integrate(&self.diffs, self.dc, out);
        debug_assert_eq!(self.dc, level);
    }
}

/// Square wave with half-period `period * scale / 2` frames.
pub struct ToneOsc {
    core: DiffCore,
    period: Box<dyn Readable<u32>>,
    scale: u32,
}

impl ToneOsc {
    /// Tone oscillator reading its 12-bit period from `period`.
    pub fn new(period: impl Readable<u32> + 'static, scale: u32) -> Self {
        ToneOsc {
            core: DiffCore::new(shapes::tone(), 1),
            period: Box::new(period),
            scale,
        }
    }

    /// Frames between edges for the current period, `None` while held.
    pub fn step(&self) -> Option<u64> {
        match self.period.value() {
            0 => None,
            p => Some(p as u64 * self.scale as u64 / 2),
        }
    }
}

impl Produce for ToneOsc {
    type Sample = u8;

    fn produce(&mut self, _block: &Block, out: &mut [u8]) {
        let step = self.step();
        self.core.run(step, out);
    }
}

/// LFSR noise, one new bit every `period * scale` frames.
pub struct NoiseOsc {
    core: DiffCore,
    period: Box<dyn Readable<u32>>,
    scale: u32,
}

impl NoiseOsc {
    /// Noise oscillator reading its 5-bit period from `period`.
    pub fn new(period: impl Readable<u32> + 'static, scale: u32) -> Self {
        NoiseOsc {
            core: DiffCore::new(shapes::noise(), 1),
            period: Box::new(period),
            scale,
        }
    }
}

impl Produce for NoiseOsc {
    type Sample = u8;

    fn produce(&mut self, _block: &Block, out: &mut [u8]) {
        let step = match self.period.value() {
            0 => None,
            p => Some(p as u64 * self.scale as u64),
        };
        self.core.run(step, out);
    }
}

/// Envelope generator: 5-bit levels, one every `period * scale / 2` frames.
///
/// Any write to the shape register restarts the ramp from the new shape's
/// first level at the next block.
pub struct EnvOsc {
    core: DiffCore,
    period: Box<dyn Readable<u32>>,
    shape: Box<dyn Readable<u8>>,
    shape_version: u64,
    scale: u32,
}

impl EnvOsc {
    /// Envelope oscillator over the period and shape registers.
    pub fn new(
        period: impl Readable<u32> + 'static,
        shape: impl Readable<u8> + 'static,
        scale: u32,
    ) -> Self {
        let shape_version = shape.version();
        let ring = EnvelopeShape::from_value(shape.value()).ring();
        EnvOsc {
            core: DiffCore::new(ring, 1),
            period: Box::new(period),
            shape: Box::new(shape),
            shape_version,
            scale,
        }
    }
}

impl Produce for EnvOsc {
    type Sample = u8;

    fn produce(&mut self, _block: &Block, out: &mut [u8]) {
        let version = self.shape.version();
        if version != self.shape_version {
            self.shape_version = version;
            let shape = EnvelopeShape::from_value(self.shape.value());
            tracing::trace!(%shape, "envelope restart");
            self.core.reset(shape.ring());
        }
        let step = match self.period.value() {
            0 => None,
            p => Some(p as u64 * self.scale as u64 / 2),
        };
        self.core.run(step, out);
    }
}

/// Square wave clocked by an MFP timer.
///
/// The timer's step is given in MFP clock ticks (`prescaler * data`); one
/// naive frame is `mfp_clock` units and one step is `ticks * naive_rate`
/// units, so the edge positions are exact rationals.
pub struct RToneOsc {
    core: DiffCore,
    ticks: Box<dyn Readable<u32>>,
    naive_rate: u64,
}

impl RToneOsc {
    /// Timer tone over `ticks` (0 = timer stopped).
    pub fn new(ticks: impl Readable<u32> + 'static, naive_rate: u64, mfp_clock: u64) -> Self {
        RToneOsc {
            core: DiffCore::new(shapes::tone(), mfp_clock),
            ticks: Box::new(ticks),
            naive_rate,
        }
    }
}

impl Produce for RToneOsc {
    type Sample = u8;

    fn produce(&mut self, _block: &Block, out: &mut [u8]) {
        let step = match self.ticks.value() {
            0 => None,
            t => Some(t as u64 * self.naive_rate),
        };
        self.core.run(step, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lfsr::Lfsr;
    use crate::node::{BufNode, Evaluate};
    use crate::reg::Reg;

    fn run(node: &mut BufNode<impl Produce<Sample = u8>>, n: usize) -> Vec<u8> {
        node.evaluate(&Block::new(n)).to_vec()
    }

    fn expect(runs: &[(u8, usize)]) -> Vec<u8> {
        runs.iter()
            .flat_map(|&(v, n)| std::iter::repeat(v).take(n))
            .collect()
    }

    #[test]
    fn test_tone_whole_periods() {
        let mut tone = BufNode::new(ToneOsc::new(Reg::new(3u32), 16));
        assert_eq!(run(&mut tone, 96), expect(&[(1, 24), (0, 24), (1, 24), (0, 24)]));
    }

    #[test]
    fn test_tone_resumes_in_phase() {
        let mut tone = BufNode::new(ToneOsc::new(Reg::new(3u32), 16));
        assert_eq!(run(&mut tone, 25), expect(&[(1, 24), (0, 1)]));
        assert_eq!(tone.producer().core.progress(), 1);
        assert_eq!(run(&mut tone, 30), expect(&[(0, 23), (1, 7)]));
    }

    #[test]
    fn test_tone_zero_period_holds() {
        let period = Reg::new(3u32);
        let mut tone = BufNode::new(ToneOsc::new(period.clone(), 16));
        assert_eq!(run(&mut tone, 30), expect(&[(1, 24), (0, 6)]));
        period.set(0);
        assert_eq!(run(&mut tone, 100), vec![0; 100]);
        period.set(3);
        assert_eq!(run(&mut tone, 20), expect(&[(0, 18), (1, 2)]));
    }

    #[test]
    fn test_tone_shortened_period_steps_immediately() {
        let period = Reg::new(10u32);
        let mut tone = BufNode::new(ToneOsc::new(period.clone(), 16));
        assert_eq!(run(&mut tone, 50), vec![1; 50]);
        period.set(1);
        assert_eq!(run(&mut tone, 10), expect(&[(0, 8), (1, 2)]));
    }

    #[test]
    fn test_tone_split_invariance() {
        let mut whole = BufNode::new(ToneOsc::new(Reg::new(7u32), 16));
        let expected = run(&mut whole, 1000);
        let mut split = BufNode::new(ToneOsc::new(Reg::new(7u32), 16));
        let mut got = Vec::new();
        for n in [1, 55, 0, 56, 57, 300, 2, 529] {
            got.extend(run(&mut split, n));
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn test_noise_holds_each_bit() {
        let mut noise = BufNode::new(NoiseOsc::new(Reg::new(3u32), 16));
        let out = run(&mut noise, 48 * 40);
        let mut lfsr = Lfsr::ym2149();
        for chunk in out.chunks(48) {
            let bit = lfsr.next_bit();
            assert!(chunk.iter().all(|&b| b == bit), "bit must hold for 48 frames");
        }
    }

    #[test]
    fn test_envelope_saw_down_steps() {
        let mut env = BufNode::new(EnvOsc::new(Reg::new(1u32), Reg::new(0x08u8), 16));
        let out = run(&mut env, 8 * 33);
        assert!(out[..8].iter().all(|&l| l == 31));
        assert!(out[8..16].iter().all(|&l| l == 30));
        assert!(out[248..256].iter().all(|&l| l == 0));
        assert!(out[256..].iter().all(|&l| l == 31), "saw wraps to the top");
    }

    #[test]
    fn test_envelope_shape_write_restarts() {
        let shape = Reg::new(0x0Cu8);
        let mut env = BufNode::new(EnvOsc::new(Reg::new(1u32), shape.clone(), 16));
        let out = run(&mut env, 8 * 5 + 3);
        assert_eq!(out[out.len() - 1], 5);
        shape.set(0x0C);
        let out = run(&mut env, 9);
        assert_eq!(out[..8], [0; 8], "restart from the first level");
        assert_eq!(out[8], 1);
    }

    #[test]
    fn test_envelope_hold_keeps_level() {
        let mut env = BufNode::new(EnvOsc::new(Reg::new(1u32), Reg::new(0x0Du8), 16));
        let out = run(&mut env, 8 * 40);
        assert!(out[8 * 32..].iter().all(|&l| l == 31));
    }

    #[test]
    fn test_rtone_fractional_step() {
        // Half period of 2.5 frames: 5 ticks at a naive rate of 1 with a clock of 2.
        let mut rtone = BufNode::new(RToneOsc::new(Reg::new(5u32), 1, 2));
        let out = run(&mut rtone, 10);
        assert_eq!(out, vec![1, 1, 1, 0, 0, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_rtone_carries_fractional_edge_across_blocks() {
        let mut whole = BufNode::new(RToneOsc::new(Reg::new(5u32), 1, 2));
        let expected = run(&mut whole, 20);
        assert_eq!(expected, [1, 1, 1, 0, 0].repeat(4));

        let mut split = BufNode::new(RToneOsc::new(Reg::new(5u32), 1, 2));
        let mut got = run(&mut split, 3);
        got.extend(run(&mut split, 17));
        assert_eq!(got, expected);
    }

    #[test]
    fn test_rtone_split_invariance_over_many_blocks() {
        // 2457600 / 44100 ticks per frame, 96 ticks per step.
        let mut whole = BufNode::new(RToneOsc::new(Reg::new(96u32), 44_100, 2_457_600));
        let expected = run(&mut whole, 5000);
        let mut split = BufNode::new(RToneOsc::new(Reg::new(96u32), 44_100, 2_457_600));
        let mut got = Vec::new();
        for &n in [1, 2, 3, 7, 11, 13, 17, 19, 23, 29, 31, 37].iter().cycle().take(60) {
            got.extend(run(&mut split, n));
        }
        got.extend(run(&mut split, 5000 - got.len()));
        assert_eq!(got, expected);
    }

    #[test]
    fn test_rtone_shortened_step_restarts_at_frame_zero() {
        let ticks = Reg::new(20u32);
        let mut rtone = BufNode::new(RToneOsc::new(ticks.clone(), 1, 2));
        assert_eq!(run(&mut rtone, 8), vec![1; 8]);
        ticks.set(3);
        assert_eq!(run(&mut rtone, 4), vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_rtone_stopped_timer_holds() {
        let mut rtone = BufNode::new(RToneOsc::new(Reg::new(0u32), 1, 2));
        assert_eq!(run(&mut rtone, 4), vec![0; 4]);
    }
}
