//! YM2149 node graph
//!
//! Wires the register bank to the synthesis nodes:
//!
//! ```text
//! tone[c] ──┐
//!           ├─ binmix[c] ─┐
//! noise ────┘             ├─ level[c] ── dac[c]
//! env ────────────────────┤
//! rtone[c] (timer synth) ─┘
//! ```
//!
//! Noise and envelope are shared by all three channels and evaluated once per
//! block thanks to node caching.

use std::sync::Arc;

use parking_lot::Mutex;

use super::registers::{Register, Registers, NUM_CHANNELS};
use crate::dac::{DacNode, LevelNode};
use crate::mfp::MFP_CLOCK;
use crate::mix::BinMix;
use crate::node::{shared, upstream, BufNode, Upstream};
use crate::osc::{EnvOsc, NoiseOsc, RToneOsc, ToneOsc};

/// Register value in a frame dump meaning "leave the envelope shape alone".
pub const ENVELOPE_NO_WRITE: u8 = 0xFF;

/// The chip: registers plus one signal chain per channel.
pub struct Ym2149 {
    regs: Registers,
    scale: u32,
    noise: Arc<Mutex<BufNode<NoiseOsc>>>,
    env: Arc<Mutex<BufNode<EnvOsc>>>,
    levels: Vec<Upstream<u8>>,
    dacs: Vec<Upstream<f32>>,
}

impl Ym2149 {
    /// Build the graph. `scale` is naive frames per 16 master clocks, so 16
    /// when the naive rate equals the master clock.
    pub fn new(scale: u32, naive_rate: u64, log2_max_peak_to_peak: f64) -> Self {
        let regs = Registers::new();
        let noise = shared(NoiseOsc::new(regs.noise_period.clone(), scale));
        let env = shared(EnvOsc::new(
            regs.env_period.clone(),
            regs.env_shape.clone(),
            scale,
        ));

        let mut levels = Vec::with_capacity(NUM_CHANNELS);
        let mut dacs = Vec::with_capacity(NUM_CHANNELS);
        for c in 0..NUM_CHANNELS {
            let tone = shared(ToneOsc::new(regs.tone_period[c].clone(), scale));
            let binmix = shared(BinMix::new(
                upstream(&tone),
                upstream(&noise),
                regs.tone_flag[c].clone(),
                regs.noise_flag[c].clone(),
            ));
            let rtone = shared(RToneOsc::new(regs.timers[c].ticks(), naive_rate, MFP_CLOCK));
            let level = shared(
                LevelNode::new(
                    regs.level_mode[c].clone(),
                    regs.fixed_level[c].clone(),
                    upstream(&env),
                    upstream(&binmix),
                )
                .with_timer_gate(regs.timer_synth[c].clone(), upstream(&rtone)),
            );
            let dac = shared(DacNode::new(
                upstream(&level),
                log2_max_peak_to_peak,
                NUM_CHANNELS,
            ));
            levels.push(upstream(&level));
            dacs.push(upstream(&dac));
        }

        Ym2149 {
            regs,
            scale,
            noise,
            env,
            levels,
            dacs,
        }
    }

    /// Register bank.
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Naive frames per 16 master clocks.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Write a register.
    pub fn set(&self, reg: Register, value: u8) {
        self.regs.write(reg, value);
    }

    /// Write a register by address.
    pub fn write_register(&self, addr: u8, value: u8) {
        self.regs.write(Register::from_addr(addr), value);
    }

    /// Apply one frame of R0-R15. An R13 of `0xFF` leaves the envelope running.
    pub fn update(&self, frame: &[u8; 16]) {
        for (addr, &value) in frame.iter().enumerate() {
            let reg = Register::from_addr(addr as u8);
            if reg == Register::EnvelopeShape && value == ENVELOPE_NO_WRITE {
                continue;
            }
            self.regs.write(reg, value);
        }
    }

    /// Silence a channel: tone and noise off, fixed level 0, no envelope or timer.
    pub fn flags_off(&self, chan: usize) {
        let c = chan % NUM_CHANNELS;
        self.regs.tone_flag[c].set(false);
        self.regs.noise_flag[c].set(false);
        self.regs.level_mode[c].set(false);
        self.regs.fixed_level[c].set(0);
        self.regs.timer_synth[c].set(false);
    }

    /// Route an MFP timer square wave onto a channel's level.
    pub fn set_timer_synth(&self, chan: usize, tcr: u8, tdr: u8) {
        let c = chan % NUM_CHANNELS;
        self.regs.timers[c].update(tcr, tdr);
        self.regs.timer_synth[c].set(tcr != 0);
    }

    /// Per-channel DAC outputs.
    pub fn dacs(&self) -> &[Upstream<f32>] {
        &self.dacs
    }

    /// Per-channel 5-bit levels.
    pub fn levels(&self) -> &[Upstream<u8>] {
        &self.levels
    }

    /// How many blocks the shared noise generator has actually produced.
    pub fn noise_productions(&self) -> u64 {
        self.noise.lock().productions()
    }

    /// How many blocks the shared envelope has actually produced.
    pub fn envelope_productions(&self) -> u64 {
        self.env.lock().productions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{pull_with, Block};

    fn levels(chip: &Ym2149, chan: usize, block: &Block) -> Vec<u8> {
        pull_with(&chip.levels()[chan], block, |l| l.to_vec())
    }

    #[test]
    fn test_fixed_level_without_sources() {
        let chip = Ym2149::new(16, 2_000_000, 16.0);
        chip.set(Register::LevelA, 0x0F);
        let out = levels(&chip, 0, &Block::new(10));
        assert_eq!(out, vec![31; 10], "mixer off means constant level");
    }

    #[test]
    fn test_tone_on_channel() {
        let chip = Ym2149::new(16, 2_000_000, 16.0);
        chip.set(Register::ToneALo, 1);
        chip.set(Register::MixerCtrl, 0x3E);
        chip.set(Register::LevelA, 0x0F);
        let out = levels(&chip, 0, &Block::new(32));
        assert_eq!(&out[..8], &[31; 8]);
        assert_eq!(&out[8..16], &[0; 8]);
        assert_eq!(&out[16..24], &[31; 8]);
    }

    #[test]
    fn test_shared_noise_evaluated_once() {
        let chip = Ym2149::new(16, 2_000_000, 16.0);
        chip.set(Register::NoisePeriod, 1);
        chip.set(Register::MixerCtrl, 0x07);
        let block = Block::new(64);
        for c in 0..3 {
            levels(&chip, c, &block);
        }
        assert_eq!(chip.noise_productions(), 1);
    }

    #[test]
    fn test_update_skips_envelope_sentinel() {
        let chip = Ym2149::new(16, 2_000_000, 16.0);
        let mut frame = [0u8; 16];
        frame[13] = 0x0C;
        chip.update(&frame);
        let version = chip.registers().raw[13].version();
        frame[13] = ENVELOPE_NO_WRITE;
        chip.update(&frame);
        assert_eq!(chip.registers().raw[13].version(), version);
        assert_eq!(chip.registers().read(Register::EnvelopeShape), 0x0C);
    }

    #[test]
    fn test_flags_off_silences_until_rewritten() {
        let chip = Ym2149::new(16, 2_000_000, 16.0);
        chip.set(Register::LevelB, 0x0F);
        chip.flags_off(1);
        assert_eq!(levels(&chip, 1, &Block::new(4)), vec![1; 4]);
        chip.set(Register::LevelB, 0x0F);
        assert_eq!(levels(&chip, 1, &Block::new(4)), vec![31; 4]);
    }

    #[test]
    fn test_timer_synth_gates_level() {
        let chip = Ym2149::new(16, 2_000_000, 16.0);
        chip.set(Register::LevelC, 0x0F);
        // 4 * 96 ticks at 2.4576 MHz is exactly 312.5 naive frames at 2 MHz.
        chip.set_timer_synth(2, 1, 96);
        let out = levels(&chip, 2, &Block::new(700));
        assert_eq!(out[0], 31);
        assert_eq!(out[312], 31);
        assert_eq!(out[313], 0);
        assert_eq!(out[624], 0);
        assert_eq!(out[625], 31);
    }
}
