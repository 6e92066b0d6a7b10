//! YM2149 Register Definitions
//!
//! Defines the 16 registers (R0-R13, R14-R15 for I/O ports) that control the
//! PSG chip, and the [`Registers`] bank the synthesis graph reads them from.
//! Every raw register is a versioned [`Reg`]; the values the oscillators and
//! level stages need (12-bit periods, mixer flags, level modes) are
//! [`DerivedReg`]s over them.

use std::fmt;

use super::mixer::MixerFlags;
use crate::mfp::MfpTimer;
use crate::reg::{DerivedReg, Reg};

/// Number of tone channels
pub const NUM_CHANNELS: usize = 3;

/// YM2149 Register Address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Channel A Tone Period (low byte) - R0
    ToneALo = 0x00,
    /// Channel A Tone Period (high nibble) - R1
    ToneAHi = 0x01,
    /// Channel B Tone Period (low byte) - R2
    ToneBLo = 0x02,
    /// Channel B Tone Period (high nibble) - R3
    ToneBHi = 0x03,
    /// Channel C Tone Period (low byte) - R4
    ToneCLo = 0x04,
    /// Channel C Tone Period (high nibble) - R5
    ToneCHi = 0x05,
    /// Noise Period - R6
    NoisePeriod = 0x06,
    /// Mixer Control - R7
    MixerCtrl = 0x07,
    /// Channel A Level - R8
    LevelA = 0x08,
    /// Channel B Level - R9
    LevelB = 0x09,
    /// Channel C Level - R10
    LevelC = 0x0A,
    /// Envelope Period (low byte) - R11
    EnvelopeLo = 0x0B,
    /// Envelope Period (high byte) - R12
    EnvelopeHi = 0x0C,
    /// Envelope Shape - R13
    EnvelopeShape = 0x0D,
    /// I/O Port A - R14
    PortA = 0x0E,
    /// I/O Port B - R15
    PortB = 0x0F,
}

impl Register {
    const ALL: [Register; 16] = [
        Register::ToneALo,
        Register::ToneAHi,
        Register::ToneBLo,
        Register::ToneBHi,
        Register::ToneCLo,
        Register::ToneCHi,
        Register::NoisePeriod,
        Register::MixerCtrl,
        Register::LevelA,
        Register::LevelB,
        Register::LevelC,
        Register::EnvelopeLo,
        Register::EnvelopeHi,
        Register::EnvelopeShape,
        Register::PortA,
        Register::PortB,
    ];

    /// Convert a raw register number to the enum (upper bits ignored).
    pub fn from_addr(addr: u8) -> Self {
        Self::ALL[(addr & 0x0F) as usize]
    }

    /// Register address.
    pub fn addr(&self) -> u8 {
        *self as u8
    }

    /// Low period byte for a channel's tone.
    pub fn tone_lo(chan: usize) -> Self {
        Self::ALL[(chan % NUM_CHANNELS) * 2]
    }

    /// Level register for a channel.
    pub fn level(chan: usize) -> Self {
        Self::ALL[0x08 + chan % NUM_CHANNELS]
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::ToneALo => "Channel A Tone Low",
            Register::ToneAHi => "Channel A Tone High",
            Register::ToneBLo => "Channel B Tone Low",
            Register::ToneBHi => "Channel B Tone High",
            Register::ToneCLo => "Channel C Tone Low",
            Register::ToneCHi => "Channel C Tone High",
            Register::NoisePeriod => "Noise Period",
            Register::MixerCtrl => "Mixer Control",
            Register::LevelA => "Channel A Level",
            Register::LevelB => "Channel B Level",
            Register::LevelC => "Channel C Level",
            Register::EnvelopeLo => "Envelope Period Low",
            Register::EnvelopeHi => "Envelope Period High",
            Register::EnvelopeShape => "Envelope Shape",
            Register::PortA => "I/O Port A",
            Register::PortB => "I/O Port B",
        };
        write!(f, "R{} ({})", self.addr(), name)
    }
}

/// Register bank plus the derived views the synth graph consumes.
#[derive(Clone)]
pub struct Registers {
    /// Raw registers R0-R15.
    pub raw: [Reg<u8>; 16],
    /// 12-bit tone periods per channel.
    pub tone_period: [DerivedReg<u32>; NUM_CHANNELS],
    /// 5-bit noise period.
    pub noise_period: DerivedReg<u32>,
    /// Tone enabled per channel (R7 bit clear).
    pub tone_flag: [DerivedReg<bool>; NUM_CHANNELS],
    /// Noise enabled per channel (R7 bit clear).
    pub noise_flag: [DerivedReg<bool>; NUM_CHANNELS],
    /// 4-bit fixed level per channel.
    pub fixed_level: [DerivedReg<u8>; NUM_CHANNELS],
    /// Envelope drives the level (bit 4 of R8-R10).
    pub level_mode: [DerivedReg<bool>; NUM_CHANNELS],
    /// 16-bit envelope period.
    pub env_period: DerivedReg<u32>,
    /// Envelope shape, 5 bits honoured.
    pub env_shape: DerivedReg<u8>,
    /// Timer-synth gate enable per channel.
    pub timer_synth: [Reg<bool>; NUM_CHANNELS],
    /// MFP timer per channel.
    pub timers: [MfpTimer; NUM_CHANNELS],
}

impl Registers {
    /// Fresh bank, all zero. Mixer register starts with everything off.
    pub fn new() -> Self {
        let raw: [Reg<u8>; 16] = std::array::from_fn(|_| Reg::new(0));
        raw[Register::MixerCtrl.addr() as usize].set(0x3F);

        let tone_period = std::array::from_fn(|c| {
            let lo = &raw[Register::tone_lo(c).addr() as usize];
            let hi = &raw[Register::tone_lo(c).addr() as usize + 1];
            DerivedReg::map2(lo, hi, |lo: u8, hi: u8| ((hi as u32 & 0x0f) << 8) | lo as u32)
        });
        let noise_period = DerivedReg::map(&raw[Register::NoisePeriod.addr() as usize], |v: u8| {
            (v & 0x1f) as u32
        });
        let mixer = &raw[Register::MixerCtrl.addr() as usize];
        let tone_flag = std::array::from_fn(|c| {
            DerivedReg::map(mixer, move |v: u8| MixerFlags::from_register(v).tone_enabled(c))
        });
        let noise_flag = std::array::from_fn(|c| {
            DerivedReg::map(mixer, move |v: u8| MixerFlags::from_register(v).noise_enabled(c))
        });
        let fixed_level = std::array::from_fn(|c| {
            DerivedReg::map(&raw[Register::level(c).addr() as usize], |v: u8| v & 0x0f)
        });
        let level_mode = std::array::from_fn(|c| {
            DerivedReg::map(&raw[Register::level(c).addr() as usize], |v: u8| v & 0x10 != 0)
        });
        let env_period = DerivedReg::map2(
            &raw[Register::EnvelopeLo.addr() as usize],
            &raw[Register::EnvelopeHi.addr() as usize],
            |lo: u8, hi: u8| ((hi as u32) << 8) | lo as u32,
        );
        let env_shape = DerivedReg::map(&raw[Register::EnvelopeShape.addr() as usize], |v: u8| {
            v & 0x1f
        });

        Registers {
            raw,
            tone_period,
            noise_period,
            tone_flag,
            noise_flag,
            fixed_level,
            level_mode,
            env_period,
            env_shape,
            timer_synth: std::array::from_fn(|_| Reg::new(false)),
            timers: std::array::from_fn(|_| MfpTimer::new()),
        }
    }

    /// Write a raw register.
    pub fn write(&self, reg: Register, value: u8) {
        self.raw[reg.addr() as usize].set(value);
    }

    /// Read a raw register.
    pub fn read(&self, reg: Register) -> u8 {
        self.raw[reg.addr() as usize].value()
    }

    /// Snapshot of R0-R15.
    pub fn snapshot(&self) -> [u8; 16] {
        std::array::from_fn(|i| self.raw[i].value())
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
