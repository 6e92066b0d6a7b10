//! Mixer Control Register (R7)
//!
//! A set bit disables the source: bits 0-2 gate tone A-C, bits 3-5 gate noise
//! A-C. Bits 6-7 are I/O port direction and do not affect sound.

use bitflags::bitflags;

bitflags! {
    /// Mixer Control Register (R7) bitflags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MixerFlags: u8 {
        /// Channel A tone disable
        const CH_A_TONE = 0x01;
        /// Channel B tone disable
        const CH_B_TONE = 0x02;
        /// Channel C tone disable
        const CH_C_TONE = 0x04;
        /// Channel A noise disable
        const CH_A_NOISE = 0x08;
        /// Channel B noise disable
        const CH_B_NOISE = 0x10;
        /// Channel C noise disable
        const CH_C_NOISE = 0x20;
    }
}

impl MixerFlags {
    /// Create mixer flags from raw register value
    pub fn from_register(value: u8) -> Self {
        MixerFlags::from_bits_truncate(value)
    }

    fn tone_bit(chan: usize) -> Self {
        MixerFlags::from_bits_truncate(0x01 << (chan % 3))
    }

    fn noise_bit(chan: usize) -> Self {
        MixerFlags::from_bits_truncate(0x08 << (chan % 3))
    }

    /// Check if a channel's tone is enabled
    pub fn tone_enabled(&self, chan: usize) -> bool {
        !self.contains(Self::tone_bit(chan))
    }

    /// Check if a channel's noise is enabled
    pub fn noise_enabled(&self, chan: usize) -> bool {
        !self.contains(Self::noise_bit(chan))
    }
}
