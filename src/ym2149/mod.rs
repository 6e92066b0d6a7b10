//! YM2149 PSG chip model
//!
//! Register bank, R7 mixer flags and the per-channel signal graph.

pub mod chip;
pub mod mixer;
pub mod registers;

pub use chip::{Ym2149, ENVELOPE_NO_WRITE};
pub use mixer::MixerFlags;
pub use registers::{Register, Registers, NUM_CHANNELS};
