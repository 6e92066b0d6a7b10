//! Real-time output through a bounded ring
//!
//! The synth thread pushes interleaved frames into a [`RingBuffer`] through a
//! [`RingSink`]; an audio callback thread drains it with [`RingBuffer::read`].
//! Memory stays fixed at the ring size however long playback runs.

pub mod realtime;
pub mod ring_buffer;

pub use realtime::{PlaybackStats, RingSink};
pub use ring_buffer::RingBuffer;

/// Default sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Producer sleep while the ring is full, in microseconds
pub const BUFFER_BACKOFF_MICROS: u64 = 100;

/// Ring and host buffer geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Ring capacity in samples (rounded up to a power of two)
    pub ring_buffer_size: usize,
    /// Frames the audio callback asks for at a time
    pub period_frames: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channels
    pub channels: u16,
}

impl StreamConfig {
    /// Small ring, about 93 ms of mono at 44.1 kHz
    pub fn low_latency(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 4096,
            period_frames: 512,
            sample_rate,
            channels: 1,
        }
    }

    /// Large ring, about 372 ms of mono at 44.1 kHz
    pub fn stable(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 16384,
            period_frames: 1024,
            sample_rate,
            channels: 1,
        }
    }

    /// Same geometry with `channels` interleaved channels.
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels.max(1);
        self
    }

    /// Ring latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        let frames = self.ring_buffer_size as f32 / self.channels.max(1) as f32;
        frames / self.sample_rate as f32 * 1000.0
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::stable(DEFAULT_SAMPLE_RATE)
    }
}
