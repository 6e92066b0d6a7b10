//! Audio sink feeding a ring buffer
//!
//! [`RingSink`] is the producer half: the synth calls [`AudioSink::consume`]
//! once per block and the sink blocks while the ring is full, which paces the
//! synth to the consumer. The consumer holds the ring from [`RingSink::buffer`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{RingBuffer, StreamConfig, BUFFER_BACKOFF_MICROS};
use crate::out::AudioSink;
use crate::{Result, SynthError};

/// Producer-side counters
#[derive(Debug, Clone, Default)]
pub struct PlaybackStats {
    /// Writes that found the ring full at least once
    pub overrun_count: usize,
    /// Samples queued so far
    pub samples_queued: usize,
    /// Ring fill after the last write
    pub fill_percentage: f32,
}

/// Sink that hands frames to a consumer thread through a [`RingBuffer`].
pub struct RingSink {
    buffer: Arc<RingBuffer>,
    config: StreamConfig,
    stats: Arc<Mutex<PlaybackStats>>,
    timeout: Option<Duration>,
}

impl RingSink {
    /// New sink with its own ring.
    pub fn new(config: StreamConfig) -> Result<Self> {
        if config.period_frames == 0 {
            return Err(SynthError::ConfigError(
                "period_frames must be positive".into(),
            ));
        }
        Ok(RingSink {
            buffer: Arc::new(RingBuffer::new(config.ring_buffer_size)?),
            config,
            stats: Arc::new(Mutex::new(PlaybackStats::default())),
            timeout: None,
        })
    }

    /// Fail with `AudioDeviceError` instead of blocking longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Consumer handle.
    pub fn buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Queue all of `samples`, sleeping while the ring is full.
    pub fn write_blocking(&self, samples: &[f32]) -> Result<usize> {
        let started = Instant::now();
        let mut rest = samples;
        let mut stalled = false;
        while !rest.is_empty() {
            let n = self.buffer.write(rest);
            rest = &rest[n..];
            if n == 0 {
                if let Some(timeout) = self.timeout {
                    if started.elapsed() > timeout {
                        return Err(SynthError::AudioDeviceError(format!(
                            "consumer stalled with {} samples pending",
                            rest.len()
                        )));
                    }
                }
                stalled = true;
                std::thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
            }
        }
        let mut stats = self.stats.lock();
        if stalled {
            stats.overrun_count += 1;
        }
        stats.samples_queued += samples.len();
        stats.fill_percentage = self.buffer.fill_percentage();
        Ok(samples.len())
    }

    /// Queue what fits without waiting.
    pub fn write_nonblocking(&self, samples: &[f32]) -> usize {
        let n = self.buffer.write(samples);
        let mut stats = self.stats.lock();
        if n < samples.len() {
            stats.overrun_count += 1;
        }
        stats.samples_queued += n;
        stats.fill_percentage = self.buffer.fill_percentage();
        n
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> PlaybackStats {
        self.stats.lock().clone()
    }

    /// Stream geometry.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl AudioSink for RingSink {
    fn consume(&mut self, samples: &[f32]) -> Result<()> {
        self.write_blocking(samples).map(|_| ())
    }

    fn buffer_size(&self) -> Option<usize> {
        Some(self.config.period_frames)
    }

    fn channels(&self) -> usize {
        self.config.channels as usize
    }
}

impl Drop for RingSink {
    fn drop(&mut self) {
        let stats = self.stats.lock();
        tracing::debug!(
            samples = stats.samples_queued,
            overruns = stats.overrun_count,
            "ring sink closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StreamConfig {
        StreamConfig {
            ring_buffer_size: 8,
            period_frames: 4,
            sample_rate: 44_100,
            channels: 1,
        }
    }

    #[test]
    fn test_nonblocking_counts_overrun() {
        let sink = RingSink::new(config()).unwrap();
        assert_eq!(sink.write_nonblocking(&[1.0; 10]), 8);
        let stats = sink.stats();
        assert_eq!(stats.overrun_count, 1);
        assert_eq!(stats.samples_queued, 8);
        assert_eq!(stats.fill_percentage, 1.0);
    }

    #[test]
    fn test_blocking_times_out_without_consumer() {
        let sink = RingSink::new(config())
            .unwrap()
            .with_timeout(Duration::from_millis(5));
        let err = sink.write_blocking(&[0.5; 12]).unwrap_err();
        assert!(matches!(err, SynthError::AudioDeviceError(_)));
    }

    #[test]
    fn test_blocking_waits_for_consumer() {
        let mut sink = RingSink::new(config()).unwrap();
        let ring = sink.buffer();
        let consumer = std::thread::spawn(move || {
            let mut got = Vec::new();
            let mut chunk = [0.0; 4];
            while got.len() < 32 {
                let n = ring.read(&mut chunk);
                got.extend_from_slice(&chunk[..n]);
                std::thread::yield_now();
            }
            got
        });
        let data: Vec<f32> = (0..32).map(|i| i as f32).collect();
        sink.consume(&data).unwrap();
        let got = consumer.join().unwrap();
        assert_eq!(got, data);
        assert_eq!(sink.buffer_size(), Some(4));
        assert_eq!(sink.stats().samples_queued, 32);
    }

    #[test]
    fn test_zero_period_rejected() {
        let bad = StreamConfig {
            period_frames: 0,
            ..config()
        };
        assert!(RingSink::new(bad).is_err());
    }
}
