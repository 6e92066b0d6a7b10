//! Block scheduling
//!
//! Turns "advance one refresh period" into a sequence of [`Block`]s. All
//! arithmetic is exact: the fractional naive frame left over at the end of a
//! period is carried into the next, so no time is lost or invented however
//! long the synth runs or however the refresh rate changes.

use std::sync::Arc;

use crate::minblep::MinBleps;
use crate::node::Block;
use crate::{Result, SynthError};

/// Rational refresh rate `num / den` Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRate {
    num: u64,
    den: u64,
}

impl RefreshRate {
    /// Rate of `num / den` Hz.
    pub fn new(num: u64, den: u64) -> Result<Self> {
        if num == 0 || den == 0 {
            return Err(SynthError::ConfigError(format!(
                "refresh rate {num}/{den} must be positive"
            )));
        }
        Ok(RefreshRate { num, den })
    }

    /// Numerator.
    pub fn num(&self) -> u64 {
        self.num
    }

    /// Denominator.
    pub fn den(&self) -> u64 {
        self.den
    }

    /// Rate in Hz as a float.
    pub fn hz(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl From<u32> for RefreshRate {
    fn from(hz: u32) -> Self {
        RefreshRate {
            num: hz.max(1) as u64,
            den: 1,
        }
    }
}

/// Produces the blocks for one refresh period.
pub trait Timer: Send {
    /// Blocks covering one period at `rate`.
    fn blocks_for_period(&mut self, rate: RefreshRate) -> Vec<Block>;
}

/// Exact frame counter: one period at a time, remainder carried.
#[derive(Debug, Clone)]
struct PeriodCounter {
    clock: u64,
    carry: u64,
}

impl PeriodCounter {
    fn new(clock: u64) -> Self {
        PeriodCounter { clock, carry: 0 }
    }

    fn frames(&mut self, rate: RefreshRate) -> u64 {
        let whole = self.clock * rate.den + self.carry;
        self.carry = whole % rate.num;
        whole / rate.num
    }
}

/// One block per period.
#[derive(Debug, Clone)]
pub struct SimpleTimer {
    counter: PeriodCounter,
}

impl SimpleTimer {
    /// Timer over a naive clock of `clock` Hz.
    pub fn new(clock: u64) -> Self {
        SimpleTimer {
            counter: PeriodCounter::new(clock),
        }
    }
}

impl Timer for SimpleTimer {
    fn blocks_for_period(&mut self, rate: RefreshRate) -> Vec<Block> {
        let n = self.counter.frames(rate);
        tracing::trace!(frames = n, "period");
        vec![Block::new(n as usize)]
    }
}

/// Splits each period into blocks no longer than `clock / min_block_rate`.
#[derive(Debug, Clone)]
pub struct MinBlockRateTimer {
    counter: PeriodCounter,
    max_block: u64,
}

impl MinBlockRateTimer {
    /// Timer producing at least `min_block_rate` blocks per second.
    pub fn new(clock: u64, min_block_rate: u64) -> Self {
        MinBlockRateTimer {
            counter: PeriodCounter::new(clock),
            max_block: (clock / min_block_rate.max(1)).max(1),
        }
    }
}

impl Timer for MinBlockRateTimer {
    fn blocks_for_period(&mut self, rate: RefreshRate) -> Vec<Block> {
        let mut remaining = self.counter.frames(rate);
        tracing::trace!(frames = remaining, "period");
        let mut blocks = Vec::new();
        while remaining > 0 {
            let n = remaining.min(self.max_block);
            blocks.push(Block::new(n as usize));
            remaining -= n;
        }
        blocks
    }
}

/// Cuts blocks at host buffer boundaries.
///
/// Tracks `naivex` (position in the current second of naive time) and
/// `bufferx` (position in the current host buffer). Each block is the
/// shortest naive run that fills the host buffer, so the sink receives whole
/// buffers whenever the period allows.
#[derive(Debug, Clone)]
pub struct SyncTimer {
    counter: PeriodCounter,
    minbleps: Arc<MinBleps>,
    buffer_size: u64,
    naivex: u64,
    bufferx: u64,
}

impl SyncTimer {
    /// Timer matching a host buffer of `buffer_size` output frames.
    pub fn new(minbleps: Arc<MinBleps>, buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(SynthError::ConfigError("host buffer size must be positive".into()));
        }
        Ok(SyncTimer {
            counter: PeriodCounter::new(minbleps.naive_rate()),
            minbleps,
            buffer_size: buffer_size as u64,
            naivex: 0,
            bufferx: 0,
        })
    }

    /// Position within the current host buffer.
    pub fn bufferx(&self) -> u64 {
        self.bufferx
    }

    /// Position within the current second of naive time.
    pub fn naivex(&self) -> u64 {
        self.naivex
    }
}

impl Timer for SyncTimer {
    fn blocks_for_period(&mut self, rate: RefreshRate) -> Vec<Block> {
        let mut remaining = self.counter.frames(rate);
        tracing::trace!(frames = remaining, bufferx = self.bufferx, "period");
        let mut blocks = Vec::new();
        while remaining > 0 {
            let wanted = self.buffer_size - self.bufferx;
            let n = self.minbleps.min_naive_n(self.naivex, wanted).min(remaining);
            let outs = self.minbleps.out_count(self.naivex, n);
            self.bufferx = (self.bufferx + outs) % self.buffer_size;
            self.naivex = (self.naivex + n) % self.minbleps.naive_rate();
            blocks.push(Block::new(n as usize));
            remaining -= n;
        }
        blocks
    }
}
