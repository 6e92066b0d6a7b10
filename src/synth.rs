//! Top-level engine
//!
//! [`Synth`] owns the chip graph, the band-limited output stream and the block
//! scheduler. Callers write registers between periods and call
//! [`Synth::run_period`] once per refresh; register writes take effect at the
//! start of the next block.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SynthConfig;
use crate::minblep::MinBleps;
use crate::mix::{stereo_gains, IdealMixer};
use crate::node::{shared, upstream, Upstream};
use crate::out::{AudioSink, Stream};
use crate::timer::{MinBlockRateTimer, RefreshRate, SyncTimer, Timer};
use crate::ym2149::{Ym2149, NUM_CHANNELS};
use crate::{Result, SynthError};

/// Synth behind a lock, for driving from another thread.
pub type SharedSynth = Arc<Mutex<Synth<Box<dyn AudioSink>>>>;

/// Chip, output stream and scheduler.
pub struct Synth<S: AudioSink> {
    chip: Ym2149,
    stream: Stream<S>,
    timer: Box<dyn Timer>,
    minbleps: Arc<MinBleps>,
    periods: u64,
}

impl<S: AudioSink> Synth<S> {
    /// Build a synth writing to `sink`.
    ///
    /// The scheduler follows the sink: a sink with a fixed host buffer gets a
    /// [`SyncTimer`] so every call fills whole buffers, otherwise blocks are
    /// capped by `min_block_rate`.
    pub fn new(config: &SynthConfig, sink: S) -> Result<Self> {
        config.validate()?;
        let minbleps = Arc::new(MinBleps::for_rates(
            config.naive_rate(),
            config.output_rate,
            config.minblep_max_scale,
        )?);
        let timer: Box<dyn Timer> = match sink.buffer_size() {
            Some(frames) => Box::new(SyncTimer::new(Arc::clone(&minbleps), frames)?),
            None => Box::new(MinBlockRateTimer::new(
                config.naive_rate(),
                config.min_block_rate,
            )),
        };
        Self::build(config, sink, minbleps, timer)
    }

    /// Build with an explicit scheduler.
    pub fn with_timer(config: &SynthConfig, sink: S, timer: Box<dyn Timer>) -> Result<Self> {
        config.validate()?;
        let minbleps = Arc::new(MinBleps::for_rates(
            config.naive_rate(),
            config.output_rate,
            config.minblep_max_scale,
        )?);
        Self::build(config, sink, minbleps, timer)
    }

    fn build(
        config: &SynthConfig,
        sink: S,
        minbleps: Arc<MinBleps>,
        timer: Box<dyn Timer>,
    ) -> Result<Self> {
        if sink.channels() != config.output_channels() {
            return Err(SynthError::ConfigError(format!(
                "sink has {} channels, config wants {}",
                sink.channels(),
                config.output_channels()
            )));
        }
        let chip = Ym2149::new(
            config.scale(),
            config.naive_rate(),
            config.log2_max_peak_to_peak,
        );
        let outputs = mixers(&chip, config);
        let stream = Stream::new(outputs, Arc::clone(&minbleps), sink)?;
        tracing::info!(
            naive_rate = config.naive_rate(),
            output_rate = config.output_rate,
            minblep_scale = minbleps.scale(),
            stereo = config.stereo,
            "synth ready"
        );
        Ok(Synth {
            chip,
            stream,
            timer,
            minbleps,
            periods: 0,
        })
    }

    /// The chip, for register writes.
    pub fn chip(&self) -> &Ym2149 {
        &self.chip
    }

    /// Shared band-limited step tables.
    pub fn minbleps(&self) -> &Arc<MinBleps> {
        &self.minbleps
    }

    /// Apply one frame of R0-R15.
    pub fn update(&self, frame: &[u8; 16]) {
        self.chip.update(frame);
    }

    /// Advance one refresh period, returning the output frames written.
    pub fn run_period(&mut self, rate: RefreshRate) -> Result<usize> {
        let mut written = 0;
        for block in self.timer.blocks_for_period(rate) {
            written += self.stream.call(&block)?;
        }
        self.periods += 1;
        tracing::trace!(period = self.periods, written, "period done");
        Ok(written)
    }

    /// Play a sequence of register frames, one per period at `rate`.
    pub fn play_frames(&mut self, frames: &[[u8; 16]], rate: RefreshRate) -> Result<usize> {
        let mut written = 0;
        for frame in frames {
            self.update(frame);
            written += self.run_period(rate)?;
        }
        Ok(written)
    }

    /// Periods run so far.
    pub fn periods(&self) -> u64 {
        self.periods
    }

    /// Output frames written so far.
    pub fn samples_written(&self) -> u64 {
        self.stream.samples_written()
    }

    /// Flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.stream.flush()
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        self.stream.sink()
    }

    /// The sink, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        self.stream.sink_mut()
    }

    /// Tear down the graph, keeping the sink.
    pub fn into_sink(self) -> S {
        self.stream.into_sink()
    }
}

impl Synth<Box<dyn AudioSink>> {
    /// Wrap for sharing across threads.
    pub fn into_shared(self) -> SharedSynth {
        Arc::new(Mutex::new(self))
    }
}

/// One ideal mixer per output channel over the chip DACs.
fn mixers(chip: &Ym2149, config: &SynthConfig) -> Vec<Upstream<f32>> {
    let dacs = chip.dacs();
    let log2pp = config.log2_max_peak_to_peak;
    if config.stereo {
        let gains = stereo_gains(NUM_CHANNELS, config.max_pan, config.pan_law);
        let side = |pick: fn(&(f32, f32)) -> f32| {
            let inputs = dacs
                .iter()
                .zip(&gains)
                .map(|(dac, g)| (Arc::clone(dac), pick(g)))
                .collect();
            upstream(&shared(IdealMixer::new(inputs, log2pp)))
        };
        vec![side(|g| g.0), side(|g| g.1)]
    } else {
        let inputs = dacs.iter().map(|dac| (Arc::clone(dac), 1.0)).collect();
        vec![upstream(&shared(IdealMixer::new(inputs, log2pp)))]
    }
}
