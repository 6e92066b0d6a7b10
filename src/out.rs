//! Band-limited output and audio sinks
//!
//! [`WavBuf`] turns the naive mixed signal into output-rate samples by mixing
//! a minBLEP in at every change of level. [`Stream`] runs one `WavBuf` per
//! output channel, interleaves them and hands the frames to an [`AudioSink`].

use std::path::Path;
use std::sync::Arc;

use crate::buf::interleave;
use crate::minblep::MinBleps;
use crate::node::{pull_with, Block, Upstream};
use crate::{Result, SynthError};

/// Consumer of interleaved float frames.
///
/// Samples are in the synth's native units: with `log2_max_peak_to_peak = 16`
/// the full swing matches signed 16-bit PCM.
pub trait AudioSink: Send {
    /// Take one block's worth of interleaved frames.
    fn consume(&mut self, samples: &[f32]) -> Result<()>;

    /// Push out anything buffered.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Host block size in frames, if the sink has a fixed one.
    fn buffer_size(&self) -> Option<usize> {
        None
    }

    /// Number of interleaved channels expected.
    fn channels(&self) -> usize;
}

/// Band-limits one naive signal.
pub struct WavBuf {
    naive: Upstream<f32>,
    minbleps: Arc<MinBleps>,
    naivex: u64,
    dc: f32,
    primed: bool,
    carry: Vec<f32>,
    buf: Vec<f32>,
    tail: Vec<f32>,
}

impl WavBuf {
    /// Output stage over a naive float signal.
    pub fn new(naive: Upstream<f32>, minbleps: Arc<MinBleps>) -> Self {
        let mixin = minbleps.mixin_size();
        WavBuf {
            naive,
            minbleps,
            naivex: 0,
            dc: 0.0,
            primed: false,
            carry: vec![0.0; mixin],
            buf: Vec::new(),
            tail: Vec::new(),
        }
    }

    /// Position within the current second of naive time.
    pub fn naivex(&self) -> u64 {
        self.naivex
    }

    /// Render the output samples completed by `block`.
    pub fn render(&mut self, block: &Block) -> &[f32] {
        let n = block.frame_count() as u64;
        let minbleps = Arc::clone(&self.minbleps);
        let mixin = minbleps.mixin_size();
        let out0 = minbleps.out_index(self.naivex);
        let outz = minbleps.out_index(self.naivex + n);
        let count = (outz - out0) as usize;
        let len = count + mixin;

        if !self.primed {
            let first = pull_with(&self.naive, block, |s| s.first().copied());
            if let Some(first) = first {
                self.dc = first;
                self.carry.fill(first);
                self.primed = true;
            }
        }

        self.buf.clear();
        self.buf.extend_from_slice(&self.carry);
        self.buf.resize(len, self.dc);
        self.tail.clear();
        self.tail.resize(len + 1, 0.0);

        let naivex = self.naivex;
        let dc = self.dc;
        let (buf, tail) = (&mut self.buf, &mut self.tail);
        let last = pull_with(&self.naive, block, |samples| {
            let mut prev = dc;
            for (i, &v) in samples.iter().enumerate() {
                let amp = v - prev;
                prev = v;
                if amp == 0.0 {
                    continue;
                }
                let (outi, shape) = minbleps.locate(naivex + i as u64);
                let rel = (outi - out0) as usize;
                for (o, &k) in buf[rel..rel + mixin].iter_mut().zip(minbleps.kernel(shape)) {
                    *o += amp * k;
                }
                tail[rel + mixin] += amp;
            }
            prev
        });

        let mut acc = 0.0;
        for (o, &t) in self.buf.iter_mut().zip(&self.tail) {
            acc += t;
            *o += acc;
        }

        self.carry.clear();
        self.carry.extend_from_slice(&self.buf[count..]);
        self.dc = last;
        self.naivex = (self.naivex + n) % minbleps.naive_rate();
        &self.buf[..count]
    }
}

impl AudioSink for Box<dyn AudioSink> {
    fn consume(&mut self, samples: &[f32]) -> Result<()> {
        (**self).consume(samples)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn buffer_size(&self) -> Option<usize> {
        (**self).buffer_size()
    }

    fn channels(&self) -> usize {
        (**self).channels()
    }
}

/// One band-limited output per channel, interleaved into a sink.
pub struct Stream<S: AudioSink> {
    wavbufs: Vec<WavBuf>,
    sink: S,
    frames: Vec<f32>,
    samples_written: u64,
}

impl<S: AudioSink> Stream<S> {
    /// Stream over per-output-channel naive signals.
    pub fn new(naive: Vec<Upstream<f32>>, minbleps: Arc<MinBleps>, sink: S) -> Result<Self> {
        if naive.len() != sink.channels() {
            return Err(SynthError::ConfigError(format!(
                "sink expects {} channels, synth produces {}",
                sink.channels(),
                naive.len()
            )));
        }
        Ok(Stream {
            wavbufs: naive
                .into_iter()
                .map(|n| WavBuf::new(n, Arc::clone(&minbleps)))
                .collect(),
            sink,
            frames: Vec::new(),
            samples_written: 0,
        })
    }

    /// Render `block` on every channel and send the frames to the sink.
    pub fn call(&mut self, block: &Block) -> Result<usize> {
        let views: Vec<&[f32]> = self.wavbufs.iter_mut().map(|w| w.render(block)).collect();
        interleave(&views, &mut self.frames);
        let count = views.first().map_or(0, |c| c.len());
        self.sink.consume(&self.frames)?;
        self.samples_written += count as u64;
        Ok(count)
    }

    /// Output frames written so far.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The sink, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Give up the stream, keeping the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()
    }
}

/// Sink that keeps every frame in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    channels: usize,
    buffer_size: Option<usize>,
    /// Interleaved frames received so far.
    pub samples: Vec<f32>,
    /// Length of each consumed chunk, in interleaved samples.
    pub chunks: Vec<usize>,
}

impl MemorySink {
    /// Collecting sink for `channels` channels.
    pub fn new(channels: usize) -> Self {
        MemorySink {
            channels,
            ..Default::default()
        }
    }

    /// Report a fixed host block size, as a callback-driven backend would.
    pub fn with_buffer_size(mut self, frames: usize) -> Self {
        self.buffer_size = Some(frames);
        self
    }
}

impl AudioSink for MemorySink {
    fn consume(&mut self, samples: &[f32]) -> Result<()> {
        self.samples.extend_from_slice(samples);
        self.chunks.push(samples.len());
        Ok(())
    }

    fn buffer_size(&self) -> Option<usize> {
        self.buffer_size
    }

    fn channels(&self) -> usize {
        self.channels
    }
}

/// Writes 16-bit PCM WAV via `hound`.
pub struct WavSink {
    writer: Option<hound::WavWriter<std::io::BufWriter<std::fs::File>>>,
    channels: usize,
}

impl WavSink {
    /// Create `path` for `channels` channels at `sample_rate`.
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32, channels: u16) -> Result<Self> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path.as_ref(), spec).map_err(|e| {
            SynthError::AudioFileError(format!("Failed to create WAV file: {}", e))
        })?;
        Ok(WavSink {
            writer: Some(writer),
            channels: channels as usize,
        })
    }

    /// Write the header and close the file.
    pub fn finalize(mut self) -> Result<()> {
        match self.writer.take() {
            Some(writer) => writer
                .finalize()
                .map_err(|e| SynthError::AudioFileError(format!("Failed to finalize WAV file: {}", e))),
            None => Ok(()),
        }
    }
}

impl AudioSink for WavSink {
    fn consume(&mut self, samples: &[f32]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SynthError::AudioFileError("WAV file already finalized".into()))?;
        for &sample in samples {
            let sample_i16 = sample.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| SynthError::AudioFileError(format!("Failed to write sample: {}", e)))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| SynthError::AudioFileError(format!("Failed to flush WAV file: {}", e)))?;
        }
        Ok(())
    }

    fn channels(&self) -> usize {
        self.channels
    }
}
