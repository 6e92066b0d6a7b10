//! Buffer primitives
//!
//! Periodic waveforms are stored edge-encoded as a [`DiffRing`]: the first
//! entry is an absolute level, every later entry is the change from the
//! previous level, and a wrap diff leads from the last entry back to the loop
//! point. Oscillators integrate these diffs from a carried DC level, so a
//! waveform can be paused, resumed or swapped mid-stream without a jump.

/// Edge-encoded periodic level sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRing {
    first_level: i16,
    diffs: Vec<i16>,
    loop_start: usize,
    wrap_diff: i16,
}

impl DiffRing {
    /// Encode `levels`, repeating from `loop_start` after the last entry.
    ///
    /// # Panics
    ///
    /// Panics if `levels` is empty or `loop_start` is out of range.
    pub fn new(levels: &[u8], loop_start: usize) -> Self {
        assert!(!levels.is_empty(), "diff ring needs at least one level");
        assert!(loop_start < levels.len(), "loop start past end of ring");
        let mut diffs = Vec::with_capacity(levels.len());
        diffs.push(0);
        diffs.extend(
            levels
                .windows(2)
                .map(|w| w[1] as i16 - w[0] as i16),
        );
        let last = levels[levels.len() - 1] as i16;
        DiffRing {
            first_level: levels[0] as i16,
            diffs,
            loop_start,
            wrap_diff: levels[loop_start] as i16 - last,
        }
    }

    /// Number of entries before the ring wraps.
    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    /// Always false; rings are never empty.
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// Index the ring continues at after the last entry.
    pub fn loop_start(&self) -> usize {
        self.loop_start
    }

    /// Reconstruct the absolute levels of one pass through the ring.
    pub fn levels(&self) -> Vec<u8> {
        let mut level = self.first_level;
        let mut out = Vec::with_capacity(self.len());
        out.push(level as u8);
        for &d in &self.diffs[1..] {
            level += d;
            out.push(level as u8);
        }
        out
    }
}

/// Read position within a [`DiffRing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingCursor {
    index: usize,
}

impl RingCursor {
    /// Cursor at the start of a ring.
    pub fn new() -> Self {
        RingCursor { index: 0 }
    }

    /// Index of the next entry.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Next diff, relative to the level currently held.
    pub fn next_diff(&mut self, ring: &DiffRing, current: i16) -> i16 {
        if self.index >= ring.len() {
            self.index = ring.loop_start + 1;
            return ring.wrap_diff;
        }
        let d = if self.index == 0 {
            ring.first_level - current
        } else {
            ring.diffs[self.index]
        };
        self.index += 1;
        d
    }
}

/// Integrate `diffs` starting from `dc`, writing absolute levels. Returns the final level.
pub fn integrate(diffs: &[i16], dc: i16, out: &mut [u8]) -> i16 {
    let mut acc = dc;
    for (o, &d) in out.iter_mut().zip(diffs) {
        acc += d;
        *o = acc as u8;
    }
    acc
}

/// Element-wise AND of two binary buffers into `out`.
pub fn and_into(a: &[u8], b: &[u8], out: &mut [u8]) {
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = x & y;
    }
}

/// Element-wise multiply `out` by `other`.
pub fn mul_assign(out: &mut [u8], other: &[u8]) {
    for (o, &m) in out.iter_mut().zip(other) {
        *o *= m;
    }
}

/// Map each level through `table`.
pub fn map_into(levels: &[u8], table: &[f32], out: &mut [f32]) {
    for (o, &l) in out.iter_mut().zip(levels) {
        *o = table[l as usize];
    }
}

/// Interleave equal-length channel buffers into frames.
pub fn interleave(channels: &[&[f32]], out: &mut Vec<f32>) {
    out.clear();
    let Some(len) = channels.iter().map(|c| c.len()).min() else {
        return;
    };
    out.reserve(len * channels.len());
    for i in 0..len {
        for c in channels {
            out.push(c[i]);
        }
    }
}
