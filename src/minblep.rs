//! Minimum-phase band-limited steps
//!
//! A naive square or noise signal stepping at arbitrary naive frames aliases
//! badly when simply decimated to the output rate. Instead each step is
//! replaced by a precomputed band-limited step (BLEP) placed at the step's
//! exact sub-sample position. The steps are minimum-phase: all of the kernel's
//! energy arrives as early as possible, so only a short window after each step
//! needs mixing in and nothing has to be delayed.
//!
//! Construction, once per synth:
//! 1. Blackman-windowed sinc impulse, oversampled by `scale`
//! 2. Minimum-phase equivalent via the real cepstrum
//! 3. Integrate into a step, normalize to end at 1
//! 4. Slice into `scale` phase kernels of `mixin_size` taps
//!
//! Position mapping: naive frame `x` lands at oversampled output position
//! `pos = round_half_up(x * scale * out_rate / naive_rate)`. The first output
//! sample affected is `ceil(pos / scale)` and the kernel used is
//! `outi * scale - pos`.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::{Result, SynthError};

/// Default cutoff as a fraction of the output rate.
pub const DEFAULT_CUTOFF: f64 = 0.475;
/// Default transition width as a fraction of the output rate.
pub const DEFAULT_TRANSITION: f64 = 0.05;

/// Floor applied to spectrum magnitudes before taking the log.
const MIN_MAGNITUDE: f64 = 3.720_075_976_020_836e-44; // e^-100

/// Phase-indexed minBLEP kernels for one naive/output rate pair.
#[derive(Debug, Clone)]
pub struct MinBleps {
    naive_rate: u64,
    out_rate: u64,
    scale: usize,
    mixin_size: usize,
    /// `scale` rows of `mixin_size` taps.
    table: Vec<f32>,
    /// Oversampled ideal impulse, kept for analysis.
    bli: Vec<f64>,
    /// Oversampled minimum-phase impulse, kept for analysis.
    minbli: Vec<f64>,
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Phase count that makes every naive frame land on an exact oversampled position.
pub fn ideal_scale(naive_rate: u64, out_rate: u64) -> u64 {
    naive_rate / gcd(naive_rate, out_rate).max(1)
}

fn blackman(k: usize, size: usize) -> f64 {
    let m = (size - 1) as f64;
    let t = std::f64::consts::PI * k as f64 / m;
    0.42 - 0.5 * (2.0 * t).cos() + 0.08 * (4.0 * t).cos()
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

impl MinBleps {
    /// Table for the given rates using the largest useful scale up to `max_scale`.
    pub fn for_rates(naive_rate: u64, out_rate: u64, max_scale: usize) -> Result<Self> {
        if naive_rate == 0 || out_rate == 0 {
            return Err(SynthError::ConfigError(format!(
                "rates must be positive (naive {naive_rate}, output {out_rate})"
            )));
        }
        let scale = ideal_scale(naive_rate, out_rate).min(max_scale as u64) as usize;
        Self::new(naive_rate, out_rate, scale)
    }

    /// Table with default cutoff and transition.
    pub fn new(naive_rate: u64, out_rate: u64, scale: usize) -> Result<Self> {
        Self::with_filter(naive_rate, out_rate, scale, DEFAULT_CUTOFF, DEFAULT_TRANSITION)
    }

    /// Table with explicit filter parameters (fractions of the output rate).
    pub fn with_filter(
        naive_rate: u64,
        out_rate: u64,
        scale: usize,
        cutoff: f64,
        transition: f64,
    ) -> Result<Self> {
        if naive_rate == 0 || out_rate == 0 {
            return Err(SynthError::ConfigError(format!(
                "rates must be positive (naive {naive_rate}, output {out_rate})"
            )));
        }
        if out_rate > naive_rate {
            return Err(SynthError::ConfigError(format!(
                "output rate {out_rate} exceeds naive rate {naive_rate}"
            )));
        }
        if scale == 0 {
            return Err(SynthError::ConfigError("minBLEP scale must be positive".into()));
        }
        if !(cutoff > 0.0 && cutoff < 0.5) {
            return Err(SynthError::ConfigError(format!(
                "cutoff {cutoff} must lie strictly between 0 and 0.5"
            )));
        }
        if !(transition.is_finite() && transition > 0.0) {
            return Err(SynthError::ConfigError(format!(
                "transition {transition} must be positive"
            )));
        }

        let order = ((4.0 / transition / 2.0).round() as usize) * 2;
        if order == 0 {
            return Err(SynthError::ConfigError(format!(
                "transition {transition} too wide for a non-empty kernel"
            )));
        }
        let kernel_size = order * scale + 1;
        let size = kernel_size.next_power_of_two();
        let midpoint = size / 2;
        let rpad = (size - kernel_size) / 2;
        let lpad = size - kernel_size - rpad;

        let mut bli = vec![0.0; size];
        for k in 0..kernel_size {
            let x = (k as f64 / (kernel_size - 1) as f64 * 2.0 - 1.0) * order as f64 * cutoff;
            bli[lpad + k] = blackman(k, kernel_size) * sinc(x) / scale as f64 * cutoff * 2.0;
        }

        let minbli = min_phase(&bli, midpoint);

        let mut minblep = Vec::with_capacity(size);
        let mut acc = 0.0;
        for &v in &minbli {
            acc += v;
            minblep.push(acc);
        }
        let total = acc;
        if total.abs() < f64::EPSILON {
            return Err(SynthError::ConfigError("degenerate minBLEP kernel".into()));
        }
        minblep.iter_mut().for_each(|v| *v /= total);

        let mixin_size = size.div_ceil(scale);
        let mut table = vec![1.0f32; scale * mixin_size];
        for s in 0..scale {
            let row = &mut table[s * mixin_size..(s + 1) * mixin_size];
            for (k, tap) in row.iter_mut().enumerate() {
                if let Some(&v) = minblep.get(s + k * scale) {
                    *tap = v as f32;
                }
            }
        }

        tracing::debug!(
            naive_rate,
            out_rate,
            scale,
            order,
            size,
            mixin_size,
            "minBLEP table built"
        );

        Ok(MinBleps {
            naive_rate,
            out_rate,
            scale,
            mixin_size,
            table,
            bli,
            minbli,
        })
    }

    /// Naive (chip) rate.
    pub fn naive_rate(&self) -> u64 {
        self.naive_rate
    }

    /// Output (host) rate.
    pub fn out_rate(&self) -> u64 {
        self.out_rate
    }

    /// Number of sub-sample phases.
    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Taps per phase kernel.
    pub fn mixin_size(&self) -> usize {
        self.mixin_size
    }

    /// Kernel for sub-sample phase `shape`.
    pub fn kernel(&self, shape: usize) -> &[f32] {
        &self.table[shape * self.mixin_size..(shape + 1) * self.mixin_size]
    }

    /// Ideal band-limited impulse (oversampled).
    pub fn ideal_impulse(&self) -> &[f64] {
        &self.bli
    }

    /// Minimum-phase impulse (oversampled).
    pub fn min_phase_impulse(&self) -> &[f64] {
        &self.minbli
    }

    /// Oversampled output position of naive frame `naivex`.
    #[inline]
    pub fn position(&self, naivex: u64) -> u64 {
        let scale = self.scale as u64;
        (2 * naivex * scale * self.out_rate + self.naive_rate) / (2 * self.naive_rate)
    }

    /// First output index affected by a step at `naivex`, and the kernel to use.
    #[inline]
    pub fn locate(&self, naivex: u64) -> (u64, usize) {
        let scale = self.scale as u64;
        let pos = self.position(naivex);
        let outi = pos.div_ceil(scale);
        (outi, (outi * scale - pos) as usize)
    }

    /// First output index affected by a step at `naivex`.
    #[inline]
    pub fn out_index(&self, naivex: u64) -> u64 {
        self.position(naivex).div_ceil(self.scale as u64)
    }

    /// Output samples completed by `n` naive frames starting at `naivex`.
    pub fn out_count(&self, naivex: u64, n: u64) -> u64 {
        self.out_index(naivex + n) - self.out_index(naivex)
    }

    /// Fewest naive frames from `naivex` that complete `out_n` output samples.
    pub fn min_naive_n(&self, naivex: u64, out_n: u64) -> u64 {
        if out_n == 0 {
            return 0;
        }
        let scale = self.scale as u64;
        let target = self.out_index(naivex) + out_n;
        let pos = (target - 1) * scale + 1;
        let num = 2 * self.naive_rate * pos - self.naive_rate;
        let den = 2 * scale * self.out_rate;
        num.div_ceil(den).saturating_sub(naivex)
    }
}

/// Minimum-phase equivalent of `impulse` with the same magnitude spectrum.
fn min_phase(impulse: &[f64], midpoint: usize) -> Vec<f64> {
    let size = impulse.len();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(size);
    let ifft = planner.plan_fft_inverse(size);
    let norm = 1.0 / size as f64;

    let mut spectrum: Vec<Complex<f64>> = impulse.iter().map(|&v| Complex::new(v, 0.0)).collect();
    fft.process(&mut spectrum);

    let mut cepstrum: Vec<Complex<f64>> = spectrum
        .iter()
        .map(|c| Complex::new(c.norm().max(MIN_MAGNITUDE).ln(), 0.0))
        .collect();
    ifft.process(&mut cepstrum);
    cepstrum.iter_mut().for_each(|c| *c *= norm);

    for c in &mut cepstrum[1..midpoint] {
        *c *= 2.0;
    }
    for c in &mut cepstrum[midpoint + 1..] {
        *c = Complex::new(0.0, 0.0);
    }

    fft.process(&mut cepstrum);
    cepstrum.iter_mut().for_each(|c| *c = c.exp());
    ifft.process(&mut cepstrum);
    cepstrum.iter().map(|c| c.re * norm).collect()
}

/// Magnitude spectrum of a real signal.
pub fn magnitude_spectrum(signal: &[f64]) -> Vec<f64> {
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(signal.len());
    let mut buf: Vec<Complex<f64>> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
    fft.process(&mut buf);
    buf.iter().map(|c| c.norm()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_energy_preserved() {
        let minbleps = MinBleps::new(10, 1, 5).unwrap();
        let ideal = magnitude_spectrum(minbleps.ideal_impulse());
        let minimum = magnitude_spectrum(minbleps.min_phase_impulse());
        for (i, (&a, &b)) in ideal.iter().zip(&minimum).enumerate() {
            assert!(
                (a - b).abs() <= 1e-8 + 1e-5 * b.abs(),
                "bin {i}: ideal {a} vs min-phase {b}"
            );
        }
    }

    #[test]
    fn test_kernels_converge_to_one() {
        let minbleps = MinBleps::new(12, 1, 4).unwrap();
        for shape in 0..minbleps.scale() {
            let kernel = minbleps.kernel(shape);
            assert_eq!(kernel.len(), minbleps.mixin_size());
            assert_relative_eq!(kernel[kernel.len() - 1], 1.0, epsilon = 1e-4);
        }
        assert!(minbleps.kernel(0)[0].abs() < 0.1, "step starts near zero");
    }

    #[test]
    fn test_sharing_scale_4() {
        let minbleps = MinBleps::new(12, 1, 4).unwrap();
        let expected: [(u64, usize); 12] = [
            (0, 0),
            (0, 0),
            (1, 3),
            (1, 3),
            (1, 3),
            (1, 2),
            (1, 2),
            (1, 2),
            (1, 1),
            (1, 1),
            (1, 1),
            (1, 0),
        ];
        for (x, &want) in expected.iter().enumerate() {
            assert_eq!(minbleps.locate(x as u64), want, "naive index {x}");
        }
    }

    #[test]
    fn test_sharing_scale_3() {
        let minbleps = MinBleps::new(12, 1, 3).unwrap();
        let expected: [(u64, usize); 12] = [
            (0, 0),
            (0, 0),
            (1, 2),
            (1, 2),
            (1, 2),
            (1, 2),
            (1, 1),
            (1, 1),
            (1, 1),
            (1, 1),
            (1, 0),
            (1, 0),
        ];
        for (x, &want) in expected.iter().enumerate() {
            assert_eq!(minbleps.locate(x as u64), want, "naive index {x}");
        }
    }

    #[test]
    fn test_min_naive_n_is_minimal() {
        let minbleps = MinBleps::new(2_000_000, 44_100, 500).unwrap_or_else(|e| panic!("{e}"));
        for naivex in [0u64, 1, 17, 45, 999, 1_999_999] {
            for out_n in [1u64, 2, 64, 512] {
                let n = minbleps.min_naive_n(naivex, out_n);
                assert_eq!(minbleps.out_count(naivex, n), out_n, "naivex {naivex} out {out_n}");
                assert!(minbleps.out_count(naivex, n - 1) < out_n);
            }
        }
    }

    #[test]
    fn test_ideal_scale() {
        assert_eq!(ideal_scale(2_000_000, 44_100), 20_000);
        assert_eq!(ideal_scale(12, 1), 12);
        assert_eq!(ideal_scale(48_000, 48_000), 1);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(MinBleps::new(0, 1, 4).is_err());
        assert!(MinBleps::new(1, 2, 4).is_err(), "output above naive rate");
        assert!(MinBleps::new(12, 1, 0).is_err());
        assert!(MinBleps::with_filter(12, 1, 4, 0.5, 0.05).is_err());
        assert!(MinBleps::with_filter(12, 1, 4, 0.4, 0.0).is_err());
        assert!(MinBleps::for_rates(12, 0, 4).is_err());
    }
}
