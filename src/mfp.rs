//! MFP (Multi-Function Peripheral) timers
//!
//! ATARI ST MFP timer infrastructure for PSG modulation. A timer counts down
//! `data` periods of a prescaled 2.4576 MHz clock; toggling a channel on every
//! expiry gives the square wave used for timer-synth ("SID"/sync) effects.

use crate::reg::{DerivedReg, Reg};

/// MFP input clock in Hz.
pub const MFP_CLOCK: u64 = 2_457_600;

/// Prescaler for each control register value (0 = stopped).
pub const PRESCALERS: [u32; 8] = [0, 4, 10, 16, 50, 64, 100, 200];

/// One MFP timer in delay mode.
#[derive(Clone)]
pub struct MfpTimer {
    /// Timer control register (prescaler select, 0 stops the timer).
    pub control: Reg<u8>,
    /// Timer data register (0 counts as 256).
    pub data: Reg<u8>,
    ticks: DerivedReg<u32>,
}

impl MfpTimer {
    /// Stopped timer.
    pub fn new() -> Self {
        let control = Reg::new(0u8);
        let data = Reg::new(0u8);
        let ticks = DerivedReg::map2(&control, &data, |tcr: u8, tdr: u8| {
            let prescaler = PRESCALERS[(tcr & 0x07) as usize];
            let count = if tdr == 0 { 256 } else { tdr as u32 };
            prescaler * count
        });
        MfpTimer {
            control,
            data,
            ticks,
        }
    }

    /// Write both registers.
    pub fn update(&self, tcr: u8, tdr: u8) {
        self.control.set(tcr);
        self.data.set(tdr);
    }

    /// MFP clock ticks between expiries, 0 while stopped.
    pub fn ticks(&self) -> DerivedReg<u32> {
        self.ticks.clone()
    }

    /// Frequency of the square wave toggled on each expiry.
    pub fn freq(&self) -> Option<f64> {
        match self.ticks.value() {
            0 => None,
            t => Some(MFP_CLOCK as f64 / (2.0 * t as f64)),
        }
    }

    /// Control/data pair whose square wave is closest to `freq`.
    pub fn find_tcr_tdr(freq: f64) -> Option<(u8, u8)> {
        if !(freq.is_finite() && freq > 0.0) {
            return None;
        }
        let mut best: Option<(f64, u8, u8)> = None;
        for (tcr, &prescaler) in PRESCALERS.iter().enumerate().skip(1) {
            let ideal = MFP_CLOCK as f64 / (2.0 * freq * prescaler as f64);
            let count = ideal.round().clamp(1.0, 256.0) as u32;
            let actual = MFP_CLOCK as f64 / (2.0 * (prescaler * count) as f64);
            let err = (actual - freq).abs();
            if best.map_or(true, |(e, _, _)| err < e) {
                best = Some((err, tcr as u8, (count & 0xff) as u8));
            }
        }
        best.map(|(_, tcr, tdr)| (tcr, tdr))
    }
}

impl Default for MfpTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_stopped_by_default() {
        let timer = MfpTimer::new();
        assert_eq!(timer.ticks().value(), 0);
        assert_eq!(timer.freq(), None);
    }

    #[test]
    fn test_ticks_follow_registers() {
        let timer = MfpTimer::new();
        timer.update(1, 10);
        assert_eq!(timer.ticks().value(), 40);
        timer.data.set(0);
        assert_eq!(timer.ticks().value(), 4 * 256, "data 0 counts 256");
        assert_relative_eq!(timer.freq().unwrap(), 2_457_600.0 / 2048.0);
    }

    #[test]
    fn test_find_tcr_tdr_round_trips() {
        for target in [50.0, 440.0, 1000.0, 5000.0] {
            let (tcr, tdr) = MfpTimer::find_tcr_tdr(target).unwrap();
            let timer = MfpTimer::new();
            timer.update(tcr, tdr);
            let got = timer.freq().unwrap();
            assert!(
                (got - target).abs() / target < 0.01,
                "{target} Hz came out as {got} Hz"
            );
        }
        assert_eq!(MfpTimer::find_tcr_tdr(0.0), None);
    }
}
