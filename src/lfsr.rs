//! Galois linear feedback shift register
//!
//! The YM2149 noise generator is a 17-bit LFSR with taps at degrees 17 and 14
//! (feedback mask `0x12000`). Each step outputs the low bit, shifts right and
//! folds the mask back in when that bit was set.

/// Degrees of the chip's noise polynomial.
pub const YM2149_DEGREES: [u32; 2] = [17, 14];

/// Galois LFSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lfsr {
    state: u32,
    mask: u32,
}

impl Lfsr {
    /// LFSR for the polynomial whose nonzero terms are `degrees`, seeded with 1.
    pub fn new(degrees: &[u32]) -> Self {
        let mask = degrees.iter().fold(0, |m, &d| m | (1 << (d - 1)));
        Lfsr { state: 1, mask }
    }

    /// The chip's noise register.
    pub fn ym2149() -> Self {
        Self::new(&YM2149_DEGREES)
    }

    /// Feedback mask.
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Output one bit and advance.
    #[inline]
    pub fn next_bit(&mut self) -> u8 {
        let bit = (self.state & 1) as u8;
        self.state >>= 1;
        if bit != 0 {
            self.state ^= self.mask;
        }
        bit
    }

    /// One full period of output bits, starting from the seed.
    pub fn sequence(mut self) -> Vec<u8> {
        let seed = self.state;
        let mut bits = Vec::new();
        loop {
            bits.push(self.next_bit());
            if self.state == seed {
                break bits;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_matches_chip() {
        assert_eq!(Lfsr::ym2149().mask(), 0x12000);
    }

    #[test]
    fn test_maximal_period() {
        let bits = Lfsr::ym2149().sequence();
        assert_eq!(bits.len(), (1 << 17) - 1);
        let ones = bits.iter().filter(|&&b| b == 1).count();
        assert_eq!(ones, 1 << 16, "maximal sequence has 2^(n-1) ones");
    }

    #[test]
    fn test_first_bits_from_seed() {
        let mut lfsr = Lfsr::ym2149();
        // Seed 1: emits 1, state becomes the mask, then mask shifts down 13 times with zeros.
        assert_eq!(lfsr.next_bit(), 1);
        for _ in 0..13 {
            assert_eq!(lfsr.next_bit(), 0);
        }
        assert_eq!(lfsr.next_bit(), 1);
    }
}
