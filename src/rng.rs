//! Pseudo-random sources used by the track builder.

use std::time::{SystemTime, UNIX_EPOCH};

const LFSR_MAGIC: u16 = 0xC2DF;

/// 16-bit Galois LFSR.
///
/// Seed 0 is not a fixed point: it is XORed with the feedback constant. The sequence visits all
/// 65536 states, 0 included, before repeating.
#[derive(Debug, Clone)]
pub struct Lfsr {
    state: u16,
}

impl Lfsr {
    pub fn new(seed: u16) -> Self {
        Lfsr { state: seed }
    }

    /// Seed from the microseconds of the system clock.
    pub fn from_clock() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_micros())
            .unwrap_or(0);
        Lfsr::new(micros as u16)
    }

    pub fn next(&mut self) -> u16 {
        self.state = match self.state {
            0 => LFSR_MAGIC,
            0x8000 => 0,
            s if s & 0x8000 != 0 => (s << 1) ^ LFSR_MAGIC,
            s => s << 1,
        };
        self.state
    }
}

/// Two-bit draws taken from successive LFSR values.
///
/// One 16-bit value is drawn every 8 calls and consumed from its low bits up.
#[derive(Debug, Clone)]
pub struct Random4 {
    lfsr: Lfsr,
    bits: u16,
    left: u8,
}

impl Random4 {
    pub fn new(lfsr: Lfsr) -> Self {
        Random4 {
            lfsr,
            bits: 0,
            left: 0,
        }
    }

    pub fn with_seed(seed: u16) -> Self {
        Random4::new(Lfsr::new(seed))
    }

    /// Returns a value in `0..4`.
    pub fn next(&mut self) -> u8 {
        if self.left == 0 {
            self.bits = self.lfsr.next();
            self.left = 8;
        }
        let r = (self.bits & 0x3) as u8;
        self.bits >>= 2;
        self.left -= 1;
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed() {
        let mut lfsr = Lfsr::new(0);
        assert_eq!(lfsr.next(), LFSR_MAGIC);
        assert_ne!(lfsr.next(), 0);
    }

    #[test]
    fn test_full_period() {
        let mut lfsr = Lfsr::new(1);
        let mut seen = vec![false; 0x10000];
        let mut nonzero = 0;
        for _ in 0..0x10000 {
            let v = lfsr.next();
            assert!(!seen[v as usize], "state {:04x} repeated early", v);
            seen[v as usize] = true;
            if v != 0 {
                nonzero += 1;
            }
        }
        assert_eq!(nonzero, 0xFFFF);
        // Back to the start.
        assert_eq!(lfsr.next(), Lfsr::new(1).next());
    }

    #[test]
    fn test_random4_refills_every_8_calls() {
        let mut lfsr = Lfsr::new(0x1234);
        let first = lfsr.next();
        let second = lfsr.next();

        let mut rng = Random4::with_seed(0x1234);
        for i in 0..8 {
            assert_eq!(rng.next() as u16, (first >> (2 * i)) & 0x3);
        }
        for i in 0..8 {
            assert_eq!(rng.next() as u16, (second >> (2 * i)) & 0x3);
        }
    }
}
