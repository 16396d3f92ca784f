//! Fixed-point FFT used to find the dominant frequency of an instrument sample.
//!
//! The arithmetic is 16-bit fixed point with wrapping and per-stage halving, matching the
//! numbers the lead instrument heuristic was tuned against. Do not replace it with a floating
//! point transform.

use crate::tables::{FftTables, FFT_LOG2, FFT_SIZE};

/// Q15 multiply, rounded by adding back bit 14 of the product before the final shift.
pub fn fixed_mul_q15(a: i16, b: i16) -> i16 {
    let p = a as i32 * b as i32;
    ((p >> 15) + ((p >> 14) & 1)) as i16
}

pub struct Fft<'a> {
    tables: &'a FftTables,
    re: [i16; FFT_SIZE],
    im: [i16; FFT_SIZE],
}

impl<'a> Fft<'a> {
    pub fn new(tables: &'a FftTables) -> Self {
        Fft {
            tables,
            re: [0; FFT_SIZE],
            im: [0; FFT_SIZE],
        }
    }

    /// Loads the first `len` bytes of the sample starting at `offset` of `blob`.
    ///
    /// Consecutive byte pairs are packed as complex values, and inputs are permuted for
    /// decimation in time. Bytes past the end of `blob` read as zero.
    pub fn load_sample(&mut self, blob: &[u8], offset: usize, len: usize) {
        let byte_at = |i: usize| blob.get(offset + i).map(|&b| b as i8 as i16).unwrap_or(0);

        for (i, &r) in self.tables.reorder.iter().enumerate() {
            let r = r as usize;
            let (re, im) = if r < len {
                (byte_at(r + 2) << 8, byte_at(r) << 8)
            } else {
                (0, 0)
            };
            self.re[i] = re;
            self.im[i] = im;
        }
    }

    /// In-place radix-2 transform. Each stage halves its inputs, so no value can overflow.
    pub fn transform(&mut self) {
        let sin = &self.tables.sin;
        let mut k = FFT_LOG2 - 1;
        let mut level = 1;

        while level < FFT_SIZE {
            for m in 0..level {
                let w = m << k;
                let wr = sin[w + FFT_SIZE / 4] >> 1;
                let wi = sin[w].wrapping_neg() >> 1;

                let mut i = m;
                while i < FFT_SIZE {
                    let j = i + level;
                    let (re_j, im_j) = (self.re[j], self.im[j]);

                    let tr = fixed_mul_q15(wr, re_j).wrapping_sub(fixed_mul_q15(wi, im_j));
                    let ti = fixed_mul_q15(wr, im_j).wrapping_add(fixed_mul_q15(wi, re_j));
                    let qr = self.re[i] >> 1;
                    let qi = self.im[i] >> 1;

                    self.re[j] = qr.wrapping_sub(tr);
                    self.im[j] = qi.wrapping_sub(ti);
                    self.re[i] = qr.wrapping_add(tr);
                    self.im[i] = qi.wrapping_add(ti);

                    i += level * 2;
                }
            }

            level *= 2;
            k = k.saturating_sub(1);
        }
    }

    /// Bin in `1..FFT_SIZE / 2` with the largest squared magnitude. The lowest bin wins ties,
    /// and 0 is returned for a silent spectrum.
    pub fn dominant_freq(&self) -> u16 {
        let mut max_ampl = 0i32;
        let mut max_idx = 0u16;

        for i in 1..FFT_SIZE / 2 {
            let re = self.re[i] as i32;
            let im = self.im[i] as i32;
            let ampl = ((re * re) >> 1) + ((im * im) >> 1);
            if ampl > max_ampl {
                max_ampl = ampl;
                max_idx = i as u16;
            }
        }

        max_idx
    }
}

/// Dominant frequency bin of the `len` bytes of `blob` starting at `offset`.
pub fn sample_dominant_freq(tables: &FftTables, blob: &[u8], offset: usize, len: usize) -> u16 {
    let mut fft = Fft::new(tables);
    fft.load_sample(blob, offset, len);
    fft.transform();
    fft.dominant_freq()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// 1024 bytes whose packed complex input is a pure tone at bin `k`.
    pub(crate) fn complex_tone(k: usize) -> Vec<u8> {
        let mut s = vec![0u8; FFT_SIZE * 2];
        let point = |n: usize| {
            let a = 2.0 * PI * (k * n) as f64 / FFT_SIZE as f64;
            (
                (127.0 * a.cos()).round() as i8 as u8,
                (127.0 * a.sin()).round() as i8 as u8,
            )
        };
        for m in 0..FFT_SIZE / 2 {
            let (re0, im0) = point(2 * m);
            let (re1, im1) = point(2 * m + 1);
            s[4 * m] = im0;
            s[4 * m + 1] = im1;
            s[4 * m + 2] = re0;
            s[4 * m + 3] = re1;
        }
        s
    }

    #[test]
    fn test_fixed_mul_q15() {
        assert_eq!(fixed_mul_q15(0x4000, 0x4000), 0x2000);
        assert_eq!(fixed_mul_q15(32767, 32767), 32766);
        assert_eq!(fixed_mul_q15(-32768, 16384), -16384);
        // Rounding: 1 * 0x4000 = 0x4000, bit 14 set.
        assert_eq!(fixed_mul_q15(1, 0x4000), 1);
        assert_eq!(fixed_mul_q15(1, 0x3FFF), 0);
    }

    #[test]
    fn test_dominant_freq_boundaries() {
        let tables = FftTables::new();
        for &k in &[1usize, 2, 100, FFT_SIZE / 2 - 1] {
            let s = complex_tone(k);
            assert_eq!(sample_dominant_freq(&tables, &s, 0, s.len()), k as u16);
        }
    }

    #[test]
    fn test_dominant_freq_real_sine() {
        let tables = FftTables::new();
        let s: Vec<u8> = (0..FFT_SIZE * 2)
            .map(|n| {
                let a = 2.0 * PI * (40 * n) as f64 / (FFT_SIZE * 2) as f64;
                (100.0 * a.sin()).round() as i8 as u8
            })
            .collect();
        assert_eq!(sample_dominant_freq(&tables, &s, 0, s.len()), 40);
    }

    #[test]
    fn test_silence() {
        let tables = FftTables::new();
        let s = vec![0u8; 64];
        assert_eq!(sample_dominant_freq(&tables, &s, 0, s.len()), 0);
    }

    #[test]
    fn test_reads_past_blob_as_zero() {
        let tables = FftTables::new();
        let mut fft = Fft::new(&tables);
        // Declared length larger than the available data.
        fft.load_sample(&[0x10, 0x20, 0x30], 0, 8);
        assert_eq!(fft.im[0], 0x10 << 8);
        assert_eq!(fft.re[0], 0x30 << 8);
        // reorder[256] == 1
        assert_eq!(fft.im[256], 0x20 << 8);
        assert_eq!(fft.re[256], 0);
    }
}
