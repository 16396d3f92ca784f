//! Lookup tables computed once at startup: FFT twiddles and permutation, note period to color
//! band, and the perspective depth increments of the track scanlines.

use std::f64::consts::PI;

use crate::{gfx::DRAW_HEIGHT, track::NUM_VISIBLE_STEPS};

pub const FFT_LOG2: usize = 9;
pub const FFT_SIZE: usize = 1 << FFT_LOG2;
/// Three quarters of a sine cycle, enough for both the sine and the cosine of half a cycle.
pub const FFT_SIN_LEN: usize = FFT_SIZE * 3 / 4;

pub const FAR_Z: u32 = 0xFFFF;
pub const FAR_NEAR_RATIO: u32 = 7;
pub const NEAR_Z: u32 = FAR_Z / FAR_NEAR_RATIO;
/// Depth between two consecutive steps on the track.
pub const BLOCK_GAP_DEPTH: u32 = (FAR_Z - NEAR_Z + 1) / NUM_VISIBLE_STEPS as u32;
/// Depth of the ball, over the step currently playing.
pub const BALL_Z: u32 = NEAR_Z + BLOCK_GAP_DEPTH;

/// Twiddle factors and the input permutation of the fixed-point FFT.
pub struct FftTables {
    pub sin: [i16; FFT_SIN_LEN],
    pub reorder: [u16; FFT_SIZE],
}

impl FftTables {
    pub fn new() -> Self {
        let mut sin = [0i16; FFT_SIN_LEN];
        for (i, s) in sin.iter_mut().enumerate() {
            let angle = 2.0 * PI * i as f64 / FFT_SIZE as f64;
            *s = (angle.sin() * 32767.0).round() as i16;
        }

        // Two real samples are packed into each complex input: the butterfly input `rev` reads
        // byte pair `rev / 2` of a 4-byte group, imaginary part first.
        let mut reorder = [0u16; FFT_SIZE];
        for (i, r) in reorder.iter_mut().enumerate() {
            let rev = (i as u16).reverse_bits() >> (16 - FFT_LOG2);
            *r = (rev / 2) * 4 + (rev & 1);
        }

        FftTables { sin, reorder }
    }
}

impl Default for FftTables {
    fn default() -> Self {
        FftTables::new()
    }
}

/// ProTracker periods for finetune 0, octaves 1 to 3, lowest pitch first.
pub const NOTE_PERIODS: [u16; 36] = [
    856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453, //
    428, 404, 381, 360, 340, 320, 302, 285, 269, 254, 240, 226, //
    214, 202, 190, 180, 170, 160, 151, 143, 135, 127, 120, 113,
];
pub const MAX_NOTE_PERIOD: u16 = NOTE_PERIODS[0];

/// Maps a note period to a color band in `0..12`, one band for every three notes.
///
/// A period between two notes gets the band of the lower note. Periods longer than the lowest
/// note use band 0, shorter than the highest note the last band.
pub struct PeriodColors([u8; MAX_NOTE_PERIOD as usize + 1]);

impl PeriodColors {
    pub fn new() -> Self {
        let mut lut = [0u8; MAX_NOTE_PERIOD as usize + 1];
        let mut note = 0;
        let mut color = 0;
        for period in (0..=MAX_NOTE_PERIOD).rev() {
            if note < NOTE_PERIODS.len() && period == NOTE_PERIODS[note] {
                color = (note / 3) as u8;
                note += 1;
            }
            lut[period as usize] = color;
        }
        PeriodColors(lut)
    }

    pub fn lookup(&self, period: u16) -> u8 {
        self.0.get(period as usize).copied().unwrap_or(0)
    }
}

impl Default for PeriodColors {
    fn default() -> Self {
        PeriodColors::new()
    }
}

/// World depth of the scanline `dy` rows below the top of the draw area.
fn row_depth(dy: u32) -> u32 {
    let h = DRAW_HEIGHT as u32;
    let frac = NEAR_Z + dy * (FAR_Z - NEAR_Z) / h;
    NEAR_Z * FAR_Z / frac
}

/// Per-scanline depth increments, nearest scanline first.
///
/// Starting from `NEAR_Z`, the running sum ends exactly on `FAR_Z` after the last scanline.
pub fn z_increments() -> [u16; DRAW_HEIGHT] {
    let mut incs = [0u16; DRAW_HEIGHT];
    let mut prev = NEAR_Z;
    for (i, inc) in incs.iter_mut().enumerate() {
        let z = row_depth((DRAW_HEIGHT - 1 - i) as u32);
        *inc = (z - prev) as u16;
        prev = z;
    }
    incs
}

/// Inverse of the projection: the row, counted from the top of the draw area, where depth `z`
/// appears.
pub fn project_row(z: u32) -> u16 {
    let z = z.max(NEAR_Z).min(FAR_Z);
    let frac = NEAR_Z * FAR_Z / z;
    ((frac - NEAR_Z) * DRAW_HEIGHT as u32 / (FAR_Z - NEAR_Z)) as u16
}
