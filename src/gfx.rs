pub mod blit;
pub mod compositor;
pub mod copper;
pub mod font;
pub mod raster;
pub mod scene;
pub mod sprite;

use std::fmt::{self, Debug, Formatter};

use log::trace;

pub const DISP_WIDTH: usize = 320;
pub const DISP_HEIGHT: usize = 256;
pub const DISP_DEPTH: usize = 3;

/// Hidden columns on each side of the view, so the track can be panned without running out of
/// bitmap.
pub const VIEW_OFFSET: usize = 64;
pub const BITMAP_WIDTH: usize = DISP_WIDTH + VIEW_OFFSET * 2;
/// One spare row below the display so the last scanline can be fetched with any shift.
pub const BITMAP_HEIGHT: usize = DISP_HEIGHT + 1;
pub const WORDS_PER_ROW: usize = BITMAP_WIDTH / 16;

/// Rows above the track, holding the logo, the title and the score.
pub const DRAW_TOP: usize = 52;
pub const DRAW_HEIGHT: usize = DISP_HEIGHT - DRAW_TOP;
/// Bitmap column of the track center.
pub const DRAW_CENTER_X: i16 = (BITMAP_WIDTH / 2) as i16;

/// Width of a lane at the near plane, in pixels.
pub const LANE_WIDTH: i16 = 123;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T: fmt::Display> Debug for Point<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

impl<T> From<(T, T)> for Point<T> {
    fn from(p: (T, T)) -> Self {
        Self { x: p.0, y: p.1 }
    }
}

impl<T> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub w: i16,
    pub h: i16,
}

impl Rect {
    pub fn new(x: i16, y: i16, w: i16, h: i16) -> Self {
        Rect { x, y, w, h }
    }
}

/// 12-bit color, 4 bits per component: `0xRGB`.
pub type Rgb4 = u16;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<Rgb4> for Color {
    fn from(c: Rgb4) -> Self {
        let r = ((c >> 8) & 0xf) as u8;
        let g = ((c >> 4) & 0xf) as u8;
        let b = (c & 0xf) as u8;

        // We only have 4 bits worth of intensity per color. Copy them to
        // the high bits so we have enough luminosity.
        Color {
            r: (r << 4) | r,
            g: (g << 4) | g,
            b: (b << 4) | b,
        }
    }
}

/// Offsets into `ACTION_COLORS`. Block colors come first, indexed by `TrackStep::color`.
pub const COLOR_EDGE_BG: usize = 24;
pub const COLOR_EDGE_FG: usize = 25;
pub const COLOR_BALL_BG: usize = 26;
pub const COLOR_BALL_FG: usize = 27;
pub const COLOR_STRIPE: usize = 28;
pub const COLOR_BACKGROUND: usize = 44;
pub const NUM_ACTION_COLORS: usize = 52;

/// Colors of the track, faded in and out as a whole.
///
/// Block colors are indexed by pitch band, collected blocks use the inactive band of the same
/// pitch.
pub const ACTION_COLORS: [Rgb4; NUM_ACTION_COLORS] = [
    // Active blocks
    0x810, 0x910, 0xA20, 0xB20, 0xB30, 0xC40, 0xD50, 0xD60, 0xD70, 0xE80, 0xE90, 0xFA0,
    // Inactive blocks
    0x300, 0x300, 0x310, 0x310, 0x310, 0x410, 0x420, 0x420, 0x420, 0x430, 0x430, 0x530,
    // Edges
    0x303, 0x704,
    // Ball
    0x909, 0xDAA,
    // Stripes
    0x505, 0x606, 0x606, 0x707, 0x707, 0x808, 0x909, 0x909,
    0xA0A, 0x909, 0x808, 0x808, 0x707, 0x707, 0x606, 0x505,
    // Background
    0x000, 0x001, 0x002, 0x003, 0x004, 0x005, 0x006, 0x007,
];

pub const HEADER_PEN: u8 = 5;
/// Colors of the header rows. Pen 5 is used for text, and the logo uses pens 5 to 7.
pub const HEADER_PALETTE: [Rgb4; 1 << DISP_DEPTH] =
    [0x000, 0x000, 0x000, 0x000, 0x000, 0xB8C, 0x425, 0x94A];

/// Frames taken by a complete fade, two frames per intensity step.
pub const NUM_FADE_FRAMES: u16 = 0x20;

/// Moves every component of `current` one intensity step towards `target`.
///
/// Returns true while at least one color differs from its target.
pub fn fade_step(current: &mut [Rgb4], target: &[Rgb4]) -> bool {
    let mut fading = false;

    for (cur, &tgt) in current.iter_mut().zip(target.iter()) {
        let mut next = 0;
        for shift in [0, 4, 8].iter() {
            let c = (*cur >> shift) & 0xf;
            let t = (tgt >> shift) & 0xf;
            let c = if c < t {
                c + 1
            } else if c > t {
                c - 1
            } else {
                c
            };
            next |= c << shift;
        }
        *cur = next;
        fading |= next != tgt;
    }

    fading
}

/// Fades the track colors in from black, or out to black.
#[derive(Debug)]
pub struct Fader {
    fade_in: bool,
    frame: u16,
}

impl Fader {
    pub fn new(fade_in: bool) -> Self {
        Fader { fade_in, frame: 0 }
    }

    /// Advances the fade by one frame. Colors only change every other frame.
    ///
    /// Returns false once the fade is complete.
    pub fn update(&mut self, colors: &mut [Rgb4; NUM_ACTION_COLORS]) -> bool {
        let delay = self.frame % 2 == 1;
        self.frame = self.frame.saturating_add(1);
        if delay {
            return self.frame < NUM_FADE_FRAMES;
        }

        let target = if self.fade_in {
            ACTION_COLORS
        } else {
            [0; NUM_ACTION_COLORS]
        };
        let fading = fade_step(colors, &target);
        trace!("fade frame {}: {:x?}", self.frame, &colors[..4]);
        fading
    }
}
