//! Per-frame display program, modelled after a copper list.
//!
//! The layout is fixed: sprite placement and colors, the start of the first track scanline, one
//! entry per track scanline and the score glyph blits. Only values change from one frame to the
//! next. Two lists are kept so the one being displayed is never written.

use crate::gfx::{Rgb4, DRAW_HEIGHT, WORDS_PER_ROW};

/// Words fetched for a scanline: the visible width plus one for the fine scroll.
pub const FETCH_WORDS: usize = crate::gfx::DISP_WIDTH / 16 + 1;
/// Bytes skipped after each fetched scanline when the shift does not change.
pub const BASE_MODULUS: i16 = ((WORDS_PER_ROW - FETCH_WORDS) * 2) as i16;
/// Colors 1 to 6 can be set per scanline, color 0 and 7 are fixed.
pub const NUM_SCANLINE_COLORS: usize = 6;
pub const NUM_SPRITE_COLORS: usize = 16;
pub const NUM_SCORE_GLYPHS: usize = 4;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Scanline {
    /// Bytes added to the bitplane pointers after this scanline is fetched.
    pub modulus: i16,
    /// Fine scroll, the same 4-bit value for odd and even planes.
    pub scroll: u8,
    /// Colors 1 to 6.
    pub colors: [Rgb4; NUM_SCANLINE_COLORS],
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpritePlacement {
    /// Screen position of the top-left corner.
    pub x: i16,
    pub y: i16,
    pub frame: u8,
}

#[derive(Debug, Clone)]
pub struct CopperList {
    sprite: SpritePlacement,
    sprite_colors: [Rgb4; NUM_SPRITE_COLORS],
    /// Modulus applied after the last header row, positioning the first track scanline.
    first_modulus: i16,
    rows: [Scanline; DRAW_HEIGHT],
    glyphs: [u8; NUM_SCORE_GLYPHS],
}

impl Default for CopperList {
    fn default() -> Self {
        CopperList {
            sprite: Default::default(),
            sprite_colors: [0; NUM_SPRITE_COLORS],
            first_modulus: BASE_MODULUS,
            rows: [Scanline {
                modulus: BASE_MODULUS,
                ..Default::default()
            }; DRAW_HEIGHT],
            glyphs: [0; NUM_SCORE_GLYPHS],
        }
    }
}

impl CopperList {
    /// Positions the first track scanline `coarse` words right of the unshifted fetch start.
    pub fn set_first_row(&mut self, coarse: i16) {
        self.first_modulus = BASE_MODULUS + coarse * 2;
    }

    /// Sets the fine scroll of scanline `row`, and the change of its coarse shift, in words,
    /// towards the scanline below it.
    pub fn set_scanline_shift(&mut self, row: usize, coarse_delta: i16, fine: u8) {
        let scanline = &mut self.rows[row];
        scanline.modulus = BASE_MODULUS + coarse_delta * 2;
        scanline.scroll = (fine & 0xf) | ((fine & 0xf) << 4);
    }

    pub fn set_scanline_colors(&mut self, row: usize, colors: [Rgb4; NUM_SCANLINE_COLORS]) {
        self.rows[row].colors = colors;
    }

    pub fn set_sprite(&mut self, sprite: SpritePlacement) {
        self.sprite = sprite;
    }

    pub fn set_sprite_colors(&mut self, colors: [Rgb4; NUM_SPRITE_COLORS]) {
        self.sprite_colors = colors;
    }

    /// Sets the font glyph blitted in score slot `slot`.
    pub fn set_glyph(&mut self, slot: usize, glyph: u8) {
        self.glyphs[slot] = glyph;
    }

    pub fn sprite(&self) -> SpritePlacement {
        self.sprite
    }

    pub fn sprite_colors(&self) -> &[Rgb4; NUM_SPRITE_COLORS] {
        &self.sprite_colors
    }

    pub fn first_modulus(&self) -> i16 {
        self.first_modulus
    }

    pub fn scanline(&self, row: usize) -> &Scanline {
        &self.rows[row]
    }

    pub fn glyphs(&self) -> &[u8; NUM_SCORE_GLYPHS] {
        &self.glyphs
    }
}

/// The displayed list and the one being prepared.
#[derive(Debug, Default)]
pub struct DisplayLists {
    lists: [CopperList; 2],
    front: usize,
}

impl DisplayLists {
    pub fn front(&self) -> &CopperList {
        &self.lists[self.front]
    }

    pub fn back_mut(&mut self) -> &mut CopperList {
        &mut self.lists[self.front ^ 1]
    }

    /// Makes the back list the displayed one. Only call this between frames.
    pub fn swap(&mut self) {
        self.front ^= 1;
    }
}
