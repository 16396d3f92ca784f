//! Planar bitmaps and the drawing operations issued on them.
//!
//! Every operation works on one bitplane at a time, except `char` which draws into every plane
//! selected by its color. Pixels falling outside the bitmap are silently dropped.

use crate::gfx::{
    font::{Font, GLYPH_HEIGHT, GLYPH_WIDTH},
    Point, Rect,
};

/// A bitmap and one of its planes, used to mask a drawing operation.
pub type Mask<'a> = (&'a PlanarBitmap, usize);

/// Drawing operations on a planar bitmap.
pub trait Blitter {
    /// Copies a `size` area of `src_plane` of `src` into `dst_plane`. If `replace_bg` is set the
    /// destination area is overwritten, otherwise source pixels are OR'd into it.
    #[allow(clippy::too_many_arguments)]
    fn copy(
        &mut self,
        src: &PlanarBitmap,
        src_plane: usize,
        src_pos: Point<i16>,
        dst_plane: usize,
        dst_pos: Point<i16>,
        size: Point<i16>,
        replace_bg: bool,
    );
    /// Sets or clears `rect`. With a mask, set pixels are OR'd with the mask and cleared pixels
    /// are AND'ed with it.
    fn rect(&mut self, plane: usize, rect: Rect, mask: Option<Mask>, set: bool);
    /// Draws a line from `p0` to `p1`, both included, with one pixel per step along the major
    /// axis. Pixels are OR'd, so steep lines can be used as fill outlines.
    fn line(&mut self, plane: usize, p0: Point<i16>, p1: Point<i16>);
    /// Fills `rect` row by row, scanning from right to left and toggling the fill state on
    /// every set pixel.
    fn fill(&mut self, plane: usize, rect: Rect);
    /// Draws glyph `glyph` of `font` with its top-left corner at `pos`, into every plane whose
    /// bit is set in `color`.
    fn char(&mut self, font: &Font, glyph: u8, pos: Point<i16>, color: u8, replace_bg: bool);
}

/// Bitmap stored as one array of 16-bit words per plane, the leftmost pixel of a word in its
/// most significant bit.
#[derive(Clone)]
pub struct PlanarBitmap {
    width: usize,
    height: usize,
    words_per_row: usize,
    planes: Vec<Vec<u16>>,
}

impl PlanarBitmap {
    pub fn new(depth: usize, width: usize, height: usize) -> Self {
        let words_per_row = (width + 15) / 16;
        PlanarBitmap {
            width,
            height,
            words_per_row,
            planes: vec![vec![0u16; words_per_row * height]; depth],
        }
    }

    pub fn depth(&self) -> usize {
        self.planes.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn words_per_row(&self) -> usize {
        self.words_per_row
    }

    pub fn plane(&self, plane: usize) -> &[u16] {
        &self.planes[plane]
    }

    /// Word index and bit mask of a pixel, None if it is outside the bitmap.
    fn offset(&self, x: i32, y: i32) -> Option<(usize, u16)> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        Some((y * self.words_per_row + x / 16, 0x8000 >> (x % 16)))
    }

    pub fn pixel(&self, plane: usize, x: i32, y: i32) -> bool {
        match (self.planes.get(plane), self.offset(x, y)) {
            (Some(p), Some((idx, bit))) => p[idx] & bit != 0,
            _ => false,
        }
    }

    pub fn set_pixel(&mut self, plane: usize, x: i32, y: i32, on: bool) {
        if let Some((idx, bit)) = self.offset(x, y) {
            if let Some(p) = self.planes.get_mut(plane) {
                if on {
                    p[idx] |= bit;
                } else {
                    p[idx] &= !bit;
                }
            }
        }
    }

    /// Color index of a pixel, combining all planes.
    pub fn color(&self, x: i32, y: i32) -> u8 {
        (0..self.depth()).fold(0, |color, plane| {
            color | ((self.pixel(plane, x, y) as u8) << plane)
        })
    }

    pub fn clear(&mut self) {
        for plane in self.planes.iter_mut() {
            plane.iter_mut().for_each(|w| *w = 0);
        }
    }
}

/// `n / d` rounded to the nearest integer, halves rounded up.
fn div_round(n: i32, d: i32) -> i32 {
    (2 * n + d).div_euclid(2 * d)
}

impl Blitter for PlanarBitmap {
    fn copy(
        &mut self,
        src: &PlanarBitmap,
        src_plane: usize,
        src_pos: Point<i16>,
        dst_plane: usize,
        dst_pos: Point<i16>,
        size: Point<i16>,
        replace_bg: bool,
    ) {
        for y in 0..size.y as i32 {
            for x in 0..size.x as i32 {
                let on = src.pixel(src_plane, src_pos.x as i32 + x, src_pos.y as i32 + y);
                let (dx, dy) = (dst_pos.x as i32 + x, dst_pos.y as i32 + y);
                if replace_bg || on {
                    self.set_pixel(dst_plane, dx, dy, on);
                }
            }
        }
    }

    fn rect(&mut self, plane: usize, rect: Rect, mask: Option<Mask>, set: bool) {
        for y in rect.y as i32..(rect.y + rect.h) as i32 {
            for x in rect.x as i32..(rect.x + rect.w) as i32 {
                let on = match mask {
                    None => set,
                    Some((mask, mask_plane)) => {
                        let cur = self.pixel(plane, x, y);
                        let m = mask.pixel(mask_plane, x, y);
                        if set {
                            cur || m
                        } else {
                            cur && m
                        }
                    }
                };
                self.set_pixel(plane, x, y, on);
            }
        }
    }

    fn line(&mut self, plane: usize, p0: Point<i16>, p1: Point<i16>) {
        let (x0, y0) = (p0.x as i32, p0.y as i32);
        let dx = p1.x as i32 - x0;
        let dy = p1.y as i32 - y0;
        let steps = dx.abs().max(dy.abs());

        if steps == 0 {
            self.set_pixel(plane, x0, y0, true);
            return;
        }

        for i in 0..=steps {
            let x = x0 + div_round(dx * i, steps);
            let y = y0 + div_round(dy * i, steps);
            self.set_pixel(plane, x, y, true);
        }
    }

    fn fill(&mut self, plane: usize, rect: Rect) {
        for y in rect.y as i32..(rect.y + rect.h) as i32 {
            let mut inside = false;
            for x in (rect.x as i32..(rect.x + rect.w) as i32).rev() {
                let on = self.pixel(plane, x, y);
                inside ^= on;
                self.set_pixel(plane, x, y, on || inside);
            }
        }
    }

    fn char(&mut self, font: &Font, glyph: u8, pos: Point<i16>, color: u8, replace_bg: bool) {
        for plane in (0..self.depth()).filter(|p| color & (1 << p) != 0) {
            for y in 0..GLYPH_HEIGHT {
                for x in 0..GLYPH_WIDTH {
                    let on = font.pixel(glyph, x, y);
                    if replace_bg || on {
                        let (dx, dy) = (pos.x as i32 + x as i32, pos.y as i32 + y as i32);
                        self.set_pixel(plane, dx, dy, on);
                    }
                }
            }
        }
    }
}
