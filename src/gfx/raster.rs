//! Software scanout: turns the planar display bitmap and a display list into RGB pixels.

use crate::gfx::{
    blit::PlanarBitmap,
    copper::{CopperList, BASE_MODULUS, FETCH_WORDS},
    font::Font,
    scene,
    sprite::BallFrames,
    Color, Rgb4, BITMAP_HEIGHT, BITMAP_WIDTH, DISP_DEPTH, DISP_HEIGHT, DISP_WIDTH, DRAW_TOP,
    HEADER_PALETTE, VIEW_OFFSET,
};

/// Word fetched first on each row: one word left of the view, consumed by the fine scroll.
pub const FETCH_START: i64 = (VIEW_OFFSET / 16) as i64 - 1;
/// Color shown where a track scanline is fetched from outside the bitmap.
const OUTSIDE_COLOR: u8 = 6;

type Palette = [Color; 1 << DISP_DEPTH];

fn to_palette(colors: &[Rgb4]) -> Palette {
    let mut palette = [Color::default(); 1 << DISP_DEPTH];
    for (dst, &c) in palette.iter_mut().zip(colors.iter()) {
        *dst = Color::from(c);
    }
    palette
}

pub struct Scanout {
    font: Font,
    balls: BallFrames,
    frame: Vec<Color>,
}

impl Default for Scanout {
    fn default() -> Self {
        Scanout::new()
    }
}

impl Scanout {
    pub fn new() -> Self {
        Scanout {
            font: Font::new(),
            balls: BallFrames::new(),
            frame: vec![Color::default(); DISP_WIDTH * DISP_HEIGHT],
        }
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    /// Last presented frame, row by row.
    pub fn pixels(&self) -> &[Color] {
        &self.frame
    }

    /// Runs `list` over `bitmap`: blits the score glyphs into it, then renders the frame.
    pub fn present(&mut self, list: &CopperList, bitmap: &mut PlanarBitmap) -> &[Color] {
        for (slot, &glyph) in list.glyphs().iter().enumerate() {
            scene::draw_score_glyph(bitmap, &self.font, slot, glyph);
        }

        self.render_playfield(list, bitmap);
        self.render_sprite(list);

        &self.frame
    }

    /// Follows the bitplane pointer from row to row the way the display fetches it, so the
    /// shift of every track scanline comes from the modulus chain and its fine scroll.
    fn render_playfield(&mut self, list: &CopperList, bitmap: &PlanarBitmap) {
        let header_palette = to_palette(&HEADER_PALETTE);
        let mut ptr = FETCH_START;

        for (y, line) in self.frame.chunks_exact_mut(DISP_WIDTH).enumerate() {
            let (fine, palette, modulus) = if y < DRAW_TOP {
                let modulus = if y == DRAW_TOP - 1 {
                    list.first_modulus()
                } else {
                    BASE_MODULUS
                };
                (0, header_palette, modulus)
            } else {
                let scanline = list.scanline(y - DRAW_TOP);
                let mut colors = [0; 1 << DISP_DEPTH];
                colors[1..=scanline.colors.len()].copy_from_slice(&scanline.colors);
                (scanline.scroll & 0xf, to_palette(&colors), scanline.modulus)
            };

            let start = ptr * 16 + 16 - fine as i64;
            for (x, pixel) in line.iter_mut().enumerate() {
                let linear = start + x as i64;
                let row = linear.div_euclid(BITMAP_WIDTH as i64);
                let col = linear.rem_euclid(BITMAP_WIDTH as i64);
                let color = if row < 0 || row >= BITMAP_HEIGHT as i64 {
                    OUTSIDE_COLOR
                } else {
                    bitmap.color(col as i32, row as i32)
                };
                *pixel = palette[color as usize];
            }

            ptr += FETCH_WORDS as i64 + modulus as i64 / 2;
        }
    }

    fn render_sprite(&mut self, list: &CopperList) {
        let sprite = list.sprite();
        let colors = list.sprite_colors();

        for (dy, row) in self.balls.frame(sprite.frame as usize).iter().enumerate() {
            let y = sprite.y as i32 + dy as i32;
            if y < 0 || y >= DISP_HEIGHT as i32 {
                continue;
            }
            for (dx, &p) in row.iter().enumerate() {
                let x = sprite.x as i32 + dx as i32;
                if p != 0 && x >= 0 && x < DISP_WIDTH as i32 {
                    self.frame[y as usize * DISP_WIDTH + x as usize] =
                        Color::from(colors[p as usize]);
                }
            }
        }
    }
}
