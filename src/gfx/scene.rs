//! Static content of the play screen: the header with logo, title and score, and the track
//! outline the compositor scrolls.

use crate::{
    gfx::{
        blit::{Blitter, PlanarBitmap},
        compositor::{SCORE_GLYPH_POS, SCORE_LEFT},
        font::{Font, GLYPH_HEIGHT, GLYPH_SPACING},
        Point, Rect, BITMAP_WIDTH, DISP_DEPTH, DISP_HEIGHT, DISP_WIDTH, DRAW_CENTER_X,
        DRAW_HEIGHT, DRAW_TOP, HEADER_PEN, LANE_WIDTH, VIEW_OFFSET,
    },
    module::TITLE_LEN,
    tables::FAR_NEAR_RATIO,
};

const LOGO_TEXT: &str = "MOD RUNNER";
const LOGO_SCALE: usize = 3;
/// Offset of the logo shadow, drawn in the second logo plane.
const LOGO_SHADOW: usize = 2;
const LOGO_TOP: i16 = 4;
pub const LOGO_HEIGHT: usize = GLYPH_HEIGHT * LOGO_SCALE + LOGO_SHADOW;

/// Header text row, centered between the logo and the track.
pub const HEADER_TEXT_TOP: i16 = {
    let logo_bottom = LOGO_TOP + LOGO_HEIGHT as i16;
    logo_bottom + (DRAW_TOP as i16 - logo_bottom - GLYPH_HEIGHT as i16) / 2
};

const STRIPE_WIDTH: i16 = 4;
const BORDER_WIDTH: i16 = 17;
const BLOCK_WIDTH: i16 = 3 * LANE_WIDTH / 5;

/// Track line colors: 1 stripes, 2 to 4 the lanes, 5 the border, 6 the background.
const TRACK_LINE_COLORS: [u8; 18] = [1, 1, 1, 1, 5, 5, 5, 5, 2, 2, 3, 3, 4, 4, 6, 6, 6, 6];

/// Screen X of the track lines at the near plane, relative to the track center.
fn track_near_x() -> [i16; 18] {
    let half_track = 3 * LANE_WIDTH / 2;
    [
        // Lane stripes
        -LANE_WIDTH / 2 - STRIPE_WIDTH / 2,
        -LANE_WIDTH / 2 + STRIPE_WIDTH / 2,
        LANE_WIDTH / 2 - STRIPE_WIDTH / 2,
        LANE_WIDTH / 2 + STRIPE_WIDTH / 2,
        // Borders
        -half_track - BORDER_WIDTH,
        -half_track,
        half_track,
        half_track + BORDER_WIDTH,
        // Blocks, left to right lane
        -BLOCK_WIDTH / 2 - LANE_WIDTH,
        BLOCK_WIDTH / 2 - LANE_WIDTH,
        -BLOCK_WIDTH / 2,
        BLOCK_WIDTH / 2,
        -BLOCK_WIDTH / 2 + LANE_WIDTH,
        BLOCK_WIDTH / 2 + LANE_WIDTH,
        // Screen edges
        -DRAW_CENTER_X,
        DRAW_CENTER_X - 1,
        // Outer border edges
        -half_track - BORDER_WIDTH - 1,
        half_track + BORDER_WIDTH + 1,
    ]
}

/// The same lines at the far plane.
fn track_far_x(near_x: &[i16; 18]) -> [i16; 18] {
    let mut far_x = *near_x;
    for x in far_x.iter_mut().take(14) {
        *x /= FAR_NEAR_RATIO as i16;
    }
    // The outer border edges cannot be projected accurately, offset them from the inner ones.
    far_x[16] = far_x[4] - 1;
    far_x[17] = far_x[7] + 1;
    far_x
}

pub fn clear_body<B: Blitter>(dst: &mut B) {
    let body = Rect::new(0, DRAW_TOP as i16, BITMAP_WIDTH as i16, DRAW_HEIGHT as i16);
    for plane in 0..DISP_DEPTH {
        dst.rect(plane, body, None, false);
    }
}

/// Draws the outline of every track region, then fills them. Each region gets its own color,
/// so the compositor can recolor it per scanline.
pub fn draw_track<B: Blitter>(dst: &mut B) {
    clear_body(dst);

    let near_x = track_near_x();
    let far_x = track_far_x(&near_x);
    let body = Rect::new(0, DRAW_TOP as i16, BITMAP_WIDTH as i16, DRAW_HEIGHT as i16);

    for plane in 0..DISP_DEPTH {
        for (i, &color) in TRACK_LINE_COLORS.iter().enumerate() {
            if color & (1 << plane) != 0 {
                dst.line(
                    plane,
                    Point::new(far_x[i] + DRAW_CENTER_X, DRAW_TOP as i16),
                    Point::new(near_x[i] + DRAW_CENTER_X, DISP_HEIGHT as i16 - 1),
                );
            }
        }
        dst.fill(plane, body);
    }
}

/// Draws `text` at screen position `pos` of the header.
pub fn draw_text<B: Blitter>(
    dst: &mut B,
    font: &Font,
    text: &str,
    pos: Point<i16>,
    color: u8,
    replace_bg: bool,
) {
    let mut left = pos.x + VIEW_OFFSET as i16;
    for c in text.bytes() {
        dst.char(
            font,
            Font::glyph_index(c),
            Point::new(left, pos.y),
            color,
            replace_bg,
        );
        left += GLYPH_SPACING as i16;
    }
}

/// Replaces the title in the header with `title`, centered.
pub fn draw_title<B: Blitter>(dst: &mut B, font: &Font, title: &str) {
    let title: String = title.chars().take(TITLE_LEN).collect();
    let center = DISP_WIDTH as i16 / 2;
    let text_left = center - Font::text_width(title.len()) as i16 / 2;

    let clear_width = Font::text_width(TITLE_LEN) as i16;
    let clear = Rect::new(
        center - clear_width / 2 + VIEW_OFFSET as i16,
        HEADER_TEXT_TOP,
        clear_width,
        GLYPH_HEIGHT as i16,
    );
    for plane in (0..DISP_DEPTH).filter(|p| HEADER_PEN & (1 << p) != 0) {
        dst.rect(plane, clear, None, false);
    }

    draw_text(
        dst,
        font,
        &title,
        Point::new(text_left, HEADER_TEXT_TOP),
        HEADER_PEN,
        true,
    );
}

pub fn init_score<B: Blitter>(dst: &mut B, font: &Font) {
    draw_text(
        dst,
        font,
        "  0.0%",
        Point::new(SCORE_LEFT, HEADER_TEXT_TOP),
        HEADER_PEN,
        true,
    );
}

/// Draws glyph `glyph` in score slot `slot`.
pub fn draw_score_glyph<B: Blitter>(dst: &mut B, font: &Font, slot: usize, glyph: u8) {
    let left = SCORE_LEFT + SCORE_GLYPH_POS[slot] * GLYPH_SPACING as i16 + VIEW_OFFSET as i16;
    dst.char(
        font,
        glyph,
        Point::new(left, HEADER_TEXT_TOP),
        HEADER_PEN,
        true,
    );
}

/// Two-plane logo: the title in large letters, and their shadow.
pub fn make_logo(font: &Font) -> PlanarBitmap {
    let width = Font::text_width(LOGO_TEXT.len()) * LOGO_SCALE + LOGO_SHADOW;
    let mut logo = PlanarBitmap::new(2, width, LOGO_HEIGHT);

    for (i, c) in LOGO_TEXT.bytes().enumerate() {
        let glyph = Font::glyph_index(c);
        for y in 0..GLYPH_HEIGHT * LOGO_SCALE {
            for x in 0..GLYPH_SPACING * LOGO_SCALE {
                if font.pixel(glyph, x / LOGO_SCALE, y / LOGO_SCALE) {
                    let lx = (i * GLYPH_SPACING * LOGO_SCALE + x) as i32;
                    logo.set_pixel(0, lx, y as i32, true);
                    let shadow = LOGO_SHADOW as i32;
                    logo.set_pixel(1, lx + shadow, y as i32 + shadow, true);
                }
            }
        }
    }

    logo
}

/// Copies the logo centered at the top of the header. Logo colors 1 to 3 land on header colors
/// 5 to 7: display planes 0 and 1 get logo planes 0 and 1, plane 2 gets both.
pub fn draw_logo<B: Blitter>(dst: &mut B, logo: &PlanarBitmap) {
    let left = ((DISP_WIDTH - logo.width()) / 2 + VIEW_OFFSET) as i16;
    let size = Point::new(logo.width() as i16, logo.height() as i16);
    let origin = Point::new(0, 0);
    let pos = Point::new(left, LOGO_TOP);

    for plane in 0..logo.depth() {
        dst.copy(logo, plane, origin, plane, pos, size, true);
        dst.copy(logo, plane, origin, 2, pos, size, plane == 0);
    }
}
