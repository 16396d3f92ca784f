//! Builds the display list of every frame.
//!
//! The track bitmap is drawn once. Perspective scrolling comes entirely from the display list:
//! each scanline gets a horizontal shift interpolated between the near and far planes, and colors
//! picked from the step found at that scanline's depth.

use log::trace;

use crate::{
    gfx::{
        copper::{
            CopperList, DisplayLists, SpritePlacement, NUM_SCANLINE_COLORS, NUM_SCORE_GLYPHS,
            NUM_SPRITE_COLORS,
        },
        sprite::{BALL_EDGE, NUM_BALL_COLORS, NUM_BALL_FRAMES},
        Rgb4, COLOR_BACKGROUND, COLOR_BALL_BG, COLOR_BALL_FG, COLOR_EDGE_BG, COLOR_EDGE_FG,
        COLOR_STRIPE, DISP_WIDTH, DRAW_HEIGHT, DRAW_TOP, NUM_ACTION_COLORS,
    },
    tables::{self, BALL_Z, BLOCK_GAP_DEPTH, FAR_NEAR_RATIO, NEAR_Z},
    track::{TrackStep, NUM_STEPS_DELAY, NUM_VISIBLE_STEPS},
};

/// Share of the ball offset taken by the camera, in percent.
const CAMERA_PAN_PERCENT: i32 = 74;
const BALL_ANGLE_LIMIT: i32 = ((NUM_BALL_FRAMES as i32) << 11) / 2 - 1;
const BALL_MOUSE_ROTATE_SHIFT: u32 = 7;
/// Camera depth units per step of the ball color cycle.
const COLOR_CYCLE_Z_SHIFT: u32 = 9;
const COLOR_CYCLE_MAX_SHIFT: i16 = 3;
const COLOR_CYCLE_MASK: u16 = (1 << NUM_BALL_COLORS) - 1;

/// Screen position of the score, and offset of each score glyph slot (tenths, ones, tens,
/// hundreds) within the `"XXX.X%"` text.
pub const SCORE_LEFT: i16 = (DISP_WIDTH as i16 - 20) - 6 * 6;
pub const SCORE_GLYPH_POS: [i16; NUM_SCORE_GLYPHS] = [4, 2, 1, 0];
pub const GLYPH_DIGIT_ZERO: u8 = 0x10;

/// Everything the compositor needs to know about the player for one frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameInput {
    /// Lateral ball position in world units, 0 being the center lane.
    pub player_x: i16,
    /// Depth of the near plane of the camera, `BLOCK_GAP_DEPTH` per step.
    pub camera_z: u32,
    /// Camera depth change per frame.
    pub camera_z_inc: u32,
    /// Track edges nearer than this are lit.
    pub vu_meter_z: u32,
    /// Score in tenths of a percent.
    pub score_frac: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Depth of the near plane, and of the farthest scanline.
    pub z_start: u32,
    pub z_end: u32,
    /// Steps crossed between the near and the far plane.
    pub steps_advanced: usize,
}

pub struct Compositor {
    z_incs: [u16; DRAW_HEIGHT],
    colors: [Rgb4; NUM_ACTION_COLORS],
    ball_top: i16,
    last_sprite_x: i16,
    ball_angle: i32,
    color_mask: u16,
    last_cycle: u16,
}

impl Default for Compositor {
    fn default() -> Self {
        Compositor::new()
    }
}

/// Splits a shift into the word offset of the fetch start and the fine scroll.
fn decompose_shift(shift: i32) -> (i16, u8) {
    let coarse = (15 - shift).div_euclid(16);
    (coarse as i16, (coarse * 16 + shift) as u8)
}

impl Compositor {
    /// Track colors start black, ready to be faded in.
    pub fn new() -> Self {
        Compositor {
            z_incs: tables::z_increments(),
            colors: [0; NUM_ACTION_COLORS],
            ball_top: DRAW_TOP as i16 + tables::project_row(BALL_Z) as i16,
            last_sprite_x: DISP_WIDTH as i16 / 2,
            ball_angle: 0,
            color_mask: 0x7F,
            last_cycle: 0,
        }
    }

    pub fn colors(&self) -> &[Rgb4; NUM_ACTION_COLORS] {
        &self.colors
    }

    pub fn colors_mut(&mut self) -> &mut [Rgb4; NUM_ACTION_COLORS] {
        &mut self.colors
    }

    /// Writes the back display list for the frame and makes it the displayed one.
    ///
    /// `steps` starts with the step at the near plane.
    pub fn update(
        &mut self,
        lists: &mut DisplayLists,
        steps: &[TrackStep],
        input: &FrameInput,
    ) -> FrameStats {
        let list = lists.back_mut();

        let ball_sx = input.player_x as i32 * (NUM_VISIBLE_STEPS - NUM_STEPS_DELAY) as i32
            / NUM_VISIBLE_STEPS as i32;
        let camera_x = ball_sx * CAMERA_PAN_PERCENT / 100;
        let sprite_x = (DISP_WIDTH / 2) as i32 + ball_sx - camera_x;

        update_shifts(list, camera_x);
        let stats = self.update_rows(list, steps, input);
        self.update_sprite(list, sprite_x as i16, input);
        update_score(list, input.score_frac);

        trace!(
            "frame: camera_x {} sprite_x {} {:?}",
            camera_x,
            sprite_x,
            stats
        );

        lists.swap();
        stats
    }

    fn update_rows(
        &self,
        list: &mut CopperList,
        steps: &[TrackStep],
        input: &FrameInput,
    ) -> FrameStats {
        let z_start = input.camera_z + NEAR_Z;
        let mut z = z_start;
        let mut z_since_step = input.camera_z % BLOCK_GAP_DEPTH;
        let mut step_idx = 0;
        let no_step = TrackStep::default();

        for (i, &inc) in self.z_incs.iter().enumerate() {
            z += inc as u32;
            z_since_step += inc as u32;
            while z_since_step >= BLOCK_GAP_DEPTH {
                z_since_step -= BLOCK_GAP_DEPTH;
                step_idx += 1;
            }

            let row = DRAW_HEIGHT - 1 - i;
            let step = steps.get(step_idx).unwrap_or(&no_step);
            list.set_scanline_colors(row, self.row_colors(row, z, step, input));
        }

        FrameStats {
            z_start,
            z_end: z,
            steps_advanced: step_idx,
        }
    }

    fn row_colors(
        &self,
        row: usize,
        z: u32,
        step: &TrackStep,
        input: &FrameInput,
    ) -> [Rgb4; NUM_SCANLINE_COLORS] {
        let colors = &self.colors;
        let mut row_colors = [0; NUM_SCANLINE_COLORS];

        // Dashed center stripes.
        if z & 0x1000 != 0 {
            row_colors[0] = colors[COLOR_STRIPE + ((z >> 13) & 0xf) as usize];
        }

        // Lanes, the block of the step if it sits on them.
        for lane in 1..=3u8 {
            if step.active_lane == lane {
                row_colors[lane as usize] = colors[step.color as usize];
            }
        }

        row_colors[4] = if z - input.camera_z < input.vu_meter_z {
            colors[COLOR_EDGE_FG]
        } else {
            colors[COLOR_EDGE_BG]
        };
        row_colors[5] = colors[COLOR_BACKGROUND + ((DRAW_TOP + row) >> 5)];

        row_colors
    }

    fn update_sprite(&mut self, list: &mut CopperList, sprite_x: i16, input: &FrameInput) {
        let dx = sprite_x as i32 - self.last_sprite_x as i32;
        self.last_sprite_x = sprite_x;

        let bound = BALL_ANGLE_LIMIT * dx.signum();
        let inc = ((input.camera_z_inc as i32) << 1) + (dx.abs() << BALL_MOUSE_ROTATE_SHIFT);
        self.ball_angle = if dx < 0 || (dx == 0 && self.ball_angle > 0) {
            (self.ball_angle - inc).max(bound)
        } else {
            (self.ball_angle + inc).min(bound)
        };
        let frame = ((self.ball_angle + BALL_ANGLE_LIMIT + 1) >> 11) as u8;

        list.set_sprite(SpritePlacement {
            x: sprite_x - (BALL_EDGE / 2) as i16,
            y: self.ball_top,
            frame,
        });

        let mut sprite_colors = [0; NUM_SPRITE_COLORS];
        for (i, color) in sprite_colors
            .iter_mut()
            .enumerate()
            .skip(1)
            .take(NUM_BALL_COLORS as usize)
        {
            *color = if self.color_mask & (1 << (i - 1)) != 0 {
                self.colors[COLOR_BALL_BG]
            } else {
                self.colors[COLOR_BALL_FG]
            };
        }
        list.set_sprite_colors(sprite_colors);

        // Rotate the two-color pattern of the ball as the camera moves forward. The new pattern
        // shows from the next frame on.
        let cycle = (input.camera_z >> COLOR_CYCLE_Z_SHIFT) as u16;
        if input.camera_z == 0 {
            self.last_cycle = 0;
        }
        let shift = (cycle.wrapping_sub(self.last_cycle) as i16)
            .max(0)
            .min(COLOR_CYCLE_MAX_SHIFT) as u16;
        self.last_cycle = cycle;

        let mask = self.color_mask;
        self.color_mask = ((mask << shift) | (mask >> (NUM_BALL_COLORS as u16 - shift)))
            & COLOR_CYCLE_MASK;
    }
}

/// Interpolates the shift of every scanline, from `-camera_x` at the bottom to
/// `-camera_x / FAR_NEAR_RATIO` at the top.
fn update_shifts(list: &mut CopperList, camera_x: i32) {
    let shift_start = -camera_x;
    let shift_end = -camera_x / FAR_NEAR_RATIO as i32;
    let slope = ((shift_end - shift_start) << 14) / DRAW_HEIGHT as i32;
    let err_inc = slope.abs();
    let sign = slope.signum();

    let mut shift = shift_start;
    let mut err = 0;
    let mut coarse = [0i16; DRAW_HEIGHT];
    let mut fine = [0u8; DRAW_HEIGHT];

    for i in 0..DRAW_HEIGHT {
        let row = DRAW_HEIGHT - 1 - i;
        let (c, f) = decompose_shift(shift);
        coarse[row] = c;
        fine[row] = f;

        err += err_inc;
        if err >= 0x2000 {
            shift += sign;
            err -= 0x4000;
        }
    }

    list.set_first_row(coarse[0]);
    for row in 0..DRAW_HEIGHT {
        let delta = coarse.get(row + 1).map_or(0, |&next| next - coarse[row]);
        list.set_scanline_shift(row, delta, fine[row]);
    }
}

/// Points the score glyph blits at the digits of `score_frac`. Leading zeroes above the ones are
/// left blank.
fn update_score(list: &mut CopperList, score_frac: u16) {
    let mut frac = score_frac;
    for slot in 0..NUM_SCORE_GLYPHS {
        let glyph = if frac != 0 || slot < 2 {
            GLYPH_DIGIT_ZERO + (frac % 10) as u8
        } else {
            0
        };
        list.set_glyph(slot, glyph);
        frac /= 10;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gfx::{copper::BASE_MODULUS, ACTION_COLORS},
        tables::FAR_Z,
    };

    fn compositor() -> Compositor {
        let mut compositor = Compositor::new();
        *compositor.colors_mut() = ACTION_COLORS;
        compositor
    }

    fn track(blocks: &[(usize, u8, u8)]) -> Vec<TrackStep> {
        let mut steps = vec![TrackStep::default(); 20];
        for &(idx, lane, color) in blocks {
            steps[idx].active_lane = lane;
            steps[idx].color = color;
        }
        steps
    }

    #[test]
    fn test_depth_range() {
        let mut lists = DisplayLists::default();
        let stats = compositor().update(&mut lists, &track(&[]), &FrameInput::default());
        assert_eq!(stats.z_start, NEAR_Z);
        assert_eq!(stats.z_end, FAR_Z);
        assert_eq!(stats.steps_advanced, NUM_VISIBLE_STEPS);

        let input = FrameInput {
            camera_z: BLOCK_GAP_DEPTH * 3 + 100,
            ..Default::default()
        };
        let stats = compositor().update(&mut lists, &track(&[]), &input);
        assert_eq!(stats.z_start, NEAR_Z + input.camera_z);
        assert_eq!(stats.z_end, FAR_Z + input.camera_z);
    }

    #[test]
    fn test_block_colors() {
        let mut lists = DisplayLists::default();
        let steps = track(&[(0, 2, 3), (15, 1, 11 + 12)]);
        compositor().update(&mut lists, &steps, &FrameInput::default());
        let list = lists.front();

        let bottom = list.scanline(DRAW_HEIGHT - 1).colors;
        assert_eq!(bottom[1], 0);
        assert_eq!(bottom[2], ACTION_COLORS[3]);
        assert_eq!(bottom[3], 0);
        assert_eq!(bottom[4], ACTION_COLORS[COLOR_EDGE_BG]);
        assert_eq!(bottom[5], ACTION_COLORS[COLOR_BACKGROUND + 7]);

        // The collected block of step 15 is close to the horizon, in its darker band.
        let top = list.scanline(0).colors;
        assert_eq!(top[2], 0);
        assert_eq!(top[5], ACTION_COLORS[COLOR_BACKGROUND + 1]);
        let row = list.scanline(1).colors;
        assert_eq!(row[1], ACTION_COLORS[23]);
    }

    #[test]
    fn test_vu_meter() {
        let mut lists = DisplayLists::default();
        let input = FrameInput {
            camera_z: 12345,
            vu_meter_z: FAR_Z,
            ..Default::default()
        };
        compositor().update(&mut lists, &track(&[]), &input);
        for row in 1..DRAW_HEIGHT {
            let colors = lists.front().scanline(row).colors;
            assert_eq!(colors[4], ACTION_COLORS[COLOR_EDGE_FG], "row {}", row);
        }
        // The farthest scanline sits exactly on the far plane.
        assert_eq!(
            lists.front().scanline(0).colors[4],
            ACTION_COLORS[COLOR_EDGE_BG]
        );
    }

    #[test]
    fn test_shift_centered() {
        let mut lists = DisplayLists::default();
        compositor().update(&mut lists, &track(&[]), &FrameInput::default());
        let list = lists.front();
        assert_eq!(list.first_modulus(), BASE_MODULUS);
        for row in 0..DRAW_HEIGHT {
            assert_eq!(list.scanline(row).modulus, BASE_MODULUS);
            assert_eq!(list.scanline(row).scroll, 0);
        }
        assert_eq!(list.sprite().x, 160 - 16);
        assert_eq!(list.sprite().y, 191);
    }

    #[test]
    fn test_shift_panned() {
        let mut lists = DisplayLists::default();
        let input = FrameInput {
            player_x: 100,
            ..Default::default()
        };
        compositor().update(&mut lists, &track(&[]), &input);
        let list = lists.front();

        // ball_sx = 93, camera_x = 68: the bottom scanline is shifted by -68, the top one by
        // -68 / 7.
        assert_eq!(decompose_shift(-68), (5, 12));
        assert_eq!(list.scanline(DRAW_HEIGHT - 1).scroll, 0xCC);
        assert_eq!(decompose_shift(-9), (1, 7));
        assert_eq!(list.scanline(0).scroll, 0x77);
        assert_eq!(list.first_modulus(), BASE_MODULUS + 2);
        assert_eq!(list.sprite().x, 160 + 25 - 16);

        // The coarse shifts add up to the one of the bottom scanline.
        let total: i16 = (0..DRAW_HEIGHT - 1)
            .map(|row| (list.scanline(row).modulus - BASE_MODULUS) / 2)
            .sum();
        assert_eq!(1 + total, 5);
    }

    #[test]
    fn test_decompose_shift() {
        assert_eq!(decompose_shift(0), (0, 0));
        assert_eq!(decompose_shift(3), (0, 3));
        assert_eq!(decompose_shift(15), (0, 15));
        assert_eq!(decompose_shift(16), (-1, 0));
        assert_eq!(decompose_shift(68), (-4, 4));
        assert_eq!(decompose_shift(-1), (1, 15));
    }

    #[test]
    fn test_ball_rotation() {
        let mut compositor = compositor();
        let mut lists = DisplayLists::default();
        let steps = track(&[]);
        let mut input = FrameInput::default();

        compositor.update(&mut lists, &steps, &input);
        assert_eq!(lists.front().sprite().frame, 8);

        // Steering right tilts the ball up to the last frame.
        for x in 1..=10 {
            input.player_x = x * 50;
            compositor.update(&mut lists, &steps, &input);
        }
        assert_eq!(lists.front().sprite().frame, 16);

        // Standing still brings it back upright, as fast as the camera moves.
        input.camera_z_inc = 585;
        for _ in 0..100 {
            compositor.update(&mut lists, &steps, &input);
        }
        assert_eq!(lists.front().sprite().frame, 8);

        input.player_x -= 200;
        compositor.update(&mut lists, &steps, &input);
        assert!(lists.front().sprite().frame < 8);
    }

    #[test]
    fn test_ball_color_cycle() {
        let mut compositor = compositor();
        let mut lists = DisplayLists::default();
        let steps = track(&[]);
        let mut input = FrameInput::default();

        compositor.update(&mut lists, &steps, &input);
        let colors = *lists.front().sprite_colors();
        assert_eq!(colors[0], 0);
        assert_eq!(colors[1], ACTION_COLORS[COLOR_BALL_BG]);
        assert_eq!(colors[7], ACTION_COLORS[COLOR_BALL_BG]);
        assert_eq!(colors[8], ACTION_COLORS[COLOR_BALL_FG]);
        assert_eq!(colors[15], 0);

        // A large camera move only rotates the pattern by 3.
        input.camera_z = 0x200 * 10;
        compositor.update(&mut lists, &steps, &input);
        assert_eq!(compositor.color_mask, 0x7F << 3);
        // The rotated pattern is only displayed on the next frame.
        let colors = *lists.front().sprite_colors();
        assert_eq!(colors[1], ACTION_COLORS[COLOR_BALL_BG]);
        assert_eq!(colors[8], ACTION_COLORS[COLOR_BALL_FG]);

        input.camera_z += 0x200;
        compositor.update(&mut lists, &steps, &input);
        assert_eq!(compositor.color_mask, 0x7F << 4);
        let colors = *lists.front().sprite_colors();
        assert_eq!(colors[1], ACTION_COLORS[COLOR_BALL_FG]);
        assert_eq!(colors[3], ACTION_COLORS[COLOR_BALL_FG]);
        assert_eq!(colors[4], ACTION_COLORS[COLOR_BALL_BG]);
        assert_eq!(colors[10], ACTION_COLORS[COLOR_BALL_BG]);
        assert_eq!(colors[11], ACTION_COLORS[COLOR_BALL_FG]);

        input.camera_z += 0x200 * 3;
        compositor.update(&mut lists, &steps, &input);
        assert_eq!(compositor.color_mask, 0x3F80);

        // Wraps around 14 bits.
        input.camera_z += 0x200;
        compositor.update(&mut lists, &steps, &input);
        assert_eq!(compositor.color_mask, 0x3F01);
    }

    #[test]
    fn test_score_glyphs() {
        let mut list = CopperList::default();
        update_score(&mut list, 0);
        assert_eq!(list.glyphs(), &[0x10, 0x10, 0, 0]);
        update_score(&mut list, 5);
        assert_eq!(list.glyphs(), &[0x15, 0x10, 0, 0]);
        update_score(&mut list, 123);
        assert_eq!(list.glyphs(), &[0x13, 0x12, 0x11, 0]);
        update_score(&mut list, 1000);
        assert_eq!(list.glyphs(), &[0x10, 0x10, 0x10, 0x11]);
    }
}
