//! Rotation frames of the ball sprite.
//!
//! The ball is a checkered sphere seen through a perspective camera. Every frame shows it rolled
//! by a different angle around the view axis, so steering left or right tilts the pattern.

use std::f32::consts::PI;

pub const BALL_EDGE: usize = 32;
/// Frames on each side of the upright one.
pub const NUM_BALL_ANGLES: usize = 8;
pub const NUM_BALL_FRAMES: usize = NUM_BALL_ANGLES * 2 + 1;
/// Sprite colors used by the checker pattern, starting at 1.
pub const NUM_BALL_COLORS: u8 = 14;

const MAX_ANGLE: f32 = 1.0;
const ANGLE_STEP: f32 = MAX_ANGLE / NUM_BALL_ANGLES as f32;

/// Sprite color index of every pixel, 0 being transparent.
pub type BallFrame = [[u8; BALL_EDGE]; BALL_EDGE];

fn fraction(n: f32) -> f32 {
    n - n.floor()
}

fn checker_pattern(x: f32, y: f32) -> f32 {
    fraction(y + if fraction(x) <= 0.5 { 0.0 } else { 0.5 })
}

/// Sprite pixel centers mapped to [-1, 1], vertical coordinate first.
fn center_norm(x: usize, y: usize) -> [f32; 2] {
    [
        1.0 - ((y * 2 + 1) as f32 / BALL_EDGE as f32),
        ((x * 2 + 1) as f32 / BALL_EDGE as f32) - 1.0,
    ]
}

/// Texture coordinates of the sphere point seen through `uv`, None outside the ball.
fn sphere_map(uv: [f32; 2]) -> Option<[f32; 2]> {
    if uv[0] * uv[0] + uv[1] * uv[1] >= 1.0 {
        return None;
    }

    let fov = PI / 4.0;
    let cam_z = -1.0 / (fov / 2.0).sin();
    let near_w = (fov / 2.0).tan();
    let ray = [uv[0] * near_w, uv[1] * near_w, 1.0];
    let norm = ray.iter().map(|v| v * v).sum::<f32>().sqrt();
    let ray = [ray[0] / norm, ray[1] / norm, ray[2] / norm];

    // Nearest intersection of the ray with the unit sphere.
    let b = 2.0 * ray[2] * cam_z;
    let c = cam_z * cam_z - 1.0;
    let dist = (-b - (b * b - 4.0 * c).max(0.0).sqrt()) / 2.0;
    let isec = [ray[0] * dist, ray[1] * dist, cam_z + ray[2] * dist];

    Some([
        3.0 * (0.5 + isec[2].atan2(isec[0]) / PI),
        -3.0 * isec[1].asin() / PI,
    ])
}

fn rotate(uv: [f32; 2], angle: f32) -> [f32; 2] {
    let (sin, cos) = angle.sin_cos();
    [uv[0] * cos - uv[1] * sin, uv[1] * cos + uv[0] * sin]
}

fn make_frame(frame: usize) -> BallFrame {
    let angle = ANGLE_STEP * frame as f32 + PI / 2.0 - MAX_ANGLE;
    let mut pixels = [[0u8; BALL_EDGE]; BALL_EDGE];

    for (y, row) in pixels.iter_mut().enumerate() {
        for (x, pixel) in row.iter_mut().enumerate() {
            if let Some(uv) = sphere_map(center_norm(x, y)) {
                let uv = rotate(uv, angle);
                let checker = checker_pattern(uv[0], uv[1]);
                let band = ((checker * NUM_BALL_COLORS as f32) as u8).min(NUM_BALL_COLORS - 1);
                *pixel = 1 + band;
            }
        }
    }

    pixels
}

pub struct BallFrames(Vec<BallFrame>);

impl Default for BallFrames {
    fn default() -> Self {
        BallFrames::new()
    }
}

impl BallFrames {
    pub fn new() -> Self {
        BallFrames((0..NUM_BALL_FRAMES).map(make_frame).collect())
    }

    /// Frame `idx`, the upright one being `NUM_BALL_ANGLES`. Out of range indices are clamped.
    pub fn frame(&self, idx: usize) -> &BallFrame {
        &self.0[idx.min(NUM_BALL_FRAMES - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(frame: &BallFrame) -> usize {
        frame.iter().flatten().filter(|&&p| p != 0).count()
    }

    #[test]
    fn test_ball_shape() {
        let frames = BallFrames::new();
        for idx in 0..NUM_BALL_FRAMES {
            let frame = frames.frame(idx);
            assert_eq!(opaque(frame), 812, "frame {}", idx);
            assert_eq!(frame[0][0], 0);
            assert_eq!(frame[31][31], 0);
            assert_ne!(frame[16][16], 0);
            assert!(frame.iter().flatten().all(|&p| p <= NUM_BALL_COLORS));
        }
    }

    #[test]
    fn test_frames_differ() {
        let frames = BallFrames::new();
        assert_ne!(frames.frame(0), frames.frame(NUM_BALL_ANGLES));
        assert_ne!(frames.frame(NUM_BALL_ANGLES), frames.frame(NUM_BALL_FRAMES - 1));
        assert_eq!(frames.frame(100), frames.frame(NUM_BALL_FRAMES - 1));
    }

    #[test]
    fn test_checker_pattern() {
        assert_eq!(checker_pattern(0.25, 0.25), 0.25);
        assert_eq!(checker_pattern(0.75, 0.25), 0.75);
        assert_eq!(checker_pattern(1.75, 0.75), 0.25);
    }
}
