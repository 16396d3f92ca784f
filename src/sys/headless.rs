//! Runs a session without a window, as fast as possible, driven by the frame clock.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use image::{Rgb, RgbImage};
use log::{info, trace};

use crate::{
    clock::FrameClock,
    game::{PlayOutcome, PlaySession},
    gfx::{Color, DISP_HEIGHT, DISP_WIDTH},
    input::InputState,
};

use super::Sys;

pub struct HeadlessSys {
    max_frames: Option<u64>,
    dump: Option<PathBuf>,
    autoplay: bool,
}

pub fn new(matches: &ArgMatches) -> Result<Box<dyn Sys>> {
    let max_frames = matches
        .value_of("frames")
        .map(|f| f.parse::<u64>())
        .transpose()
        .context("expected integer for frames option")?;

    Ok(Box::new(HeadlessSys {
        max_frames,
        dump: matches.value_of("dump").map(PathBuf::from),
        autoplay: matches.is_present("autoplay"),
    }))
}

/// Converts a rendered frame into an image.
pub fn frame_to_image(pixels: &[Color]) -> RgbImage {
    RgbImage::from_fn(DISP_WIDTH as u32, DISP_HEIGHT as u32, |x, y| {
        let Color { r, g, b } = pixels[y as usize * DISP_WIDTH + x as usize];
        Rgb([r, g, b])
    })
}

impl Sys for HeadlessSys {
    fn game_loop(&mut self, session: &mut PlaySession) -> Result<PlayOutcome> {
        let mut clock = FrameClock::new(session.tempos());
        let mut frames = 0u64;

        while self.max_frames.map_or(true, |max| frames < max) {
            clock.frame(session.counter());
            let input = if self.autoplay {
                session.autopilot()
            } else {
                InputState::new()
            };
            frames += 1;
            if !session.update(&input) {
                break;
            }
            trace!(
                "frame {}: step {}, ball {}, suppressed sample {:?}",
                frames,
                session.next_step_idx(),
                session.ball_x(),
                session.suppressed_sample()
            );
        }
        if session.is_running() {
            info!("stopped after {} frames, while playing", frames);
        } else {
            info!("played {} frames", frames);
        }

        if let Some(path) = &self.dump {
            frame_to_image(session.present())
                .save(path)
                .with_context(|| format!("cannot write {}", path.display()))?;
            info!("frame written to {}", path.display());
        }

        Ok(session.outcome())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_to_image() {
        let mut pixels = vec![Color::default(); DISP_WIDTH * DISP_HEIGHT];
        pixels[DISP_WIDTH + 2] = Color::from(0xF80);
        let image = frame_to_image(&pixels);
        assert_eq!(image.dimensions(), (DISP_WIDTH as u32, DISP_HEIGHT as u32));
        assert_eq!(image.get_pixel(2, 1), &Rgb([0xFF, 0x88, 0x00]));
        assert_eq!(image.get_pixel(1, 2), &Rgb([0, 0, 0]));
    }
}
