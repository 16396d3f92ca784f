use anyhow::{anyhow, Result};
use clap::ArgMatches;
use log::{error, info};
use sdl2::{
    event::Event, keyboard::Keycode, pixels::PixelFormat, render::Canvas, video::Window, Sdl,
};

use crate::{
    clock::ThreadedClock,
    game::{PlayOutcome, PlaySession},
    gfx::{Color, DISP_HEIGHT, DISP_WIDTH},
    input::{InputState, LeftRightDir},
};

use super::Sys;

use std::{
    convert::TryFrom,
    thread,
    time::{Duration, Instant},
};

pub const WINDOW_RESOLUTION: [u32; 2] = [1280, 1024];
const TICKS_PER_SECOND: u64 = 50;
const DURATION_PER_TICK: Duration = Duration::from_millis(1000 / TICKS_PER_SECOND);

pub struct SDL2Sys {
    sdl_context: Sdl,
    sdl_canvas: Canvas<Window>,
    autoplay: bool,
}

pub fn new(matches: &ArgMatches) -> Option<Box<dyn Sys>> {
    let sdl_context = sdl2::init()
        .map_err(|e| {
            error!("Failed to initialize SDL: {}", e);
        })
        .ok()?;
    let sdl_video = sdl_context
        .video()
        .map_err(|e| error!("Failed to initialize SDL video: {}", e))
        .ok()?;

    let window = sdl_video
        .window("MOD Runner", WINDOW_RESOLUTION[0], WINDOW_RESOLUTION[1])
        .resizable()
        .allow_highdpi()
        .build()
        .map_err(|e| error!("Failed to create window: {}", e))
        .ok()?;

    let sdl_canvas = window
        .into_canvas()
        .build()
        .map_err(|e| error!("Failed to obtain canvas: {}", e))
        .ok()?;

    // Mouse motion steers the ball.
    sdl_context.mouse().set_relative_mouse_mode(true);

    Some(Box::new(SDL2Sys {
        sdl_context,
        sdl_canvas,
        autoplay: matches.is_present("autoplay"),
    }))
}

// The display is 5:4.
fn div_by_screen_ratio(x: u32) -> u32 {
    x * 4 / 5
}

fn mul_by_screen_ratio(x: u32) -> u32 {
    x * 5 / 4
}

impl Sys for SDL2Sys {
    fn game_loop(&mut self, session: &mut PlaySession) -> Result<PlayOutcome> {
        // Events, time and input
        let mut sdl_events = self.sdl_context.event_pump().map_err(|e| anyhow!(e))?;
        let mut last_tick_time = Instant::now();
        let mut input = InputState::new();

        // Texture we will render the game screen into
        let texture_creator = self.sdl_canvas.texture_creator();
        let pixel_format_enum = texture_creator.default_pixel_format();
        let pixel_format = PixelFormat::try_from(pixel_format_enum).map_err(|e| anyhow!(e))?;
        let bytes_per_pixel = pixel_format_enum.byte_size_per_pixel();
        let mut render_texture =
            texture_creator.create_texture_streaming(None, DISP_WIDTH as u32, DISP_HEIGHT as u32)?;

        let _clock = ThreadedClock::start(session.counter().clone(), session.tempos());

        'run: loop {
            for event in sdl_events.poll_iter() {
                match event {
                    Event::Quit { .. } => {
                        info!("window closed");
                        return Ok(PlayOutcome::Quit);
                    }
                    Event::KeyDown {
                        keycode: Some(key),
                        repeat: false,
                        ..
                    } => match key {
                        Keycode::Escape => input.escape = true,
                        Keycode::Left => input.horizontal = LeftRightDir::Left,
                        Keycode::Right => input.horizontal = LeftRightDir::Right,
                        _ => {}
                    },
                    Event::KeyUp {
                        keycode: Some(key),
                        repeat: false,
                        ..
                    } => match key {
                        Keycode::Left | Keycode::Right => input.horizontal = LeftRightDir::Neutral,
                        _ => {}
                    },
                    Event::MouseMotion { xrel, .. } => {
                        input.mouse_dx = input.mouse_dx.saturating_add(xrel as i16);
                    }
                    _ => {}
                }
            }

            let frame_input = if self.autoplay {
                InputState {
                    escape: input.escape,
                    ..session.autopilot()
                }
            } else {
                input
            };
            let running = session.update(&frame_input);
            input.end_frame();

            let render_into_texture = |texture: &mut [u8], pitch: usize| {
                for (src_line, dst_line) in session
                    .present()
                    .chunks_exact(DISP_WIDTH)
                    .zip(texture.chunks_exact_mut(pitch))
                {
                    for (src_pix, dst_pix) in src_line
                        .iter()
                        .zip(dst_line.chunks_exact_mut(bytes_per_pixel))
                    {
                        let &Color { r, g, b } = src_pix;
                        let color = sdl2::pixels::Color::RGB(r, g, b).to_u32(&pixel_format);
                        dst_pix.copy_from_slice(&color.to_ne_bytes()[0..bytes_per_pixel]);
                    }
                }
            };
            render_texture
                .with_lock(None, render_into_texture)
                .map_err(|e| anyhow!(e))?;

            // Wait until the time slice for the current frame is elapsed
            let duration_since_last_tick = Instant::now().duration_since(last_tick_time);
            if duration_since_last_tick < DURATION_PER_TICK {
                thread::sleep(DURATION_PER_TICK - duration_since_last_tick);
            }
            last_tick_time = Instant::now();

            // Clear screen
            self.sdl_canvas
                .set_draw_color(sdl2::pixels::Color::RGB(0, 0, 0));
            self.sdl_canvas.clear();

            // Compute destination rectangle of game screen
            let viewport = self.sdl_canvas.viewport();
            let viewport_dst = if div_by_screen_ratio(viewport.width()) < viewport.height() {
                let w = viewport.width();
                let h = div_by_screen_ratio(viewport.width());
                sdl2::rect::Rect::new(0, (viewport.height() - h) as i32 / 2, w, h)
            } else {
                let w = mul_by_screen_ratio(viewport.height());
                let h = viewport.height();
                sdl2::rect::Rect::new((viewport.width() - w) as i32 / 2, 0, w, h)
            };

            // Blit the game screen into the window viewport
            self.sdl_canvas
                .copy(&render_texture, None, Some(viewport_dst))
                .map_err(|e| anyhow!(e))?;
            self.sdl_canvas.present();

            if !running {
                break 'run;
            }
        }

        Ok(session.outcome())
    }
}
