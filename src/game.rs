//! One play through a module: consumes the steps counted by the clock, moves the ball, collects
//! blocks and drives the compositor until the track ends or the player leaves.

use std::path::Path;

use log::{debug, info};

use crate::{
    clock::StepCounter,
    error::Result,
    gfx::{
        blit::PlanarBitmap,
        compositor::{Compositor, FrameInput},
        copper::DisplayLists,
        raster::Scanout,
        scene, Color, Fader, BITMAP_HEIGHT, BITMAP_WIDTH, DISP_DEPTH, LANE_WIDTH,
    },
    input::InputState,
    module::Module,
    rng::Random4,
    tables::{BLOCK_GAP_DEPTH, FAR_Z},
    track::{Tempo, Track, TrackBuilder, NUM_STEPS_DELAY, NUM_VISIBLE_STEPS},
};

/// Frames played after the last block before fading out, for songs that never end.
pub const NUM_TIMEOUT_FRAMES: u16 = 200;
const VU_METER_Z_DECAY: u32 = 0x1000;
/// Largest ball movement per frame when steering itself.
const AUTOPILOT_SPEED: i16 = 16;
/// Timer ticks per second are `bpm * 2 / 5`, frames per second 50.
const FRAME_TICKS_DIVISOR: u32 = 125;

/// Lowest and highest ball position touching the blocks of each lane.
const LANE_BOUNDS: [(i16, i16); 3] = [
    (-LANE_WIDTH, -LANE_WIDTH / 2),
    (-LANE_WIDTH / 2, LANE_WIDTH / 2),
    (LANE_WIDTH / 2, LANE_WIDTH),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The track was played to its end, or timed out after its last block.
    Finished,
    /// The player pressed escape and the screen faded out.
    Escaped,
    /// The window was closed, without fading out.
    Quit,
}

/// Camera depth change per frame, so that one step's depth is crossed in one step's time.
fn camera_z_inc(tempo: Tempo) -> u32 {
    BLOCK_GAP_DEPTH * tempo.bpm as u32 / (tempo.speed.max(1) as u32 * FRAME_TICKS_DIVISOR)
}

fn lane_center(lane: u8) -> i16 {
    let (lo, hi) = LANE_BOUNDS[lane as usize - 1];
    (lo + hi) / 2
}

pub struct PlaySession {
    title: String,
    track: Track,
    counter: StepCounter,

    compositor: Compositor,
    lists: DisplayLists,
    bitmap: PlanarBitmap,
    scanout: Scanout,
    fader: Option<Fader>,

    /// Step at the near plane.
    next_step_idx: usize,
    /// Step after which the song is over.
    end_step_idx: usize,
    num_blocks_left: u16,
    camera_z: u32,
    camera_z_inc: u32,
    /// VU meter height, as a depth in front of the camera.
    vu_meter_view_z: u32,
    ball_x: i16,
    score: u16,
    timeout_frames: u16,
    /// Cleared once fading out.
    running: bool,
    /// Cleared once the last step played.
    clock_enabled: bool,
    escaped: bool,
    /// Sample of the next block, muted unless the block gets collected.
    suppressed_sample: Option<u8>,
}

impl PlaySession {
    /// Loads the module at `path` and builds its track.
    pub fn load(path: &Path, rng: &mut Random4, counter: StepCounter) -> Result<Self> {
        let module = Module::load(path)?;
        let track = TrackBuilder::new(&module).build(rng)?;
        Ok(PlaySession::new(&module.title, track, counter))
    }

    /// Sets up the play screen for `track`. Track colors start black and fade in.
    pub fn new(title: &str, track: Track, counter: StepCounter) -> Self {
        let mut bitmap = PlanarBitmap::new(DISP_DEPTH, BITMAP_WIDTH, BITMAP_HEIGHT);
        let scanout = Scanout::new();
        let font = scanout.font();
        scene::draw_logo(&mut bitmap, &scene::make_logo(font));
        scene::draw_title(&mut bitmap, font, title);
        scene::init_score(&mut bitmap, font);
        scene::draw_track(&mut bitmap);

        info!(
            "playing \"{}\": {} steps, {} blocks",
            title,
            track.unpadded_len(),
            track.num_blocks()
        );

        PlaySession {
            title: title.to_string(),
            end_step_idx: track.unpadded_len() - 1,
            num_blocks_left: track.num_blocks(),
            track,
            counter,
            compositor: Compositor::new(),
            lists: DisplayLists::default(),
            bitmap,
            scanout,
            fader: Some(Fader::new(true)),
            next_step_idx: 0,
            camera_z: 0,
            camera_z_inc: 0,
            vu_meter_view_z: 0,
            ball_x: 0,
            score: 0,
            timeout_frames: NUM_TIMEOUT_FRAMES,
            running: true,
            clock_enabled: true,
            escaped: false,
            suppressed_sample: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Counter the step clock of this session must increment.
    pub fn counter(&self) -> &StepCounter {
        &self.counter
    }

    /// Tempo of every step the clock counts, in order.
    pub fn tempos(&self) -> Vec<Tempo> {
        self.track.steps()[NUM_STEPS_DELAY..]
            .iter()
            .map(|s| s.tempo)
            .collect()
    }

    pub fn next_step_idx(&self) -> usize {
        self.next_step_idx
    }

    pub fn ball_x(&self) -> i16 {
        self.ball_x
    }

    pub fn score(&self) -> u16 {
        self.score
    }

    /// Score in tenths of a percent of all blocks.
    pub fn score_frac(&self) -> u16 {
        match self.track.num_blocks() {
            0 => 0,
            total => (self.score as u32 * 1000 / total as u32) as u16,
        }
    }

    pub fn suppressed_sample(&self) -> Option<u8> {
        self.suppressed_sample
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn outcome(&self) -> PlayOutcome {
        if self.escaped {
            PlayOutcome::Escaped
        } else {
            PlayOutcome::Finished
        }
    }

    /// Runs one frame. Returns false once the session is over and the screen faded out.
    pub fn update(&mut self, input: &InputState) -> bool {
        self.handle_steps();
        self.handle_input(input);
        self.handle_collision();
        self.handle_fade();
        self.handle_gfx();
        self.handle_timeout();

        self.running || self.fader.is_some()
    }

    /// Renders the displayed frame.
    pub fn present(&mut self) -> &[Color] {
        self.scanout.present(self.lists.front(), &mut self.bitmap)
    }

    /// Input steering the ball towards the next block still to collect.
    pub fn autopilot(&self) -> InputState {
        let target = self.track.steps()[self.next_step_idx + NUM_STEPS_DELAY..]
            .iter()
            .take(NUM_VISIBLE_STEPS)
            .find(|s| s.has_block() && !s.is_collected())
            .map_or(self.ball_x, |s| lane_center(s.active_lane));

        InputState {
            mouse_dx: (target - self.ball_x)
                .max(-AUTOPILOT_SPEED)
                .min(AUTOPILOT_SPEED),
            ..Default::default()
        }
    }

    fn begin_fade_out(&mut self) {
        if self.running {
            self.running = false;
            self.fader = Some(Fader::new(false));
        }
    }

    /// Consumes every step played since the last frame.
    fn handle_steps(&mut self) {
        while self.clock_enabled && self.counter.take() {
            let steps = self.track.steps();
            let play_idx = self.next_step_idx + NUM_STEPS_DELAY;
            let play_step = steps[play_idx];

            if play_step.has_block() {
                self.num_blocks_left = self.num_blocks_left.saturating_sub(1);
            }

            // Mute the sample of the next block until it is collected.
            match steps.get(play_idx + 1).map(|s| s.sample) {
                Some(0) | None => (),
                Some(sample) => self.suppressed_sample = Some(sample),
            }

            // Resynchronize the camera with the music.
            self.camera_z_inc = camera_z_inc(play_step.tempo);
            self.camera_z = self.next_step_idx as u32 * BLOCK_GAP_DEPTH;
            self.next_step_idx += 1;

            if self.next_step_idx == self.end_step_idx {
                debug!("last step played");
                self.clock_enabled = false;
                self.begin_fade_out();
            }
        }
    }

    fn handle_input(&mut self, input: &InputState) {
        self.ball_x = self
            .ball_x
            .saturating_add(input.delta_x())
            .max(-LANE_WIDTH)
            .min(LANE_WIDTH);

        if self.running && input.escape {
            debug!("escape pressed");
            self.escaped = true;
            self.begin_fade_out();
        }
    }

    fn handle_collision(&mut self) {
        let ball_step = &mut self.track.steps_mut()[self.next_step_idx + NUM_STEPS_DELAY];
        if !ball_step.has_block() || ball_step.is_collected() {
            return;
        }

        let (lo, hi) = LANE_BOUNDS[ball_step.active_lane as usize - 1];
        if self.ball_x >= lo && self.ball_x <= hi {
            ball_step.collect();
            self.score += 1;
            self.suppressed_sample = None;
            self.vu_meter_view_z = FAR_Z;
            debug!("block collected, score {}", self.score);
        }
    }

    fn handle_fade(&mut self) {
        let done = match &mut self.fader {
            Some(fader) => !fader.update(self.compositor.colors_mut()),
            None => false,
        };
        if done {
            self.fader = None;
        }
    }

    fn handle_gfx(&mut self) {
        let input = FrameInput {
            player_x: self.ball_x,
            camera_z: self.camera_z,
            camera_z_inc: self.camera_z_inc,
            vu_meter_z: self.vu_meter_view_z,
            score_frac: self.score_frac(),
        };
        self.compositor.update(
            &mut self.lists,
            &self.track.steps()[self.next_step_idx..],
            &input,
        );

        self.vu_meter_view_z = self.vu_meter_view_z.saturating_sub(VU_METER_Z_DECAY);
        self.camera_z += self.camera_z_inc;
    }

    fn handle_timeout(&mut self) {
        if self.num_blocks_left == 0 {
            self.timeout_frames = self.timeout_frames.saturating_sub(1);
        }
        if self.running && self.timeout_frames == 0 {
            debug!("timed out after the last block");
            self.begin_fade_out();
        }
    }
}
