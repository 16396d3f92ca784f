//! Compiles a module's patterns into the flat sequence of steps the game scrolls through.
//!
//! Building runs in three passes: the dominant frequency of every sample is measured with the
//! fixed-point FFT, a lead instrument is elected for each pattern, and the song is walked in
//! playback order, emitting one step per division played.

pub mod analysis;
mod walk;

use std::time::Duration;

use log::{debug, info};

use crate::{
    error::{Error, Result},
    module::{Module, PATTERN_TABLE_LEN},
    rng::Random4,
    tables::{FftTables, PeriodColors},
};

/// Empty steps in front of the song, one screen of track.
pub const NUM_VISIBLE_STEPS: usize = 16;
/// Empty steps after the song: one screen plus enough for the fade out at the fastest tempo.
pub const NUM_PADDING_STEPS: usize = NUM_VISIBLE_STEPS + 0x40;
/// Steps between the one playing and the one under the ball.
pub const NUM_STEPS_DELAY: usize = 1;
pub const NUM_BLOCK_COLORS: u8 = 12;

pub const DEFAULT_SPEED: u8 = 6;
pub const DEFAULT_BPM: u8 = 125;

/// Playback tempo: `speed` ticks per division, `bpm * 2 / 5` ticks per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
    pub speed: u8,
    pub bpm: u8,
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo {
            speed: DEFAULT_SPEED,
            bpm: DEFAULT_BPM,
        }
    }
}

impl Tempo {
    /// Applies the parameter of a non-zero set speed effect.
    pub fn apply(&mut self, param: u8) {
        match param {
            0 => (),
            1..=0x1F => self.speed = param,
            _ => self.bpm = param,
        }
    }

    /// Time taken to play one division.
    pub fn step_duration(&self) -> Duration {
        Duration::from_micros(self.speed as u64 * 2_500_000 / self.bpm.max(1) as u64)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackStep {
    /// 0 for no block, 1 to 3 for the left, center and right lanes.
    pub active_lane: u8,
    pub sample: u8,
    /// Pitch band of the block, offset by `NUM_BLOCK_COLORS` once collected.
    pub color: u8,
    pub tempo: Tempo,
}

impl TrackStep {
    pub fn empty(tempo: Tempo) -> Self {
        TrackStep {
            tempo,
            ..Default::default()
        }
    }

    pub fn has_block(&self) -> bool {
        self.active_lane != 0
    }

    pub fn is_collected(&self) -> bool {
        self.color >= NUM_BLOCK_COLORS
    }

    /// Marks the block as collected. Returns false if it already was.
    pub fn collect(&mut self) -> bool {
        if self.is_collected() {
            return false;
        }
        self.color += NUM_BLOCK_COLORS;
        true
    }
}

#[derive(Debug)]
pub struct Track {
    steps: Vec<TrackStep>,
    num_blocks: u16,
}

impl Track {
    pub fn steps(&self) -> &[TrackStep] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [TrackStep] {
        &mut self.steps
    }

    pub fn num_blocks(&self) -> u16 {
        self.num_blocks
    }

    /// Number of steps before the trailing padding.
    pub fn unpadded_len(&self) -> usize {
        self.steps.len() - NUM_PADDING_STEPS
    }
}

/// Appends to `steps`, failing instead of aborting if the vector cannot grow.
fn push_step(steps: &mut Vec<TrackStep>, step: TrackStep) -> Result<()> {
    steps.try_reserve(1)?;
    steps.push(step);
    Ok(())
}

fn pad(steps: &mut Vec<TrackStep>, num_steps: usize, tempo: Tempo) -> Result<()> {
    steps.try_reserve(num_steps)?;
    steps.extend(std::iter::repeat(TrackStep::empty(tempo)).take(num_steps));
    Ok(())
}

pub struct TrackBuilder<'a> {
    module: &'a Module,
    fft_tables: FftTables,
    colors: PeriodColors,
}

impl<'a> TrackBuilder<'a> {
    pub fn new(module: &'a Module) -> Self {
        TrackBuilder {
            module,
            fft_tables: FftTables::new(),
            colors: PeriodColors::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        let module = self.module;
        if module.pattern_table.len() > PATTERN_TABLE_LEN {
            return Err(Error::InvalidModule(format!(
                "pattern table has {} entries",
                module.pattern_table.len()
            )));
        }
        if let Some(&p) = module
            .pattern_table
            .iter()
            .find(|&&p| p as usize >= module.patterns.len())
        {
            return Err(Error::InvalidModule(format!("missing pattern {}", p)));
        }
        Ok(())
    }

    pub fn build(&self, rng: &mut Random4) -> Result<Track> {
        self.validate()?;
        let module = self.module;

        let dom_freqs = analysis::analyze_samples(module, &self.fft_tables);
        let leads: Vec<Option<u8>> = module
            .patterns
            .iter()
            .enumerate()
            .map(|(pat_idx, pattern)| {
                let lead = analysis::SampleStats::scan(pattern).select_lead(&dom_freqs);
                debug!("pattern {}: lead sample {:?}", pat_idx, lead);
                lead
            })
            .collect();

        let mut steps = Vec::new();
        pad(&mut steps, NUM_VISIBLE_STEPS, Tempo::default())?;

        let mut walker = walk::Walker::new(module, &leads, &self.colors, rng, &mut steps);
        walker.walk_pattern_table()?;
        let num_blocks = walker.num_blocks();
        let tempo = walker.tempo();

        pad(&mut steps, NUM_PADDING_STEPS, tempo)?;

        info!(
            "built track: {} steps, {} blocks",
            steps.len() - NUM_VISIBLE_STEPS - NUM_PADDING_STEPS,
            num_blocks
        );

        Ok(Track { steps, num_blocks })
    }
}
