//! Linearization of the song: follows the pattern table and the control flow effects the way
//! the player would, emitting one step per division played.

use log::{debug, warn};

use super::{analysis::skip_command, push_step, Tempo, TrackStep};
use crate::{
    error::Result,
    module::{Effect, Module, PatternDivision, DIVS_PER_PATTERN, NUM_CHANNELS, PATTERN_TABLE_LEN},
    rng::Random4,
    tables::PeriodColors,
};

/// Next lane, indexed by the last lane and a 2-bit random value.
///
/// Column 0 always keeps the current lane, and only the center lane can reach both sides.
const NEXT_LANE_LUT: [[u8; 4]; 4] = [
    [2, 1, 2, 3],
    [1, 2, 2, 3],
    [2, 1, 2, 3],
    [3, 2, 2, 1],
];

/// Upper bound on divisions played per pattern visit. Patterns with several loop commands can
/// loop forever.
const MAX_DIVS_PER_VISIT: usize = DIVS_PER_PATTERN * 16;

#[derive(Debug, PartialEq, Eq)]
pub(super) enum Walk {
    Continue,
    End,
}

pub(super) struct Walker<'a> {
    module: &'a Module,
    leads: &'a [Option<u8>],
    colors: &'a PeriodColors,
    rng: &'a mut Random4,
    steps: &'a mut Vec<TrackStep>,

    pat_tbl_idx: usize,
    div_idx: usize,
    div_start_idx: usize,
    loop_idx: usize,
    loop_count: Option<u8>,

    last_sample: [u8; NUM_CHANNELS],
    last_active_lane: u8,
    active_contiguous_count: u16,
    num_blocks: u16,
    tempo: Tempo,
}

impl<'a> Walker<'a> {
    pub fn new(
        module: &'a Module,
        leads: &'a [Option<u8>],
        colors: &'a PeriodColors,
        rng: &'a mut Random4,
        steps: &'a mut Vec<TrackStep>,
    ) -> Self {
        Walker {
            module,
            leads,
            colors,
            rng,
            steps,
            pat_tbl_idx: 0,
            div_idx: 0,
            div_start_idx: 0,
            loop_idx: 0,
            loop_count: None,
            last_sample: [0; NUM_CHANNELS],
            last_active_lane: 0,
            active_contiguous_count: 0,
            num_blocks: 0,
            tempo: Tempo::default(),
        }
    }

    pub fn num_blocks(&self) -> u16 {
        self.num_blocks
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Walks the song from its first position. Revisiting a pattern table entry ends the walk.
    pub fn walk_pattern_table(&mut self) -> Result<()> {
        let mut visited = [false; PATTERN_TABLE_LEN];
        let module = self.module;

        while let Some(&pat_idx) = module.pattern_table.get(self.pat_tbl_idx) {
            if visited[self.pat_tbl_idx] {
                debug!("pattern table entry {} revisited", self.pat_tbl_idx);
                break;
            }
            visited[self.pat_tbl_idx] = true;

            // Incremented first, jumps overwrite it.
            self.pat_tbl_idx += 1;

            if self.walk_pattern(pat_idx as usize)? == Walk::End {
                debug!("end of track in pattern {}", pat_idx);
                break;
            }
        }

        Ok(())
    }

    fn walk_pattern(&mut self, pat_idx: usize) -> Result<Walk> {
        let module = self.module;
        let pattern = &module.patterns[pat_idx];
        let lead = self.leads[pat_idx];

        self.loop_idx = 0;
        self.loop_count = None;
        self.div_idx = self.div_start_idx;
        self.div_start_idx = 0;

        for _ in 0..MAX_DIVS_PER_VISIT {
            if self.div_idx >= DIVS_PER_PATTERN {
                return Ok(Walk::Continue);
            }
            let div = &pattern.divisions[self.div_idx];
            self.update_tempo(div);
            self.make_step(div, lead)?;
            if self.handle_commands(div)? == Walk::End {
                return Ok(Walk::End);
            }
        }

        warn!("pattern {} does not terminate, skipping to the next one", pat_idx);
        Ok(Walk::Continue)
    }

    /// Tempo changes take effect on the division carrying them.
    fn update_tempo(&mut self, div: &PatternDivision) {
        for cmd in div.iter() {
            if let Effect::SetSpeed(param) = cmd.effect() {
                self.tempo.apply(param);
            }
        }
    }

    fn make_step(&mut self, div: &PatternDivision, lead: Option<u8>) -> Result<()> {
        let mut sample_in_step = 0;
        let mut step_color = 0;

        for (chan, cmd) in div.iter().enumerate() {
            if skip_command(cmd) {
                continue;
            }

            let sample = if cmd.sample == 0 {
                self.last_sample[chan]
            } else {
                self.last_sample[chan] = cmd.sample;
                cmd.sample
            };

            if cmd.period != 0 && sample != 0 && Some(sample) == lead {
                sample_in_step = sample;
                step_color = self.colors.lookup(cmd.period);
            }
        }

        let mut step = TrackStep::empty(self.tempo);

        if sample_in_step != 0 {
            step.sample = sample_in_step;
            step.color = step_color;

            let mut random4 = self.rng.next();
            // No lane change until a run is at least 2 steps long.
            if self.active_contiguous_count == 1 {
                random4 = 0;
            }
            // No direct jump between the left and right lanes within a run.
            if self.active_contiguous_count != 0 && self.last_active_lane != 2 && random4 == 3 {
                random4 = 0;
            }

            step.active_lane = NEXT_LANE_LUT[self.last_active_lane as usize][random4 as usize];
            if step.active_lane != self.last_active_lane {
                self.last_active_lane = step.active_lane;
                self.active_contiguous_count = 0;
            }
            self.active_contiguous_count += 1;
            self.num_blocks += 1;
        } else {
            self.active_contiguous_count = 0;
        }

        push_step(self.steps, step)
    }

    fn handle_commands(&mut self, div: &PatternDivision) -> Result<Walk> {
        let mut delay = 0;
        let mut walk = Walk::Continue;
        let mut next_div_idx = self.div_idx + 1;

        for cmd in div.iter() {
            match cmd.effect() {
                Effect::PositionJump(pos) => {
                    self.pat_tbl_idx = pos as usize;
                    next_div_idx = DIVS_PER_PATTERN;
                }
                Effect::PatternBreak(target) => {
                    // The player restarts at division 0 when the target is out of range.
                    self.div_start_idx = if (target as usize) < DIVS_PER_PATTERN {
                        target as usize
                    } else {
                        0
                    };
                    next_div_idx = DIVS_PER_PATTERN;
                }
                Effect::PatternDelay(count) => delay = count,
                Effect::PatternLoop(0) => self.loop_idx = self.div_idx,
                Effect::PatternLoop(count) => match self.loop_count {
                    Some(0) => self.loop_count = None,
                    left => {
                        let left = left.unwrap_or(count) - 1;
                        self.loop_count = Some(left);
                        next_div_idx = self.loop_idx;
                    }
                },
                Effect::SetSpeed(0) => {
                    walk = Walk::End;
                    next_div_idx = DIVS_PER_PATTERN;
                }
                Effect::SetSpeed(_) | Effect::SetVolume(_) | Effect::None => (),
                Effect::Other(effect) => debug!("ignoring effect {:03x}", effect),
            }
        }

        self.div_idx = next_div_idx;

        for _ in 0..delay {
            push_step(self.steps, TrackStep::empty(self.tempo))?;
        }

        Ok(walk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{tests::single_pattern_module, Pattern, PatternCommand};

    /// Walks `module` with sample 1 as the lead of every pattern.
    fn walk(module: &Module) -> (Vec<TrackStep>, u16) {
        let leads = vec![Some(1); module.patterns.len()];
        let colors = PeriodColors::new();
        let mut rng = Random4::with_seed(42);
        let mut steps = Vec::new();
        let mut walker = Walker::new(module, &leads, &colors, &mut rng, &mut steps);
        walker.walk_pattern_table().unwrap();
        let num_blocks = walker.num_blocks();
        (steps, num_blocks)
    }

    fn set(module: &mut Module, pat: usize, div: usize, chan: usize, cmd: PatternCommand) {
        module.patterns[pat].divisions[div][chan] = cmd;
    }

    #[test]
    fn test_revisit_terminates() {
        let mut module = single_pattern_module(1);
        // Jump back to the start at the last division.
        set(&mut module, 0, 63, 0, PatternCommand::new(0, 0, 0xB00));
        module.pattern_table = vec![0, 0];
        let (steps, _) = walk(&module);
        assert_eq!(steps.len(), 64);

        // Both entries stop half way with a jump to entry 1, visited the second time.
        set(&mut module, 0, 63, 0, PatternCommand::new(0, 0, 0x000));
        set(&mut module, 0, 31, 0, PatternCommand::new(0, 0, 0xB01));
        let (steps, _) = walk(&module);
        assert_eq!(steps.len(), 32 + 32);
    }

    #[test]
    fn test_break_out_of_range() {
        let mut module = single_pattern_module(1);
        module.patterns.push(Pattern::default());
        module.pattern_table = vec![0, 1];
        set(&mut module, 0, 5, 3, PatternCommand::new(0, 0, 0xD46));
        set(&mut module, 1, 0, 0, PatternCommand::new(1, 428, 0));
        let (steps, num_blocks) = walk(&module);
        assert_eq!(steps.len(), 6 + 64);
        assert_eq!(num_blocks, 1);
        assert!(steps[6].has_block());
    }

    #[test]
    fn test_break_to_division() {
        let mut module = single_pattern_module(1);
        module.patterns.push(Pattern::default());
        module.pattern_table = vec![0, 1];
        set(&mut module, 0, 0, 0, PatternCommand::new(0, 0, 0xD10));
        let (steps, _) = walk(&module);
        // Division 0 of pattern 0, then divisions 16..64 of pattern 1.
        assert_eq!(steps.len(), 1 + 48);
    }

    #[test]
    fn test_pattern_loop() {
        let mut module = single_pattern_module(1);
        set(&mut module, 0, 4, 0, PatternCommand::new(0, 0, 0xE60));
        set(&mut module, 0, 7, 1, PatternCommand::new(0, 0, 0xE62));
        set(&mut module, 0, 8, 0, PatternCommand::new(0, 0, 0xF00));
        let (steps, _) = walk(&module);
        // Divisions 0..=7, twice more 4..=7, then 8.
        assert_eq!(steps.len(), 8 + 2 * 4 + 1);
    }

    #[test]
    fn test_endless_loop_is_cut() {
        let mut module = single_pattern_module(1);
        set(&mut module, 0, 4, 0, PatternCommand::new(0, 0, 0xE60));
        set(&mut module, 0, 7, 0, PatternCommand::new(0, 0, 0xE62));
        set(&mut module, 0, 10, 0, PatternCommand::new(0, 0, 0xE62));
        let (steps, _) = walk(&module);
        assert_eq!(steps.len(), MAX_DIVS_PER_VISIT);
    }

    #[test]
    fn test_pattern_delay() {
        let mut module = single_pattern_module(1);
        set(&mut module, 0, 0, 0, PatternCommand::new(1, 428, 0xEE3));
        set(&mut module, 0, 1, 0, PatternCommand::new(0, 0, 0xF00));
        let (steps, num_blocks) = walk(&module);
        assert_eq!(steps.len(), 1 + 3 + 1);
        assert_eq!(num_blocks, 1);
        assert!(steps[0].has_block());
        assert!(steps[1..].iter().all(|s| !s.has_block()));
    }

    #[test]
    fn test_extended_effects_do_not_end_track() {
        let mut module = single_pattern_module(1);
        set(&mut module, 0, 2, 0, PatternCommand::new(0, 0, 0xE00));
        set(&mut module, 0, 3, 0, PatternCommand::new(0, 0, 0xE10));
        let (steps, _) = walk(&module);
        assert_eq!(steps.len(), 64);
    }

    #[test]
    fn test_sample_hold() {
        let mut module = single_pattern_module(1);
        set(&mut module, 0, 0, 2, PatternCommand::new(1, 0, 0));
        // Held sample 1 on channel 2.
        set(&mut module, 0, 1, 2, PatternCommand::new(0, 214, 0));
        // Another channel does not inherit it.
        set(&mut module, 0, 2, 3, PatternCommand::new(0, 214, 0));
        // A quiet command neither triggers nor updates the hold.
        set(&mut module, 0, 3, 2, PatternCommand::new(2, 214, 0xC00));
        set(&mut module, 0, 4, 2, PatternCommand::new(0, 856, 0xF00));
        let (steps, num_blocks) = walk(&module);
        assert_eq!(steps.len(), 5);
        assert!(!steps[0].has_block());
        assert!(steps[1].has_block());
        assert_eq!(steps[1].color, 8);
        assert!(!steps[2].has_block());
        assert!(!steps[3].has_block());
        assert!(steps[4].has_block());
        assert_eq!(steps[4].color, 0);
        assert_eq!(num_blocks, 2);
    }

    #[test]
    fn test_last_channel_sets_color() {
        let mut module = single_pattern_module(1);
        set(&mut module, 0, 0, 0, PatternCommand::new(1, 856, 0));
        set(&mut module, 0, 0, 3, PatternCommand::new(1, 113, 0xF00));
        let (steps, _) = walk(&module);
        assert_eq!(steps[0].color, 11);
    }
}
