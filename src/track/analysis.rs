//! Lead instrument election.

use log::{debug, warn};

use crate::{
    fft,
    module::{Effect, Module, Pattern, PatternCommand, NUM_SAMPLES},
    tables::FftTables,
};

/// Samples used fewer times than this in a pattern are penalized.
const COUNT_TARGET_MIN1: i32 = 16;
/// Samples used fewer times than this are penalized heavily.
const COUNT_TARGET_MIN2: u16 = 4;
const COUNT_TARGET_MIN2_PENALTY: u32 = 8;
const PITCH_TARGET: i32 = 3000;
const SCORE_COUNT_WEIGHT: u32 = 0x100;
const SCORE_PITCH_WEIGHT: u32 = 2;

/// Commands setting a volume below half are considered inaudible.
pub fn skip_command(cmd: &PatternCommand) -> bool {
    matches!(cmd.effect(), Effect::SetVolume(v) if v < 0x20)
}

/// Dominant FFT bin of every sample, 0 for empty ones.
pub fn analyze_samples(module: &Module, tables: &FftTables) -> [u16; NUM_SAMPLES] {
    let mut freqs = [0u16; NUM_SAMPLES];
    let mut offset = 0;

    for (freq, info) in freqs.iter_mut().zip(module.samples.iter()) {
        let len = info.len_bytes();
        if len != 0 {
            *freq = fft::sample_dominant_freq(tables, &module.sample_data, offset, len);
            debug!("sample {:?}: dominant frequency {}", info.name, freq);
        }
        offset += len;
    }

    freqs
}

/// How often each sample is played in a pattern, and with which periods.
#[derive(Debug, Default)]
pub struct SampleStats {
    count: [u16; NUM_SAMPLES],
    period_sum: [u32; NUM_SAMPLES],
}

impl SampleStats {
    /// Only commands carrying both a sample and a period are counted. The scan stops at the first
    /// pattern break, since some modules leave data after it.
    pub fn scan(pattern: &Pattern) -> Self {
        let mut stats = SampleStats::default();

        'divisions: for div in pattern.divisions.iter() {
            for cmd in div.iter() {
                if skip_command(cmd) {
                    continue;
                }
                if let Effect::PatternBreak(_) = cmd.effect() {
                    break 'divisions;
                }
                if cmd.sample == 0 || cmd.period == 0 {
                    continue;
                }

                let idx = cmd.sample as usize - 1;
                if idx >= NUM_SAMPLES {
                    warn!("ignoring command with sample number {}", cmd.sample);
                    continue;
                }
                stats.count[idx] += 1;
                stats.period_sum[idx] += cmd.period as u32;
            }
        }

        stats
    }

    /// Lower is better. None for samples not played in the pattern.
    fn score(&self, idx: usize, dom_freq: u16) -> Option<u32> {
        let count = self.count[idx];
        if count == 0 {
            return None;
        }

        // Combine the FFT frequency with the average playback rate. The unit is arbitrary but
        // linear in pitch.
        let avg_period = self.period_sum[idx] / count as u32;
        let pitch = (((0x10000 / avg_period) as u16 as u32 * dom_freq as u32) / 5) as u16;

        let mut score_count = (COUNT_TARGET_MIN1 - count as i32).max(0) as u32;
        if count < COUNT_TARGET_MIN2 {
            score_count *= COUNT_TARGET_MIN2_PENALTY;
        }
        let score_pitch = (pitch as i32 - PITCH_TARGET).abs() as u32;

        Some(score_count * SCORE_COUNT_WEIGHT + score_pitch * SCORE_PITCH_WEIGHT)
    }

    /// Sample number (1-based) of the lead instrument, None if no sample is played.
    pub fn select_lead(&self, dom_freqs: &[u16; NUM_SAMPLES]) -> Option<u8> {
        let mut best: Option<(usize, u32)> = None;

        for (idx, &freq) in dom_freqs.iter().enumerate() {
            if let Some(score) = self.score(idx, freq) {
                if best.map_or(true, |(_, best_score)| score < best_score) {
                    best = Some((idx, score));
                }
            }
        }

        best.map(|(idx, _)| idx as u8 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::tests::single_pattern_module;

    fn pattern_with(cmds: &[(usize, usize, PatternCommand)]) -> Pattern {
        let mut pattern = Pattern::default();
        for &(div, chan, cmd) in cmds {
            pattern.divisions[div][chan] = cmd;
        }
        pattern
    }

    #[test]
    fn test_skip_command() {
        assert!(skip_command(&PatternCommand::new(1, 428, 0xC1F)));
        assert!(!skip_command(&PatternCommand::new(1, 428, 0xC20)));
        assert!(!skip_command(&PatternCommand::new(1, 428, 0xA1F)));
    }

    #[test]
    fn test_scan() {
        let pattern = pattern_with(&[
            (0, 0, PatternCommand::new(1, 400, 0)),
            (1, 0, PatternCommand::new(1, 200, 0)),
            // Quiet, not counted.
            (1, 1, PatternCommand::new(2, 200, 0xC10)),
            // No period, not counted.
            (2, 1, PatternCommand::new(2, 0, 0)),
            (3, 2, PatternCommand::new(3, 300, 0)),
            // Break stops the scan, including the rest of its division.
            (4, 1, PatternCommand::new(0, 0, 0xD00)),
            (4, 2, PatternCommand::new(3, 300, 0)),
            (5, 0, PatternCommand::new(1, 300, 0)),
        ]);
        let stats = SampleStats::scan(&pattern);
        assert_eq!(stats.count[0], 2);
        assert_eq!(stats.period_sum[0], 600);
        assert_eq!(stats.count[1], 0);
        assert_eq!(stats.count[2], 1);
    }

    #[test]
    fn test_select_lead() {
        let mut freqs = [0u16; NUM_SAMPLES];
        // avg period 428: 0x10000 / 428 = 153; pitch = 153 * 98 / 5 = 2998.
        freqs[0] = 98;
        freqs[1] = 10;

        let mut cmds = Vec::new();
        for d in 0..16 {
            cmds.push((d, 0, PatternCommand::new(1, 428, 0)));
            cmds.push((d, 1, PatternCommand::new(2, 428, 0)));
        }
        let stats = SampleStats::scan(&pattern_with(&cmds));
        assert_eq!(stats.score(0, freqs[0]), Some(4));
        assert_eq!(stats.select_lead(&freqs), Some(1));

        // Sample 2 with a matching pitch wins even when it comes second.
        freqs.swap(0, 1);
        assert_eq!(stats.select_lead(&freqs), Some(2));
    }

    #[test]
    fn test_select_lead_ties_and_counts() {
        let freqs = [0u16; NUM_SAMPLES];
        let mut cmds = Vec::new();
        for d in 0..3 {
            cmds.push((d, 2, PatternCommand::new(5, 300, 0)));
            cmds.push((d, 3, PatternCommand::new(4, 300, 0)));
        }
        // Equal scores: the lowest sample number wins.
        let stats = SampleStats::scan(&pattern_with(&cmds));
        assert_eq!(stats.select_lead(&freqs), Some(4));

        // count 3: (16 - 3) * 8 * 256 + 3000 * 2
        assert_eq!(stats.score(3, 0), Some(13 * 8 * 256 + 6000));

        cmds.push((10, 0, PatternCommand::new(5, 300, 0)));
        let stats = SampleStats::scan(&pattern_with(&cmds));
        assert_eq!(stats.select_lead(&freqs), Some(5));
    }

    #[test]
    fn test_no_candidates() {
        let stats = SampleStats::scan(&Pattern::default());
        assert_eq!(stats.select_lead(&[0; NUM_SAMPLES]), None);
    }

    #[test]
    fn test_lead_appears_in_pattern() {
        let mut module = single_pattern_module(16);
        module.samples[6].length_w = 16;
        module.sample_data = vec![0x11; 64];
        module.patterns[0].divisions[9][3] = PatternCommand::new(7, 254, 0);
        let freqs = analyze_samples(&module, &FftTables::new());
        let lead = SampleStats::scan(&module.patterns[0]).select_lead(&freqs);
        assert_eq!(lead, Some(7));
    }
}
