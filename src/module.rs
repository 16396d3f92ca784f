//! Loader for 4-channel ProTracker modules.
//!
//! A module is a fixed 1084-byte header (title, 31 sample descriptors, pattern table and tracker
//! id), followed by the patterns referenced from the pattern table, followed by the signed 8-bit
//! PCM data of all samples, in sample order.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use byteorder::{ReadBytesExt, BE};
use log::{debug, info};

use crate::error::{Error, Result};

pub const TITLE_LEN: usize = 20;
pub const SAMPLE_NAME_LEN: usize = 22;
pub const NUM_SAMPLES: usize = 31;
pub const NUM_CHANNELS: usize = 4;
pub const DIVS_PER_PATTERN: usize = 64;
pub const PATTERN_TABLE_LEN: usize = 128;
pub const NUM_PATTERNS_MAX: usize = 100;

pub const HEADER_SIZE: usize = TITLE_LEN + NUM_SAMPLES * (SAMPLE_NAME_LEN + 8) + 2 + PATTERN_TABLE_LEN + 4;
pub const PATTERN_SIZE: usize = DIVS_PER_PATTERN * NUM_CHANNELS * 4;

const TRACKER_IDS: [&[u8; 4]; 3] = [b"M.K.", b"M!K!", b"FLT4"];

#[derive(Debug, Default, Clone)]
pub struct SampleInfo {
    pub name: String,
    /// Length in 16-bit words.
    pub length_w: u16,
    pub finetune: u8,
    pub volume: u8,
    pub loop_start_w: u16,
    pub loop_length_w: u16,
}

impl SampleInfo {
    pub fn len_bytes(&self) -> usize {
        self.length_w as usize * 2
    }
}

/// Effects the track builder cares about. Everything else is carried as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    PositionJump(u8),
    SetVolume(u8),
    PatternBreak(u8),
    PatternLoop(u8),
    PatternDelay(u8),
    SetSpeed(u8),
    Other(u16),
}

/// One channel of one division.
///
/// Encoded as 32 big-endian bits: sample high nibble, 12-bit period, sample low nibble, 12-bit
/// effect.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatternCommand {
    pub sample: u8,
    pub period: u16,
    pub effect: u16,
}

impl PatternCommand {
    pub fn new(sample: u8, period: u16, effect: u16) -> Self {
        PatternCommand {
            sample,
            period: period & 0xFFF,
            effect: effect & 0xFFF,
        }
    }

    pub fn from_raw(raw: u32) -> Self {
        let sample_hi = (raw >> 28) as u8;
        let period = ((raw >> 16) & 0xFFF) as u16;
        let sample_lo = ((raw >> 12) & 0xF) as u8;
        let effect = (raw & 0xFFF) as u16;
        PatternCommand {
            sample: (sample_hi << 4) | sample_lo,
            period,
            effect,
        }
    }

    pub fn effect(&self) -> Effect {
        let param = (self.effect & 0xFF) as u8;
        match self.effect >> 8 {
            0x0 if param == 0 => Effect::None,
            0xB => Effect::PositionJump(param),
            0xC => Effect::SetVolume(param),
            0xD => Effect::PatternBreak(param),
            0xE => match param >> 4 {
                0x6 => Effect::PatternLoop(param & 0xF),
                0xE => Effect::PatternDelay(param & 0xF),
                _ => Effect::Other(self.effect),
            },
            0xF => Effect::SetSpeed(param),
            _ => Effect::Other(self.effect),
        }
    }
}

pub type PatternDivision = [PatternCommand; NUM_CHANNELS];

#[derive(Clone)]
pub struct Pattern {
    pub divisions: [PatternDivision; DIVS_PER_PATTERN],
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern {
            divisions: [[PatternCommand::default(); NUM_CHANNELS]; DIVS_PER_PATTERN],
        }
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self
            .divisions
            .iter()
            .flat_map(|d| d.iter())
            .filter(|c| **c != PatternCommand::default())
            .count();
        f.debug_struct("Pattern").field("commands", &used).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    pub title: String,
    pub samples: Vec<SampleInfo>,
    /// Song order, truncated to its declared length.
    pub pattern_table: Vec<u8>,
    pub patterns: Vec<Pattern>,
    /// PCM data of all samples, zero-filled if the file was truncated.
    pub sample_data: Vec<u8>,
}

fn read_string<R: Read>(r: &mut R, len: usize) -> io::Result<String> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(len);
    Ok(String::from_utf8_lossy(&buf[..end]).trim_end().to_string())
}

fn invalid(msg: &str) -> Error {
    Error::InvalidModule(msg.to_string())
}

impl Module {
    pub fn load(path: &Path) -> Result<Module> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        info!("loading module {} ({} bytes)", path.display(), data.len());
        Module::parse(&data)
    }

    pub fn parse(data: &[u8]) -> Result<Module> {
        if data.len() < HEADER_SIZE {
            return Err(invalid("file too short"));
        }
        let mut cursor = Cursor::new(data);
        let header_err = |_: io::Error| invalid("truncated header");

        let title = read_string(&mut cursor, TITLE_LEN).map_err(header_err)?;
        let mut samples = Vec::with_capacity(NUM_SAMPLES);
        for _ in 0..NUM_SAMPLES {
            samples.push(SampleInfo {
                name: read_string(&mut cursor, SAMPLE_NAME_LEN).map_err(header_err)?,
                length_w: cursor.read_u16::<BE>().map_err(header_err)?,
                finetune: cursor.read_u8().map_err(header_err)?,
                volume: cursor.read_u8().map_err(header_err)?,
                loop_start_w: cursor.read_u16::<BE>().map_err(header_err)?,
                loop_length_w: cursor.read_u16::<BE>().map_err(header_err)?,
            });
        }

        let pat_tbl_size = cursor.read_u8().map_err(header_err)? as usize;
        let _unused = cursor.read_u8().map_err(header_err)?;
        let mut pat_tbl = [0u8; PATTERN_TABLE_LEN];
        cursor.read_exact(&mut pat_tbl).map_err(header_err)?;
        let mut tracker_id = [0u8; 4];
        cursor.read_exact(&mut tracker_id).map_err(header_err)?;

        if !TRACKER_IDS.iter().any(|id| **id == tracker_id) {
            return Err(Error::InvalidModule(format!(
                "unsupported tracker id {:?}",
                String::from_utf8_lossy(&tracker_id)
            )));
        }
        if pat_tbl_size > PATTERN_TABLE_LEN {
            return Err(invalid("pattern table too long"));
        }

        let num_patterns = pat_tbl[..pat_tbl_size]
            .iter()
            .map(|&p| p as usize + 1)
            .max()
            .unwrap_or(1);
        if num_patterns > NUM_PATTERNS_MAX {
            return Err(Error::InvalidModule(format!(
                "too many patterns ({})",
                num_patterns
            )));
        }

        if data.len() < HEADER_SIZE + num_patterns * PATTERN_SIZE {
            return Err(invalid("truncated pattern data"));
        }

        let mut patterns = Vec::new();
        patterns.try_reserve(num_patterns)?;
        for _ in 0..num_patterns {
            let mut pattern = Pattern::default();
            for div in pattern.divisions.iter_mut() {
                for cmd in div.iter_mut() {
                    let raw = cursor
                        .read_u32::<BE>()
                        .map_err(|_| invalid("truncated pattern data"))?;
                    *cmd = PatternCommand::from_raw(raw);
                }
            }
            patterns.push(pattern);
        }

        let samples_size: usize = samples.iter().map(SampleInfo::len_bytes).sum();
        let mut sample_data = Vec::new();
        sample_data.try_reserve_exact(samples_size)?;
        let start = cursor.position() as usize;
        let available = &data[start..];
        let read_size = available.len().min(samples_size);
        sample_data.extend_from_slice(&available[..read_size]);
        // Some modules in the wild are slightly truncated.
        sample_data.resize(samples_size, 0);
        if read_size < samples_size {
            debug!(
                "sample data truncated: {} of {} bytes",
                read_size, samples_size
            );
        }

        info!(
            "module {:?}: {} song positions, {} patterns, {} bytes of samples",
            title, pat_tbl_size, num_patterns, samples_size
        );

        Ok(Module {
            title,
            samples,
            pattern_table: pat_tbl[..pat_tbl_size].to_vec(),
            patterns,
            sample_data,
        })
    }
}
