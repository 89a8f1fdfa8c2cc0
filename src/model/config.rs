use anyhow::bail;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SPEED: f64 = 1.0;
pub const DEFAULT_GAP: f64 = 0.05;
pub const DEFAULT_SPAWN_POSITION: f64 = 5.0;
pub const DEFAULT_MIN_LENGTH: f64 = 0.1;

/// Tunables for one run of the scheduler. Copied at `start` and fixed until the song ends.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Distance units travelled per second.
    pub speed: f64,

    /// Space left between consecutive notes, taken off each note's length.
    pub gap: f64,

    /// Distance from the spawn point to the hit line.
    pub spawn_position: f64,

    /// Shortest length a note token can have.
    pub min_length: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            gap: DEFAULT_GAP,
            spawn_position: DEFAULT_SPAWN_POSITION,
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let values = [self.speed, self.gap, self.spawn_position, self.min_length];
        if values.iter().any(|v| !v.is_finite()) {
            bail!("Scheduler settings must be finite numbers..! {:?}", self);
        }

        if self.speed <= 0.0 {
            bail!("speed must be greater than 0..! (got {})", self.speed);
        }
        if self.gap < 0.0 {
            bail!("gap must not be negative..! (got {})", self.gap);
        }
        if self.spawn_position <= 0.0 {
            bail!("spawn position must be greater than 0..! (got {})", self.spawn_position);
        }
        if self.min_length <= 0.0 {
            bail!("min length must be greater than 0..! (got {})", self.min_length);
        }

        Ok(())
    }

    /// Seconds a note's front edge needs to reach the hit line.
    pub fn travel_time(&self) -> f64 {
        self.spawn_position / self.speed
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "PIANO_PLANE",
    about = "Play a MIDI file as notes gliding onto a mapped piano surface!"
)]
pub struct Args {
    /// Path to the target MIDI file. Plays a short demo phrase when omitted.
    pub midi: Option<PathBuf>,

    /// Note travel speed in distance units per second.
    #[arg(long, default_value_t = DEFAULT_SPEED)]
    pub speed: f64,

    /// Gap left between consecutive notes (in distance units).
    #[arg(long, default_value_t = DEFAULT_GAP)]
    pub gap: f64,

    /// Distance from where notes appear to the hit line.
    #[arg(long = "spawn-position", default_value_t = DEFAULT_SPAWN_POSITION)]
    pub spawn_position: f64,

    /// Minimum visible note length.
    #[arg(long = "min-length", default_value_t = DEFAULT_MIN_LENGTH)]
    pub min_length: f64,

    /// Distance between the same pitch class one octave apart.
    #[arg(long = "octave-size")]
    pub octave_size: Option<f64>,

    /// Override a pitch class distance, e.g. `--map C#=0.2`. May be repeated.
    #[arg(short, long = "map")]
    pub mappings: Vec<String>,

    /// Transpose in semitones (positive or negative).
    #[arg(short, long, default_value_t = 0)]
    pub transpose: i32,

    /// Lowest MIDI note to keep; lower notes are folded up by octaves.
    #[arg(long = "clip-low")]
    pub clip_low: Option<u8>,

    /// Highest MIDI note to keep; higher notes are folded down by octaves.
    #[arg(long = "clip-high")]
    pub clip_high: Option<u8>,

    /// How many times per second the scheduler is ticked.
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Dry run (print first dry_run_max events and exit).
    #[arg(short, long, default_value_t = false)]
    pub dry_run: bool,

    /// Maximum events to print in dry run.
    #[arg(long, default_value_t = 80)]
    pub dry_run_max: usize,

    /// Prints every spawn, move and retire to the terminal.
    #[arg(short, long)]
    pub verbose: bool,

    /// Delays the start of the song by N seconds.
    #[arg(long = "delay-start", default_value_t = 0)]
    pub delay_start: u64,
}

impl Args {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            speed: self.speed,
            gap: self.gap,
            spawn_position: self.spawn_position,
            min_length: self.min_length,
        }
    }

    /// Clip range for the importer, filling a missing bound with the MIDI extreme.
    pub fn clip_range(&self) -> Option<(u8, u8)> {
        match (self.clip_low, self.clip_high) {
            (None, None) => None,
            (low, high) => Some((low.unwrap_or(0), high.unwrap_or(127))),
        }
    }
}
