use crate::model::pitch::PitchClass;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// `start` was called while a previous song is still running.
    #[error("A song is already running..!")]
    AlreadyRunning,

    /// `tick` was called before `start` or after the song completed.
    #[error("No song is running..!")]
    NotRunning,
}

/// Why a single note could not be turned into a live instance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoteError {
    #[error("Invalid pitch name '{0}', expected <A-G>[#]<octave digit>")]
    InvalidPitchName(String),

    #[error("Pitch class {0} has no mapped distance")]
    UnknownPitchClass(PitchClass),
}

/// A note that was skipped while spawning. Never fatal to the tick loop.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Error spawning note {index} ('{name}'): {cause}")]
pub struct SpawnError {
    pub index: usize,
    pub name: String,
    pub cause: NoteError,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SongError {
    #[error("Invalid timing for '{name}': start={start_time}s end={end_time}s")]
    InvalidTiming {
        name: String,
        start_time: f64,
        end_time: f64,
    },
}
