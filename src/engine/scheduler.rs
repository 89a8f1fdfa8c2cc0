use crate::engine::note::NoteInstance;
use crate::error::{SchedulerError, SpawnError};
use crate::model::config::SchedulerConfig;
use crate::model::mapper::PositionMapper;
use crate::model::pitch::Pitch;
use crate::model::song::NoteEvent;
use log::{debug, info, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Natural,
    Sharp,
}

/// Everything a renderer needs to place a new token.
///
/// Positions are along the direction of travel, relative to the hit line.
/// `center` is where a center-anchored token goes (`front_edge + length / 2`).
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedNote {
    pub index: usize,
    pub pitch: Pitch,
    pub kind: NoteKind,
    pub lateral_offset: f64,
    pub length: f64,
    pub front_edge: f64,
    pub center: f64,
}

/// A side effect the host has to realise for one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteAction {
    Spawn(SpawnedNote),
    Move {
        index: usize,
        front_edge: f64,
        center: f64,
    },
    Retire {
        index: usize,
    },
}

impl NoteAction {
    fn spawned(note: &NoteInstance) -> NoteAction {
        let pitch = note.pitch();
        NoteAction::Spawn(SpawnedNote {
            index: note.index(),
            pitch,
            kind: if pitch.class.is_sharp() {
                NoteKind::Sharp
            } else {
                NoteKind::Natural
            },
            lateral_offset: note.lateral_offset(),
            length: note.length(),
            front_edge: note.front_edge(),
            center: note.center_position(),
        })
    }

    fn moved(note: &NoteInstance) -> NoteAction {
        NoteAction::Move {
            index: note.index(),
            front_edge: note.front_edge(),
            center: note.center_position(),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            NoteAction::Spawn(spawned) => spawned.index,
            NoteAction::Move { index, .. } | NoteAction::Retire { index } => *index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickStatus {
    #[default]
    Playing,
    SongComplete,
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Spawns first, then one move or retire per note that was live this tick.
    pub actions: Vec<NoteAction>,
    pub spawn_errors: Vec<SpawnError>,
    pub status: TickStatus,
}

impl TickReport {
    pub fn is_complete(&self) -> bool {
        self.status == TickStatus::SongComplete
    }
}

/// Decides which notes spawn, moves them toward the hit line and retires them
/// once they have passed it.
///
/// The host calls `tick` once per frame with a monotonic clock; the scheduler
/// never sleeps or blocks.
#[derive(Debug)]
pub struct Scheduler<M: PositionMapper> {
    config: SchedulerConfig,
    mapper: Option<Arc<M>>,
    octave_size: f64,
    events: Vec<NoteEvent>,
    next_index: usize,
    live: Vec<NoteInstance>,
    song_start_time: f64,
    last_tick_time: f64,
    estimated_end_time: f64,
    ending: bool,
    running: bool,
}

impl<M: PositionMapper> Scheduler<M> {
    pub fn new(config: SchedulerConfig) -> anyhow::Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            mapper: None,
            octave_size: 0.0,
            events: Vec::new(),
            next_index: 0,
            live: Vec::new(),
            song_start_time: 0.0,
            last_tick_time: 0.0,
            estimated_end_time: 0.0,
            ending: false,
            running: false,
        })
    }

    /// Begins a run over `events`, which must already be ordered by start time.
    pub fn start(
        &mut self,
        events: Vec<NoteEvent>,
        mapper: Arc<M>,
        now: f64,
    ) -> Result<(), SchedulerError> {
        if self.running {
            warn!("Refusing to start a new song while one is still running..!");
            return Err(SchedulerError::AlreadyRunning);
        }

        if !events
            .windows(2)
            .all(|pair| pair[0].start_time() <= pair[1].start_time())
        {
            warn!("Song events are not ordered by start time, some notes will spawn late..!");
        }

        self.octave_size = mapper.octave_size();
        self.mapper = Some(mapper);
        self.events = events;
        self.next_index = 0;
        self.live.clear();
        self.song_start_time = now;
        self.last_tick_time = now;
        self.estimated_end_time = now;
        self.ending = false;
        self.running = true;

        info!(
            "Starting song with {} notes, speed: {} gap: {}..!",
            self.events.len(),
            self.config.speed,
            self.config.gap
        );

        Ok(())
    }

    pub fn tick(&mut self, now: f64) -> Result<TickReport, SchedulerError> {
        if !self.running {
            return Err(SchedulerError::NotRunning);
        }
        let Some(mapper) = self.mapper.as_deref() else {
            return Err(SchedulerError::NotRunning);
        };

        let mut report = TickReport::default();
        if now < self.last_tick_time {
            warn!(
                "Clock went backwards by {:.6}s, holding notes in place..!",
                self.last_tick_time - now
            );
        }
        let now = now.max(self.last_tick_time);
        let dt = now - self.last_tick_time;
        self.last_tick_time = now;

        let elapsed = now - self.song_start_time;

        while let Some(event) = self.events.get(self.next_index)
            && event.start_time() <= elapsed
        {
            let index = self.next_index;
            self.next_index += 1;

            match NoteInstance::spawn(index, event, mapper, self.octave_size, &self.config, now) {
                Ok(note) => {
                    debug!(
                        "Spawned note {}: {} at {:.3}s, duration: {:.3}s",
                        index,
                        event.name(),
                        elapsed,
                        event.duration()
                    );
                    report.actions.push(NoteAction::spawned(&note));
                    self.live.push(note);
                }
                Err(cause) => {
                    let error = SpawnError {
                        index,
                        name: event.name().to_owned(),
                        cause,
                    };
                    warn!("{}, skipping it..!", error);
                    report.spawn_errors.push(error);
                }
            }
        }

        let mut latest_end_time = f64::NEG_INFINITY;
        let actions = &mut report.actions;
        self.live.retain_mut(|note| {
            note.advance(dt);
            latest_end_time = latest_end_time.max(note.projected_end_time(now));

            if note.should_retire() {
                debug!(
                    "Retiring note {} after {:.3}s",
                    note.index(),
                    now - note.spawn_time()
                );
                actions.push(NoteAction::Retire {
                    index: note.index(),
                });
                false
            } else {
                actions.push(NoteAction::moved(note));
                true
            }
        });

        if !self.live.is_empty() {
            self.estimated_end_time = latest_end_time;
        }

        if self.next_index == self.events.len() && !self.ending {
            self.ending = true;
            info!(
                "All notes spawned, waiting for notes to finish... Estimated end in {:.3}s",
                self.estimated_end_time - now
            );
        }

        if self.ending && self.live.is_empty() && now >= self.estimated_end_time {
            self.running = false;
            report.status = TickStatus::SongComplete;
            info!(
                "Song ended completely after {:.3}s..!",
                now - self.song_start_time
            );
        }

        Ok(report)
    }

    /// Drops the current run without completing it. Returns the indices of
    /// the notes that were still live so the host can release their tokens.
    pub fn abort(&mut self) -> Vec<usize> {
        if self.running {
            warn!(
                "Aborting song with {} live notes at note {} of {}..!",
                self.live.len(),
                self.next_index,
                self.events.len()
            );
        }

        self.running = false;
        self.ending = false;
        self.drain_live()
    }

    fn drain_live(&mut self) -> Vec<usize> {
        self.live.drain(..).map(|note| note.index()).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_ending(&self) -> bool {
        self.ending
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn live_notes(&self) -> &[NoteInstance] {
        &self.live
    }

    pub fn estimated_end_time(&self) -> f64 {
        self.estimated_end_time
    }
}
