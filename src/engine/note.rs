use crate::error::NoteError;
use crate::model::config::SchedulerConfig;
use crate::model::mapper::PositionMapper;
use crate::model::pitch::Pitch;
use crate::model::song::NoteEvent;

/// Visible length of a note: its duration in distance units minus the gap,
/// never shorter than `min_length`.
pub fn note_length(duration: f64, config: &SchedulerConfig) -> f64 {
    (duration * config.speed - config.gap).max(config.min_length)
}

/// Lateral position of a pitch: the mapped distance of its class, shifted by
/// whole octaves away from the reference octave.
pub fn lateral_offset<M: PositionMapper + ?Sized>(
    pitch: &Pitch,
    mapper: &M,
    octave_size: f64,
) -> Result<f64, NoteError> {
    let distance = mapper
        .distance(pitch.class)
        .ok_or(NoteError::UnknownPitchClass(pitch.class))?;

    Ok(distance + pitch.octave_shift() as f64 * octave_size)
}

/// A note travelling toward the hit line at position 0.
///
/// Positions are along the direction of travel. The front edge starts at the
/// spawn position and the trailing edge sits `length` behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteInstance {
    index: usize,
    pitch: Pitch,
    lateral_offset: f64,
    length: f64,
    front_edge: f64,
    spawn_time: f64,
    speed: f64,
}

impl NoteInstance {
    pub fn spawn<M: PositionMapper + ?Sized>(
        index: usize,
        event: &NoteEvent,
        mapper: &M,
        octave_size: f64,
        config: &SchedulerConfig,
        now: f64,
    ) -> Result<NoteInstance, NoteError> {
        let pitch = Pitch::parse(event.name())?;
        let lateral_offset = lateral_offset(&pitch, mapper, octave_size)?;

        Ok(NoteInstance {
            index,
            pitch,
            lateral_offset,
            length: note_length(event.duration(), config),
            front_edge: config.spawn_position,
            spawn_time: now,
            speed: config.speed,
        })
    }

    /// Position of the event this note was spawned from.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    pub fn lateral_offset(&self) -> f64 {
        self.lateral_offset
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn front_edge(&self) -> f64 {
        self.front_edge
    }

    pub fn trailing_edge(&self) -> f64 {
        self.front_edge + self.length
    }

    pub fn spawn_time(&self) -> f64 {
        self.spawn_time
    }

    /// Where a center-anchored renderer should put the token so that its
    /// front edge lands on `front_edge`. Edge-anchored renderers use
    /// `front_edge` directly.
    pub fn center_position(&self) -> f64 {
        self.front_edge + self.length / 2.0
    }

    pub fn advance(&mut self, dt: f64) {
        self.front_edge -= self.speed * dt;
    }

    /// True once the trailing edge has crossed the hit line.
    pub fn should_retire(&self) -> bool {
        self.trailing_edge() <= 0.0
    }

    /// Time at which the trailing edge reaches the hit line, seen from `now`.
    pub fn projected_end_time(&self, now: f64) -> f64 {
        now + self.trailing_edge() / self.speed
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::mapper::PianoMapper;
    use crate::model::pitch::PitchClass;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9
    }

    #[test]
    fn length_from_duration_and_gap() {
        let config = SchedulerConfig::default();
        assert!(approx_eq(note_length(0.416, &config), 0.366));

        let fast = SchedulerConfig {
            speed: 2.0,
            ..Default::default()
        };
        assert!(approx_eq(note_length(1.0, &fast), 1.95));
    }

    #[test]
    fn length_never_below_minimum() {
        let config = SchedulerConfig::default();
        for duration in [1e-9, 0.01, 0.05, 0.1, 0.149] {
            assert!(note_length(duration, &config) >= config.min_length);
        }
        assert!(approx_eq(note_length(0.01, &config), 0.1));
    }

    #[test]
    fn lateral_offset_shifts_by_octave() {
        let mut mapper = PianoMapper::new();
        mapper.set_octave_size(2.0);

        let c4 = Pitch::parse("C4").unwrap();
        let cs6 = Pitch::parse("C#6").unwrap();
        let a3 = Pitch::parse("A3").unwrap();

        assert!(approx_eq(lateral_offset(&c4, &mapper, 2.0).unwrap(), 0.0));
        assert!(approx_eq(lateral_offset(&cs6, &mapper, 2.0).unwrap(), 4.125));
        assert!(approx_eq(lateral_offset(&a3, &mapper, 2.0).unwrap(), -1.125));
    }

    #[test]
    fn spawn_fails_for_bad_name_or_unmapped_class() {
        let config = SchedulerConfig::default();
        let mapper = PianoMapper::empty();

        let bad_name = NoteEvent::new("X9", 0.0, 1.0).unwrap();
        assert_eq!(
            NoteInstance::spawn(0, &bad_name, &mapper, 1.0, &config, 0.0),
            Err(NoteError::InvalidPitchName(String::from("X9")))
        );

        let unmapped = NoteEvent::new("D4", 0.0, 1.0).unwrap();
        assert_eq!(
            NoteInstance::spawn(1, &unmapped, &mapper, 1.0, &config, 0.0),
            Err(NoteError::UnknownPitchClass(PitchClass::D))
        );
    }

    #[test]
    fn advance_and_retire() {
        let config = SchedulerConfig::default();
        let mapper = PianoMapper::new();
        let event = NoteEvent::new("E4", 0.0, 1.0).unwrap();

        let mut note = NoteInstance::spawn(3, &event, &mapper, 1.0, &config, 0.0).unwrap();
        assert_eq!(note.index(), 3);
        assert!(approx_eq(note.front_edge(), 5.0));
        assert!(approx_eq(note.length(), 0.95));
        assert!(approx_eq(note.center_position(), 5.475));
        assert!(approx_eq(note.lateral_offset(), 0.5));
        assert!(approx_eq(note.projected_end_time(0.0), 5.95));

        note.advance(2.0);
        assert!(approx_eq(note.front_edge(), 3.0));
        assert!(approx_eq(note.projected_end_time(2.0), 5.95));
        assert!(!note.should_retire());

        // front edge past the hit line, trailing edge not yet
        note.advance(3.5);
        assert!(note.front_edge() < 0.0);
        assert!(!note.should_retire());

        note.advance(0.5);
        assert!(note.should_retire());
    }
}
