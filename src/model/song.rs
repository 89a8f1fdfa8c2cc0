use crate::error::SongError;
use serde::{Deserialize, Serialize};

/// One note of a song, in seconds from the start of the song.
///
/// The name is kept as written (e.g. `"C#4"`) and only parsed when the note
/// spawns, so a malformed name costs that one note and nothing else.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawNoteEvent")]
pub struct NoteEvent {
    name: String,
    start_time: f64,
    end_time: f64,
}

#[derive(Deserialize)]
struct RawNoteEvent {
    name: String,
    start_time: f64,
    end_time: f64,
}

impl TryFrom<RawNoteEvent> for NoteEvent {
    type Error = SongError;

    fn try_from(raw: RawNoteEvent) -> Result<Self, Self::Error> {
        NoteEvent::new(raw.name, raw.start_time, raw.end_time)
    }
}

impl NoteEvent {
    pub fn new(
        name: impl Into<String>,
        start_time: f64,
        end_time: f64,
    ) -> Result<NoteEvent, SongError> {
        let name = name.into();

        if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 || end_time <= start_time
        {
            return Err(SongError::InvalidTiming {
                name,
                start_time,
                end_time,
            });
        }

        Ok(NoteEvent {
            name,
            start_time,
            end_time,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
    pub tempo_bpm: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Song {
    pub metadata: Metadata,
    pub events: Vec<NoteEvent>,
}

impl Song {
    /// Short phrase used when no MIDI file is at hand.
    pub fn demo() -> Song {
        const NOTES: &[(&str, f64, f64)] = &[
            ("A#5", 0.0, 0.416),
            ("C6", 0.417, 0.832),
            ("A#5", 0.833, 1.249),
            ("A#5", 1.25, 1.457),
            ("G5", 1.458, 1.666),
        ];

        let events = NOTES
            .iter()
            .filter_map(|&(name, start, end)| NoteEvent::new(name, start, end).ok())
            .collect();

        Song {
            metadata: Metadata {
                title: Some(String::from("Demo")),
                tempo_bpm: None,
            },
            events,
        }
    }

    /// Time at which the last note ends, or 0 for an empty song.
    pub fn length_secs(&self) -> f64 {
        self.events
            .iter()
            .map(NoteEvent::end_time)
            .fold(0.0, f64::max)
    }

    /// The scheduler walks events in order and never sorts them itself.
    pub fn is_sorted(&self) -> bool {
        self.events
            .windows(2)
            .all(|pair| pair[0].start_time <= pair[1].start_time)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duration_is_end_minus_start() {
        let event = NoteEvent::new("C4", 1.25, 1.75).unwrap();
        assert_eq!(event.name(), "C4");
        assert!((event.duration() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn reject_bad_timing() {
        assert!(NoteEvent::new("C4", 1.0, 1.0).is_err());
        assert!(NoteEvent::new("C4", 2.0, 1.0).is_err());
        assert!(NoteEvent::new("C4", -0.5, 1.0).is_err());
        assert!(NoteEvent::new("C4", 0.0, f64::NAN).is_err());
        assert!(NoteEvent::new("C4", 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn deserialize_checks_timing() {
        let event: NoteEvent =
            serde_json::from_str(r#"{"name":"C#4","start_time":0.5,"end_time":1.0}"#).unwrap();
        assert_eq!(event, NoteEvent::new("C#4", 0.5, 1.0).unwrap());

        for input in [
            r#"{"name":"C4","start_time":1.0,"end_time":0.5}"#,
            r#"{"name":"C4","start_time":-1.0,"end_time":0.5}"#,
        ] {
            assert!(
                serde_json::from_str::<NoteEvent>(input).is_err(),
                "'{}' should be rejected",
                input
            );
        }

        let song = r#"{"metadata":{"title":null,"tempo_bpm":null},"events":[{"name":"C4","start_time":2.0,"end_time":2.0}]}"#;
        assert!(serde_json::from_str::<Song>(song).is_err());
    }

    #[test]
    fn demo_song_is_sorted() {
        let song = Song::demo();
        assert_eq!(song.events.len(), 5);
        assert!(song.is_sorted());
        assert!((song.length_secs() - 1.666).abs() < 1e-9);
    }
}
