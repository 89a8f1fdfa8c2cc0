use crate::model::pitch::Pitch;
use crate::model::song::*;
use anyhow::{Result, anyhow};
use log::{debug, warn};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const DEFAULT_MPQN: u32 = 500_000;
const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;
const MICROSECONDS_PER_SECOND: f64 = 1_000_000.0;

struct NoteInterval {
    pub midi: u8,
    pub start_tick: u64,
    pub end_tick: u64,
}

#[derive(Debug, Clone)]
struct TempoSegment {
    pub mpqn: u32,
    pub start_tick: u64,
    pub secs_at_start: f64,
}

/// Reads a Standard MIDI File into a song ordered by start time.
///
/// Every note of every track is kept. `clip_to_range` folds notes outside the
/// range by whole octaves until they fit, dropping those that never do.
pub fn import_midi_file<P: AsRef<Path>>(
    path: P,
    transpose_semitones: i32,
    clip_to_range: Option<(u8, u8)>,
) -> Result<Song> {
    let bytes = fs::read(path.as_ref()).map_err(|e| {
        anyhow!(
            "Failed to read MIDI file {}: {}",
            path.as_ref().display(),
            e
        )
    })?;

    let title = path
        .as_ref()
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string());

    import_midi_bytes(&bytes, title, transpose_semitones, clip_to_range)
}

pub fn import_midi_bytes(
    bytes: &[u8],
    title: Option<String>,
    transpose_semitones: i32,
    clip_to_range: Option<(u8, u8)>,
) -> Result<Song> {
    let smf = Smf::parse(bytes).map_err(|e| anyhow!("Failed to parse MIDI: {:?}", e))?;

    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(t) => t.as_int() as u64,
        Timing::Timecode(_fps, _subframe) => {
            return Err(anyhow!(
                "SMPTE timecode midi timing is not currently supported..!"
            ));
        }
    };

    if ticks_per_quarter == 0 {
        return Err(anyhow!("MIDI header declares 0 ticks per quarter note..!"));
    }

    debug!("Ticks per quarter note: {}", ticks_per_quarter);
    debug!(
        "MIDI format: {:?}, tracks: {}",
        smf.header.format,
        smf.tracks.len()
    );

    let mut tempo_changes: Vec<(u64, u32)> = Vec::new();
    tempo_changes.push((0u64, DEFAULT_MPQN)); // default tempo to ~120bpm until a tempo meta appears

    let mut intervals: Vec<NoteInterval> = Vec::new();
    let mut open_notes: HashMap<(u8, u8), Vec<u64>> = HashMap::new();

    for (track_idx, track) in smf.tracks.iter().enumerate() {
        let mut abs_tick: u64 = 0;
        for event in track.iter() {
            abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);

            match &event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(micro)) => {
                    let mpqn: u32 = micro.as_int();
                    tempo_changes.push((abs_tick, mpqn));
                    debug!(
                        "Tempo change at tick {} -> {} us/qn (track {})",
                        abs_tick, mpqn, track_idx
                    );
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch: u8 = channel.as_int();

                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            open_notes
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push(abs_tick);
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            close_note(&mut open_notes, &mut intervals, ch, key.as_int(), abs_tick);
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
    }

    let last_tick_estimate = intervals
        .iter()
        .map(|interval| interval.end_tick)
        .max()
        .unwrap_or(0)
        .max(
            tempo_changes
                .iter()
                .map(|(tick, _)| *tick)
                .max()
                .unwrap_or(0),
        );

    for ((ch, key), stack) in open_notes.into_iter() {
        for start_tick in stack {
            let end_tick = if last_tick_estimate > start_tick {
                last_tick_estimate
            } else {
                start_tick + ticks_per_quarter
            };

            intervals.push(NoteInterval {
                midi: key,
                start_tick,
                end_tick,
            });

            warn!(
                "Unclosed NoteOn for {}, channel: {} at tick: {} auto-closing at: {}..!",
                key, ch, start_tick, end_tick
            );
        }
    }

    let tempo_segments = build_tempo_segments(tempo_changes, ticks_per_quarter);
    let ticks_to_secs = |tick: u64| -> f64 {
        let segment = match tempo_segments.iter().rfind(|seg| seg.start_tick <= tick) {
            Some(s) => s,
            None => &tempo_segments[0],
        };

        let delta_ticks = tick.saturating_sub(segment.start_tick) as f64;
        segment.secs_at_start
            + delta_ticks * (segment.mpqn as f64) / (ticks_per_quarter as f64) / MICROSECONDS_PER_SECOND
    };

    let mut events: Vec<NoteEvent> = Vec::new();
    for interval in intervals.into_iter() {
        let Some(note_id) = fit_note(interval.midi, transpose_semitones, clip_to_range) else {
            continue;
        };

        let start = ticks_to_secs(interval.start_tick);
        let end = ticks_to_secs(interval.end_tick);
        let name = Pitch::from_midi(note_id).to_string();

        match NoteEvent::new(name, start, end) {
            Ok(event) => events.push(event),
            Err(why) => debug!("Skipping midi note {}: {}", interval.midi, why),
        }
    }

    // stable, so simultaneous notes keep the order they were closed in
    events.sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));

    // tempo in effect at the first tick
    let tempo_bpm = tempo_segments
        .first()
        .map(|tempo| MICROSECONDS_PER_MINUTE / (tempo.mpqn as f64));

    Ok(Song {
        metadata: Metadata { title, tempo_bpm },
        events,
    })
}

fn build_tempo_segments(mut tempo_changes: Vec<(u64, u32)>, ticks_per_quarter: u64) -> Vec<TempoSegment> {
    let mut last_tick: u64 = 0;
    let mut secs_accum: f64 = 0.0;
    let mut last_mpqn: u32 = DEFAULT_MPQN;
    let mut tempo_segments: Vec<TempoSegment> = Vec::new();

    tempo_changes.sort_by_key(|(tick, _)| *tick);

    for (tick, mpqn) in tempo_changes.into_iter() {
        if tick > last_tick {
            let delta_ticks = (tick - last_tick) as f64;
            secs_accum +=
                delta_ticks * (last_mpqn as f64) / (ticks_per_quarter as f64) / MICROSECONDS_PER_SECOND;
        }

        // a later change at the same tick wins
        if let Some(last) = tempo_segments.last_mut()
            && last.start_tick == tick
        {
            last.mpqn = mpqn;
        } else {
            tempo_segments.push(TempoSegment {
                start_tick: tick,
                mpqn,
                secs_at_start: secs_accum,
            });
        }

        last_tick = tick;
        last_mpqn = mpqn;
    }

    tempo_segments
}

/// Applies the transpose and the octave folding. `None` when the note can't be kept.
fn fit_note(midi: u8, transpose_semitones: i32, clip_to_range: Option<(u8, u8)>) -> Option<u8> {
    let mut note_id = midi as i32 + transpose_semitones;

    if let Some((min_id, max_id)) = clip_to_range {
        let min_id = min_id as i32;
        let max_id = max_id as i32;

        let mut attempts = 0;
        while (note_id < min_id || note_id > max_id) && attempts < 8 {
            if note_id < min_id {
                note_id += 12;
            } else if note_id > max_id {
                note_id -= 12;
            }
            attempts += 1;
        }

        if note_id < min_id || note_id > max_id {
            warn!(
                "Dropping note {} (during octave transpose) as it was not in range [{}..={}]..!",
                midi, min_id, max_id
            );
            return None;
        }
    }

    if !(0..=127).contains(&note_id) {
        warn!("Dropping out-of-range MIDI {} after transpose..!", note_id);
        return None;
    }

    Some(note_id as u8)
}

fn close_note(
    open_notes: &mut HashMap<(u8, u8), Vec<u64>>,
    intervals: &mut Vec<NoteInterval>,
    ch: u8,
    midi_num: u8,
    abs_tick: u64,
) {
    if let Some(start_tick) = open_notes
        .get_mut(&(ch, midi_num))
        .and_then(|stack| stack.pop())
    {
        intervals.push(NoteInterval {
            midi: midi_num,
            start_tick,
            end_tick: abs_tick,
        });
    } else {
        debug!(
            "Orphaned NoteOff for {} ch{} at tick {}..!",
            midi_num, ch, abs_tick
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use midly::num::{u4, u7, u15, u24, u28};
    use midly::{Format, Header, TrackEvent};

    const TPQ: u16 = 480;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9
    }

    fn note_on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(vel),
                },
            },
        }
    }

    fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOff {
                    key: u7::new(key),
                    vel: u7::new(0),
                },
            },
        }
    }

    fn tempo(delta: u32, mpqn: u32) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(mpqn))),
        }
    }

    fn end_of_track() -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        }
    }

    fn write_smf(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let format = if tracks.len() > 1 {
            Format::Parallel
        } else {
            Format::SingleTrack
        };
        let mut smf = Smf::new(Header::new(format, Timing::Metrical(u15::new(TPQ))));
        smf.tracks = tracks;

        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }

    fn names(song: &Song) -> Vec<&str> {
        song.events.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn quarter_notes_at_default_tempo() {
        env_logger::try_init().unwrap_or(());

        let bytes = write_smf(vec![vec![
            note_on(0, 60, 100),
            note_off(480, 60),
            note_on(0, 62, 100),
            note_on(480, 62, 0),
            note_on(0, 70, 100),
            note_off(240, 70),
            end_of_track(),
        ]]);

        let song = import_midi_bytes(&bytes, Some(String::from("scale")), 0, None).unwrap();
        assert_eq!(names(&song), vec!["C4", "D4", "A#4"]);
        assert_eq!(song.metadata.title.as_deref(), Some("scale"));
        assert_eq!(song.metadata.tempo_bpm, Some(120.0));

        let times: Vec<(f64, f64)> = song
            .events
            .iter()
            .map(|e| (e.start_time(), e.end_time()))
            .collect();
        let expected = [(0.0, 0.5), (0.5, 1.0), (1.0, 1.25)];
        for (got, want) in times.iter().zip(expected) {
            assert!(approx_eq(got.0, want.0) && approx_eq(got.1, want.1), "{:?} != {:?}", got, want);
        }
    }

    #[test]
    fn tempo_changes_stretch_time() {
        let bytes = write_smf(vec![
            vec![tempo(0, 1_000_000), tempo(960, 250_000), end_of_track()],
            vec![
                note_on(0, 64, 90),
                note_off(960, 64),
                note_on(0, 65, 90),
                note_off(480, 65),
                end_of_track(),
            ],
        ]);

        let song = import_midi_bytes(&bytes, None, 0, None).unwrap();
        assert_eq!(names(&song), vec!["E4", "F4"]);
        assert!(approx_eq(song.events[0].start_time(), 0.0));
        assert!(approx_eq(song.events[0].end_time(), 2.0));
        assert!(approx_eq(song.events[1].start_time(), 2.0));
        assert!(approx_eq(song.events[1].end_time(), 2.25));
        assert_eq!(song.metadata.tempo_bpm, Some(60.0));
    }

    #[test]
    fn chords_are_kept_and_sorted() {
        let bytes = write_smf(vec![
            vec![note_on(480, 72, 80), note_off(480, 72), end_of_track()],
            vec![
                note_on(0, 60, 80),
                note_on(0, 64, 80),
                note_on(0, 67, 80),
                note_off(960, 60),
                note_off(0, 64),
                note_off(0, 67),
                end_of_track(),
            ],
        ]);

        let song = import_midi_bytes(&bytes, None, 0, None).unwrap();
        assert_eq!(song.events.len(), 4);
        assert!(song.is_sorted());
        assert_eq!(song.events[3].name(), "C5");
        assert!(approx_eq(song.events[3].start_time(), 0.5));
    }

    #[test]
    fn transpose_and_fold_into_range() {
        let bytes = write_smf(vec![vec![
            note_on(0, 36, 100),
            note_off(480, 36),
            note_on(0, 96, 100),
            note_off(480, 96),
            end_of_track(),
        ]]);

        let transposed = import_midi_bytes(&bytes, None, 2, None).unwrap();
        assert_eq!(names(&transposed), vec!["D2", "D7"]);

        let folded = import_midi_bytes(&bytes, None, 0, Some((60, 71))).unwrap();
        assert_eq!(names(&folded), vec!["C4", "C4"]);
    }

    #[test]
    fn unclosed_and_zero_length_notes() {
        env_logger::try_init().unwrap_or(());

        let bytes = write_smf(vec![vec![
            note_on(0, 60, 100),
            note_off(0, 60),
            note_on(0, 62, 100),
            note_on(0, 64, 100),
            note_off(960, 64),
            end_of_track(),
        ]]);

        let song = import_midi_bytes(&bytes, None, 0, None).unwrap();
        assert_eq!(names(&song), vec!["E4", "D4"]);
        // the unclosed D4 is closed at the last tick seen in the file
        assert!(approx_eq(song.events[1].end_time(), 1.0));
    }

    #[test]
    fn reject_garbage_and_missing_files() {
        assert!(import_midi_bytes(b"definitely not midi", None, 0, None).is_err());
        assert!(import_midi_file("./does/not/exist.mid", 0, None).is_err());
    }
}
