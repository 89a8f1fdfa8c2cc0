use crate::error::NoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The octave that sits at zero lateral offset.
pub const REFERENCE_OCTAVE: i32 = 4;

/// A note name without its octave.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All twelve pitch classes in chromatic order, starting from C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Sharps and naturals are drawn with different tokens.
    pub fn is_sharp(&self) -> bool {
        self.as_str().ends_with('#')
    }

    /// Semitone index within the octave (C = 0 .. B = 11).
    pub fn semitone(&self) -> u8 {
        *self as u8
    }

    pub fn from_semitone(semitone: u8) -> PitchClass {
        Self::ALL[(semitone % 12) as usize]
    }

    fn from_letter(letter: char, sharp: bool) -> Option<PitchClass> {
        let class = match (letter, sharp) {
            ('C', false) => PitchClass::C,
            ('C', true) => PitchClass::CSharp,
            ('D', false) => PitchClass::D,
            ('D', true) => PitchClass::DSharp,
            ('E', false) => PitchClass::E,
            ('F', false) => PitchClass::F,
            ('F', true) => PitchClass::FSharp,
            ('G', false) => PitchClass::G,
            ('G', true) => PitchClass::GSharp,
            ('A', false) => PitchClass::A,
            ('A', true) => PitchClass::ASharp,
            ('B', false) => PitchClass::B,
            _ => return None,
        };

        Some(class)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PitchClass {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let parsed = match (chars.next(), chars.next(), chars.next()) {
            (Some(letter), None, None) => PitchClass::from_letter(letter, false),
            (Some(letter), Some('#'), None) => PitchClass::from_letter(letter, true),
            _ => None,
        };

        parsed.ok_or_else(|| NoteError::InvalidPitchName(s.to_owned()))
    }
}

/// A fully qualified pitch such as `C#4`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub class: PitchClass,
    pub octave: i32,
}

impl Pitch {
    /// Parses `<Letter>[#]<digit>`. Anything else is an `InvalidPitchName`.
    pub fn parse(name: &str) -> Result<Pitch, NoteError> {
        let invalid = || NoteError::InvalidPitchName(name.to_owned());

        if !name.is_ascii() || name.len() < 2 {
            return Err(invalid());
        }

        let (class_part, octave_part) = name.split_at(name.len() - 1);
        let octave = octave_part
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(invalid)?;
        let class = class_part.parse::<PitchClass>().map_err(|_| invalid())?;

        Ok(Pitch {
            class,
            octave: octave as i32,
        })
    }

    /// Scientific pitch notation for a MIDI note number (60 = C4).
    pub fn from_midi(midi: u8) -> Pitch {
        Pitch {
            class: PitchClass::from_semitone(midi),
            octave: (midi / 12) as i32 - 1,
        }
    }

    /// Octaves above (positive) or below (negative) the reference octave.
    pub fn octave_shift(&self) -> i32 {
        self.octave - REFERENCE_OCTAVE
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class, self.octave)
    }
}
