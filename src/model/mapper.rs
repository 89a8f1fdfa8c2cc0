use crate::model::pitch::PitchClass;
use log::warn;
use std::collections::HashMap;

pub const DEFAULT_OCTAVE_SIZE: f64 = 1.0;

// Lateral distance of each pitch class from the anchor, within one octave.
pub const DEFAULT_DISTANCES: &[(PitchClass, f64)] = &[
    (PitchClass::C, 0.0),
    (PitchClass::CSharp, 0.125),
    (PitchClass::D, 0.25),
    (PitchClass::DSharp, 0.375),
    (PitchClass::E, 0.5),
    (PitchClass::F, 0.6),
    (PitchClass::FSharp, 0.675),
    (PitchClass::G, 0.75),
    (PitchClass::GSharp, 0.8),
    (PitchClass::A, 0.875),
    (PitchClass::ASharp, 0.95),
    (PitchClass::B, 1.0),
];

/// Where each pitch class lives on the surface.
///
/// Lookups must be stable for a given pitch class until the mapping is
/// changed. A missing entry is `None`, which callers treat as "unmapped".
pub trait PositionMapper: Send + Sync {
    fn distance(&self, class: PitchClass) -> Option<f64>;

    /// Distance between the same pitch class one octave apart.
    fn octave_size(&self) -> f64;
}

/// In-memory mapping from pitch classes to distances.
#[derive(Debug, Clone)]
pub struct PianoMapper {
    octave_size: f64,
    distances: HashMap<PitchClass, f64>,
}

impl Default for PianoMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl PianoMapper {
    /// A mapper pre-filled with the default layout.
    pub fn new() -> Self {
        let mut mapper = Self::empty();
        mapper.reset();
        mapper
    }

    /// A mapper with no distances, ready to be mapped one pitch class at a time.
    pub fn empty() -> Self {
        Self {
            octave_size: DEFAULT_OCTAVE_SIZE,
            distances: HashMap::with_capacity(PitchClass::ALL.len()),
        }
    }

    /// Restores the default distances. The octave size is left alone.
    pub fn reset(&mut self) {
        self.distances.clear();
        self.distances.extend(DEFAULT_DISTANCES.iter().copied());
    }

    pub fn clear(&mut self) {
        self.distances.clear();
    }

    pub fn set_distance(&mut self, class: PitchClass, distance: f64) {
        self.distances.insert(class, distance);
    }

    pub fn set_octave_size(&mut self, size: f64) {
        self.octave_size = size;
    }

    /// Pitch classes that still have no distance, in chromatic order.
    pub fn unmapped(&self) -> Vec<PitchClass> {
        PitchClass::ALL
            .into_iter()
            .filter(|class| !self.distances.contains_key(class))
            .collect()
    }

    pub fn is_fully_mapped(&self) -> bool {
        self.unmapped().is_empty()
    }
}

impl PositionMapper for PianoMapper {
    fn distance(&self, class: PitchClass) -> Option<f64> {
        let distance = self.distances.get(&class).copied();

        if distance.is_none() {
            warn!("Pitch class {} has not been mapped yet..!", class);
        }

        distance
    }

    fn octave_size(&self) -> f64 {
        self.octave_size
    }
}
