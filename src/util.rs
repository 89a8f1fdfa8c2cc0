use crate::model::mapper::PianoMapper;
use crate::model::pitch::PitchClass;
use anyhow::{Context, anyhow};
use log::{info, warn};

/// Parses a `<CLASS>=<DISTANCE>` mapping override, e.g. `C#=0.2`.
pub fn parse_mapping(input: &str) -> anyhow::Result<(PitchClass, f64)> {
    let (class, distance) = input
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected <CLASS>=<DISTANCE>, got '{}'", input))?;

    let class = class.trim().parse::<PitchClass>()?;
    let distance = distance
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid distance for {} in '{}'", class, input))?;

    if !distance.is_finite() {
        return Err(anyhow!("Distance for {} must be finite, got {}", class, distance));
    }

    Ok((class, distance))
}

/// Builds the piano mapping from the defaults plus any overrides given on the command line.
/// Malformed overrides are reported and skipped.
pub fn build_mapper(overrides: &[String], octave_size: Option<f64>) -> PianoMapper {
    let mut mapper = PianoMapper::new();

    for input in overrides {
        match parse_mapping(input) {
            Ok((class, distance)) => {
                info!("Mapping {} to {}..!", class, distance);
                mapper.set_distance(class, distance);
            }
            Err(why) => warn!("Ignoring mapping '{}': {}", input, why),
        }
    }

    match octave_size {
        Some(size) if size.is_finite() => mapper.set_octave_size(size),
        Some(size) => warn!("Ignoring non-finite octave size {}..!", size),
        None => {}
    }

    mapper
}
