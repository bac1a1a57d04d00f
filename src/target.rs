//! Target resolution: where in mood space a recommendation should aim, and
//! which catalog filters constrain the candidate pool.

use crate::catalog::{Bound, FilterBounds};
use crate::error::{MoodError, Result};
use crate::mood::MoodPoint;
use std::collections::HashMap;
use std::str::FromStr;

lazy_static::lazy_static! {
    /// Fixed points in mood space, blended with the listener's current mood.
    static ref ARCHETYPES: HashMap<&'static str, MoodPoint> = HashMap::from([
        ("sad", MoodPoint::new(-10.0, -10.0)),
        ("mellow", MoodPoint::new(-10.0, 10.0)),
        ("angry", MoodPoint::new(10.0, -10.0)),
        ("excited", MoodPoint::new(10.0, 10.0)),
    ]);

    /// Activity presets. `dance`, `karaoke` and `nogiets` are aliases of the
    /// unrestricted bounds.
    static ref PRESETS: HashMap<&'static str, FilterBounds> = {
        let open = FilterBounds::default();
        let study = FilterBounds {
            acousticness: Bound::new(0.6, 1.0),
            instrumentalness: Bound::new(0.5, 1.0),
            loudness: Bound::new(-30.0, -10.0),
            danceability: Bound::new(0.0, 0.1),
            energy: Bound::new(0.0, 0.35),
            speechiness: Bound::new(0.0, 0.1),
            ..open
        };
        HashMap::from([
            ("dance", open),
            ("study", study),
            ("karaoke", open),
            ("nogiets", open),
        ])
    };
}

/// A named recommendation mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// A mood archetype such as `sad` or `excited`.
    Archetype(MoodPoint),
    /// An activity preset such as `study` or `dance`.
    Preset(FilterBounds),
}

impl FromStr for Mode {
    type Err = MoodError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        if let Some(&point) = ARCHETYPES.get(name.as_str()) {
            return Ok(Mode::Archetype(point));
        }
        PRESETS
            .get(name.as_str())
            .map(|&bounds| Mode::Preset(bounds))
            .ok_or_else(|| MoodError::UnknownMode(s.to_string()))
    }
}

/// Where to aim, and what to fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub point: MoodPoint,
    pub bounds: FilterBounds,
}

impl Target {
    /// An explicit point with no catalog filtering.
    #[must_use]
    pub fn at(point: MoodPoint) -> Self {
        Self {
            point,
            bounds: FilterBounds::default(),
        }
    }
}

impl Mode {
    /// Archetypes aim halfway between the archetype and `current`. Presets
    /// aim at `requested` (or `current` when nothing was requested) and
    /// contribute their filter bounds.
    #[must_use]
    pub fn resolve(self, current: MoodPoint, requested: Option<MoodPoint>) -> Target {
        match self {
            Mode::Archetype(archetype) => Target::at(archetype.midpoint(current)),
            Mode::Preset(bounds) => Target {
                point: requested.unwrap_or(current),
                bounds,
            },
        }
    }
}

/// Resolves the target for the mode named `mode`.
pub fn resolve(mode: &str, current: MoodPoint, requested: Option<MoodPoint>) -> Result<Target> {
    Ok(mode.parse::<Mode>()?.resolve(current, requested))
}

/// Names accepted by [`resolve`], archetypes first.
#[must_use]
pub fn mode_names() -> Vec<&'static str> {
    let mut archetypes: Vec<_> = ARCHETYPES.keys().copied().collect();
    let mut presets: Vec<_> = PRESETS.keys().copied().collect();
    archetypes.sort_unstable();
    presets.sort_unstable();
    archetypes.extend(presets);
    archetypes
}
