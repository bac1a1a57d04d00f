//! Songs, artists, and the audio-feature schema supplied by the catalog.

use crate::error::MoodError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a song, and its audio features, is stored in the database.
///
/// Created the first time a song id is observed and never revised: features are
/// a property of the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub name: String,
    pub features: AudioFeatures,
}

/// Fixed-schema numeric descriptor of a recording.
///
/// Any value may be missing when the catalog has no usable analysis for the
/// track. Domains: `key` in [-1, 11], `mode` in {0, 1}, `loudness` in dB
/// (roughly [-60, 0]), `tempo` in BPM, most others in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub duration_ms: Option<f64>,
    pub key: Option<f64>,
    pub mode: Option<f64>,
    pub time_signature: Option<f64>,
    pub acousticness: Option<f64>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
}

/// Number of features the mood model consumes.
pub const MODEL_INPUT_LEN: usize = 11;

/// The classifier's view of a song: `duration_ms` and `key` are stored but not used.
pub type ModelInput = [f64; MODEL_INPUT_LEN];

impl AudioFeatures {
    /// Builds the ordered model input vector:
    /// mode, time_signature, acousticness, danceability, energy,
    /// instrumentalness, liveness, loudness, speechiness, valence, tempo.
    ///
    /// Returns `None` when danceability is missing (the catalog's marker for a
    /// track without analysis) or when any other input is missing.
    #[must_use]
    pub fn model_input(&self) -> Option<ModelInput> {
        let danceability = self.danceability?;
        Some([
            self.mode?,
            self.time_signature?,
            self.acousticness?,
            danceability,
            self.energy?,
            self.instrumentalness?,
            self.liveness?,
            self.loudness?,
            self.speechiness?,
            self.valence?,
            self.tempo?,
        ])
    }

    /// Value of a single named feature.
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Acousticness => self.acousticness,
            Metric::Danceability => self.danceability,
            Metric::DurationMs => self.duration_ms,
            Metric::Energy => self.energy,
            Metric::Instrumentalness => self.instrumentalness,
            Metric::Key => self.key,
            Metric::Liveness => self.liveness,
            Metric::Loudness => self.loudness,
            Metric::Mode => self.mode,
            Metric::Speechiness => self.speechiness,
            Metric::Tempo => self.tempo,
            Metric::Valence => self.valence,
        }
    }
}

/// Audio features that can be charted over a user's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Acousticness,
    Danceability,
    DurationMs,
    Energy,
    Instrumentalness,
    Key,
    Liveness,
    Loudness,
    Mode,
    Speechiness,
    Tempo,
    Valence,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::Acousticness,
        Metric::Danceability,
        Metric::DurationMs,
        Metric::Energy,
        Metric::Instrumentalness,
        Metric::Key,
        Metric::Liveness,
        Metric::Loudness,
        Metric::Mode,
        Metric::Speechiness,
        Metric::Tempo,
        Metric::Valence,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Metric::Acousticness => "acousticness",
            Metric::Danceability => "danceability",
            Metric::DurationMs => "duration_ms",
            Metric::Energy => "energy",
            Metric::Instrumentalness => "instrumentalness",
            Metric::Key => "key",
            Metric::Liveness => "liveness",
            Metric::Loudness => "loudness",
            Metric::Mode => "mode",
            Metric::Speechiness => "speechiness",
            Metric::Tempo => "tempo",
            Metric::Valence => "valence",
        }
    }

    /// Parses a comma-separated metric list such as `"energy, tempo"`.
    pub fn parse_list(list: &str) -> Result<Vec<Metric>, MoodError> {
        list.split(',').map(|name| name.trim().parse()).collect()
    }
}

impl FromStr for Metric {
    type Err = MoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| MoodError::InvalidMetric(s.to_string()))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artist metadata recorded alongside ingested plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: u32,
}
