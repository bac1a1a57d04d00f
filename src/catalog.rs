//! The music-catalog collaborator: audio features, artist metadata and
//! candidate pools for recommendations.
//!
//! [`Catalog`] is the seam; [`JsonCatalog`] is the offline adapter backed by a
//! JSON export of the catalog.

use crate::song::{Artist, AudioFeatures};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Audio-feature requests per call accepted by the catalog.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Inclusive range for one audio feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub min: f64,
    pub max: f64,
}

impl Bound {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Missing values are not constrained.
    #[must_use]
    pub fn admits(self, value: Option<f64>) -> bool {
        value.map_or(true, |v| v >= self.min && v <= self.max)
    }
}

/// Per-feature min/max filters applied when fetching a candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterBounds {
    pub key: Bound,
    pub mode: Bound,
    pub acousticness: Bound,
    pub danceability: Bound,
    pub energy: Bound,
    pub instrumentalness: Bound,
    pub liveness: Bound,
    pub loudness: Bound,
    pub speechiness: Bound,
    pub valence: Bound,
    pub tempo: Bound,
}

impl Default for FilterBounds {
    /// The full domain of every feature, i.e. no filtering.
    fn default() -> Self {
        Self {
            key: Bound::new(-1.0, 11.0),
            mode: Bound::new(0.0, 1.0),
            acousticness: Bound::new(0.0, 1.0),
            danceability: Bound::new(0.0, 1.0),
            energy: Bound::new(0.0, 1.0),
            instrumentalness: Bound::new(0.0, 1.0),
            liveness: Bound::new(0.0, 1.0),
            loudness: Bound::new(-60.0, 0.0),
            speechiness: Bound::new(0.0, 1.0),
            valence: Bound::new(0.0, 1.0),
            tempo: Bound::new(0.0, 99_999.0),
        }
    }
}

impl FilterBounds {
    #[must_use]
    pub fn admits(&self, features: &AudioFeatures) -> bool {
        self.key.admits(features.key)
            && self.mode.admits(features.mode)
            && self.acousticness.admits(features.acousticness)
            && self.danceability.admits(features.danceability)
            && self.energy.admits(features.energy)
            && self.instrumentalness.admits(features.instrumentalness)
            && self.liveness.admits(features.liveness)
            && self.loudness.admits(features.loudness)
            && self.speechiness.admits(features.speechiness)
            && self.valence.admits(features.valence)
            && self.tempo.admits(features.tempo)
    }
}

/// A track offered by the catalog as a recommendation candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub song_id: String,
    pub name: String,
}

/// Batched catalog lookups. Every call may report individual items as absent
/// (`None`) without failing the batch; results are positional.
pub trait Catalog: Send + Sync {
    /// Largest batch accepted by [`Catalog::fetch_features`] and
    /// [`Catalog::fetch_artists`]. Callers chunk accordingly.
    fn max_batch_size(&self) -> usize {
        DEFAULT_MAX_BATCH_SIZE
    }

    fn fetch_features(&self, song_ids: &[String]) -> Result<Vec<Option<AudioFeatures>>>;

    fn fetch_artists(&self, artist_ids: &[String]) -> Result<Vec<Option<Artist>>>;

    /// Up to `pool_size` candidates related to `seed_ids` whose features fall
    /// within `bounds`.
    fn fetch_recommendations(
        &self,
        seed_ids: &[String],
        pool_size: usize,
        bounds: &FilterBounds,
    ) -> Result<Vec<CatalogTrack>>;
}

/// One track in a catalog export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    /// `None` when the catalog has no analysis for the track.
    #[serde(default)]
    pub features: Option<AudioFeatures>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tracks: Vec<CatalogEntry>,
    #[serde(default)]
    artists: Vec<Artist>,
}

/// Offline catalog loaded from a JSON export:
///
/// ```json
/// { "tracks":  [{ "id": "…", "name": "…", "artists": ["…"], "features": { "energy": 0.5, … } }],
///   "artists": [{ "id": "…", "name": "…", "genres": ["…"], "popularity": 40 }] }
/// ```
///
/// Recommendations are tracks within the bounds, excluding the seeds, with
/// tracks by the seeds' artists first and catalog order otherwise.
#[derive(Debug, Default)]
pub struct JsonCatalog {
    tracks: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
    artists: HashMap<String, Artist>,
}

impl JsonCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        let file: CatalogFile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid catalog JSON in {}", path.display()))?;

        info!(
            "Loaded catalog with {} tracks and {} artists from {}",
            file.tracks.len(),
            file.artists.len(),
            path.display()
        );
        Ok(Self::from_parts(file.tracks, file.artists))
    }

    #[must_use]
    pub fn from_parts(tracks: Vec<CatalogEntry>, artists: Vec<Artist>) -> Self {
        let mut index = HashMap::new();
        for (position, track) in tracks.iter().enumerate() {
            index.entry(track.id.clone()).or_insert(position);
        }
        let artists = artists.into_iter().map(|a| (a.id.clone(), a)).collect();

        Self { tracks, index, artists }
    }

    fn track(&self, id: &str) -> Option<&CatalogEntry> {
        self.index.get(id).map(|&position| &self.tracks[position])
    }
}

impl Catalog for JsonCatalog {
    fn fetch_features(&self, song_ids: &[String]) -> Result<Vec<Option<AudioFeatures>>> {
        debug!("Fetching audio features for {} songs", song_ids.len());
        Ok(song_ids
            .iter()
            .map(|id| self.track(id).and_then(|track| track.features.clone()))
            .collect())
    }

    fn fetch_artists(&self, artist_ids: &[String]) -> Result<Vec<Option<Artist>>> {
        Ok(artist_ids.iter().map(|id| self.artists.get(id).cloned()).collect())
    }

    fn fetch_recommendations(
        &self,
        seed_ids: &[String],
        pool_size: usize,
        bounds: &FilterBounds,
    ) -> Result<Vec<CatalogTrack>> {
        let seeds: HashSet<&str> = seed_ids.iter().map(String::as_str).collect();
        let seed_artists: HashSet<&str> = seed_ids
            .iter()
            .filter_map(|id| self.track(id))
            .flat_map(|track| track.artists.iter().map(String::as_str))
            .collect();

        let mut eligible: Vec<&CatalogEntry> = self
            .tracks
            .iter()
            .filter(|track| !seeds.contains(track.id.as_str()))
            .filter(|track| track.features.as_ref().map_or(true, |f| bounds.admits(f)))
            .collect();
        // Stable: catalog order is kept within each group.
        eligible.sort_by_key(|track| {
            !track.artists.iter().any(|artist| seed_artists.contains(artist.as_str()))
        });

        Ok(eligible
            .into_iter()
            .take(pool_size)
            .map(|track| CatalogTrack {
                song_id: track.id.clone(),
                name: track.name.clone(),
            })
            .collect())
    }
}
