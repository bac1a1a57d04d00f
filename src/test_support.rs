//! Fixtures and deterministic collaborators shared by unit tests.

use crate::catalog::{Catalog, CatalogTrack, FilterBounds, DEFAULT_MAX_BATCH_SIZE};
use crate::classifier::{MoodClassifier, Predictions};
use crate::song::{Artist, AudioFeatures, ModelInput, Song};
use anyhow::{bail, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn complete_features() -> AudioFeatures {
    AudioFeatures {
        duration_ms: Some(215_000.0),
        key: Some(5.0),
        mode: Some(1.0),
        time_signature: Some(4.0),
        acousticness: Some(0.12),
        danceability: Some(0.71),
        energy: Some(0.64),
        instrumentalness: Some(0.0),
        liveness: Some(0.09),
        loudness: Some(-6.5),
        speechiness: Some(0.04),
        valence: Some(0.55),
        tempo: Some(118.0),
    }
}

/// Complete features whose stub mood is (energy, valence).
pub fn features_with(energy: f64, valence: f64) -> AudioFeatures {
    AudioFeatures {
        energy: Some(energy),
        valence: Some(valence),
        ..complete_features()
    }
}

pub fn song(id: &str, features: AudioFeatures) -> Song {
    Song {
        id: id.to_string(),
        name: format!("Song {id}"),
        features,
    }
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// `minute` minutes after 2024-01-01T00:00:00Z.
pub fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
}

/// In-memory catalog that records every call.
#[derive(Default)]
pub struct StubCatalog {
    order: Vec<String>,
    tracks: HashMap<String, Option<AudioFeatures>>,
    artists: HashMap<String, Artist>,
    batch_size: Option<usize>,
    failing: HashSet<String>,
    feature_requests: Mutex<Vec<Vec<String>>>,
    artist_requests: Mutex<Vec<Vec<String>>>,
    recommendation_requests: Mutex<Vec<(Vec<String>, usize, FilterBounds)>>,
}

impl StubCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, id: &str, features: Option<AudioFeatures>) -> Self {
        self.order.push(id.to_string());
        self.tracks.insert(id.to_string(), features);
        self
    }

    pub fn with_artist(mut self, id: &str, name: &str) -> Self {
        self.artists.insert(
            id.to_string(),
            Artist {
                id: id.to_string(),
                name: name.to_string(),
                genres: vec!["pop".to_string()],
                popularity: 10,
            },
        );
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Any feature batch containing `id` fails.
    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn feature_requests(&self) -> Vec<Vec<String>> {
        self.feature_requests.lock().unwrap().clone()
    }

    pub fn artist_requests(&self) -> Vec<Vec<String>> {
        self.artist_requests.lock().unwrap().clone()
    }

    pub fn recommendation_requests(&self) -> Vec<(Vec<String>, usize, FilterBounds)> {
        self.recommendation_requests.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.feature_requests().len() + self.artist_requests().len() + self.recommendation_requests().len()
    }
}

impl Catalog for StubCatalog {
    fn max_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE)
    }

    fn fetch_features(&self, song_ids: &[String]) -> Result<Vec<Option<AudioFeatures>>> {
        self.feature_requests.lock().unwrap().push(song_ids.to_vec());
        if let Some(id) = song_ids.iter().find(|id| self.failing.contains(*id)) {
            bail!("catalog unavailable while fetching {id}");
        }
        Ok(song_ids
            .iter()
            .map(|id| self.tracks.get(id).cloned().flatten())
            .collect())
    }

    fn fetch_artists(&self, artist_ids: &[String]) -> Result<Vec<Option<Artist>>> {
        self.artist_requests.lock().unwrap().push(artist_ids.to_vec());
        Ok(artist_ids.iter().map(|id| self.artists.get(id).cloned()).collect())
    }

    /// Every known track except the seeds, in insertion order.
    fn fetch_recommendations(
        &self,
        seed_ids: &[String],
        pool_size: usize,
        bounds: &FilterBounds,
    ) -> Result<Vec<CatalogTrack>> {
        self.recommendation_requests
            .lock()
            .unwrap()
            .push((seed_ids.to_vec(), pool_size, *bounds));
        Ok(self
            .order
            .iter()
            .filter(|id| !seed_ids.contains(id))
            .take(pool_size)
            .map(|id| CatalogTrack {
                song_id: id.clone(),
                name: format!("Song {id}"),
            })
            .collect())
    }
}

/// Classifier whose mood is (energy, valence) of each input.
#[derive(Default)]
pub struct StubClassifier {
    batches: Mutex<Vec<usize>>,
    failing: bool,
    dropping_last: bool,
}

impl StubClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Returns one prediction too few per batch.
    pub fn dropping_last(mut self) -> Self {
        self.dropping_last = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

impl MoodClassifier for StubClassifier {
    fn predict(&self, inputs: &[ModelInput]) -> Result<Predictions> {
        self.batches.lock().unwrap().push(inputs.len());
        if self.failing {
            bail!("model exploded");
        }

        let mut predictions = Predictions {
            happiness: inputs.iter().map(|input| input[9]).collect(),
            excitedness: inputs.iter().map(|input| input[4]).collect(),
        };
        if self.dropping_last {
            predictions.happiness.pop();
            predictions.excitedness.pop();
        }
        Ok(predictions)
    }
}
