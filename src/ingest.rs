//! Play ingestion: recently played tracks into the ledger, with features,
//! artists and moods backfilled along the way.

use crate::catalog::Catalog;
use crate::db::SqliteStore;
use crate::error::{MoodError, Result};
use crate::features::{distinct, NameLookup};
use crate::history::{HistoryLedger, PlayEvent};
use crate::moods::MoodCache;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A track as reported by the listening service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayedTrack {
    pub song_id: String,
    pub name: String,
    /// Primary artist.
    #[serde(default)]
    pub artist_id: Option<String>,
    pub played_at: DateTime<Utc>,
}

/// What one ingestion run added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub plays_recorded: usize,
    pub new_artists: usize,
    pub songs_with_mood: usize,
}

pub struct PlayIngestor {
    store: Arc<SqliteStore>,
    catalog: Arc<dyn Catalog>,
    moods: Arc<MoodCache>,
}

impl PlayIngestor {
    #[must_use]
    pub fn new(store: Arc<SqliteStore>, catalog: Arc<dyn Catalog>, moods: Arc<MoodCache>) -> Self {
        Self { store, catalog, moods }
    }

    /// Records `plays` for `user_id`.
    ///
    /// Plays already in the ledger are ignored. Every played song is run
    /// through the feature and mood caches, so later syncs never hit the
    /// catalog for them.
    pub fn ingest_plays(&self, user_id: &str, plays: &[PlayedTrack]) -> Result<IngestReport> {
        if plays.is_empty() {
            info!("No tracks found for {user_id}");
            return Ok(IngestReport::default());
        }

        let events: Vec<PlayEvent> = plays
            .iter()
            .map(|track| PlayEvent {
                user_id: user_id.to_string(),
                song_id: track.song_id.clone(),
                played_at: track.played_at,
            })
            .collect();
        let plays_recorded = self.store.append_plays(&events)?;
        debug!("Recorded {plays_recorded} of {} plays for {user_id}", plays.len());

        let names: NameLookup = plays
            .iter()
            .map(|track| (track.song_id.clone(), track.name.clone()))
            .collect();
        let song_ids: Vec<String> = plays.iter().map(|track| track.song_id.clone()).collect();
        let song_ids = distinct(&song_ids);

        self.moods.features().get_or_fetch(&song_ids, &names)?;

        let artist_ids: Vec<String> = plays.iter().filter_map(|track| track.artist_id.clone()).collect();
        let new_artists = self.record_artists(&distinct(&artist_ids))?;

        let songs_with_mood = self.moods.get_or_classify_named(&song_ids, &names)?.len();

        let report = IngestReport {
            plays_recorded,
            new_artists,
            songs_with_mood,
        };
        info!(
            "Ingested {} plays for {user_id} ({} new artists, {} of {} songs scored)",
            report.plays_recorded,
            report.new_artists,
            report.songs_with_mood,
            song_ids.len()
        );
        Ok(report)
    }

    fn record_artists(&self, artist_ids: &[String]) -> Result<usize> {
        let known = self.store.known_artist_ids(artist_ids)?;
        let unseen: Vec<String> = artist_ids
            .iter()
            .filter(|id| !known.contains(*id))
            .cloned()
            .collect();

        let mut recorded = 0;
        for batch in unseen.chunks(self.catalog.max_batch_size().max(1)) {
            let artists = self
                .catalog
                .fetch_artists(batch)
                .map_err(MoodError::Catalog)?;
            if artists.len() != batch.len() {
                return Err(MoodError::ConsistencyViolation(format!(
                    "catalog returned {} artists for {} ids",
                    artists.len(),
                    batch.len()
                )));
            }

            for artist in artists.into_iter().flatten() {
                if self.store.insert_artist_if_absent(&artist)? {
                    recorded += 1;
                }
            }
        }
        Ok(recorded)
    }
}
