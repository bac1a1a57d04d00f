//! Mood cache: song id → (excitedness, happiness), classified at most once
//! per song, ever.

use crate::classifier::MoodClassifier;
use crate::db::SqliteStore;
use crate::error::{MoodError, Result};
use crate::features::{distinct, FeatureCache, NameLookup};
use crate::mood::Mood;
use crate::song::ModelInput;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Moods keyed by song id.
pub type MoodMap = HashMap<String, Mood>;

/// Song ids some caller is classifying right now.
#[derive(Default)]
struct InFlight {
    ids: Mutex<HashSet<String>>,
    released: Condvar,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims every id in `song_ids` that nobody else holds, keeping their
    /// order.
    fn claim(&self, song_ids: &[String]) -> Claim<'_> {
        let mut held = self.lock();
        let ids = song_ids
            .iter()
            .filter(|id| held.insert((*id).clone()))
            .cloned()
            .collect();
        Claim { owner: self, ids }
    }

    /// Blocks until none of `song_ids` is claimed.
    fn wait_for(&self, song_ids: &[String]) {
        let held = self.lock();
        let _held = self
            .released
            .wait_while(held, |held| song_ids.iter().any(|id| held.contains(id)))
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// Ids claimed by one caller, released on drop.
struct Claim<'a> {
    owner: &'a InFlight,
    ids: Vec<String>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut held = self.owner.lock();
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.owner.released.notify_all();
    }
}

/// Read-through cache in front of the mood classifier.
///
/// Songs without usable features (no danceability, or any other model input
/// missing) are never sent to the classifier and never receive a mood.
///
/// A caller classifies only the misses it has claimed. Callers missing
/// different songs run in parallel; a caller missing a song someone else has
/// claimed waits for that song alone.
pub struct MoodCache {
    store: Arc<SqliteStore>,
    features: FeatureCache,
    classifier: Arc<dyn MoodClassifier>,
    in_flight: InFlight,
}

impl MoodCache {
    #[must_use]
    pub fn new(
        store: Arc<SqliteStore>,
        features: FeatureCache,
        classifier: Arc<dyn MoodClassifier>,
    ) -> Self {
        Self {
            store,
            features,
            classifier,
            in_flight: InFlight::default(),
        }
    }

    /// The feature cache this mood cache backfills through.
    #[must_use]
    pub fn features(&self) -> &FeatureCache {
        &self.features
    }

    /// Moods for the requested songs, classifying any that have never been
    /// classified.
    pub fn get_or_classify(&self, song_ids: &[String]) -> Result<MoodMap> {
        self.get_or_classify_named(song_ids, &NameLookup::new())
    }

    /// Like [`MoodCache::get_or_classify`], with display names for songs
    /// that are new to the feature cache.
    pub fn get_or_classify_named(&self, song_ids: &[String], names: &NameLookup) -> Result<MoodMap> {
        let song_ids = distinct(song_ids);
        let mut moods = self.store.moods_by_ids(&song_ids)?;
        let mut pending: Vec<String> = song_ids
            .into_iter()
            .filter(|id| !moods.contains_key(id))
            .collect();

        while !pending.is_empty() {
            let claim = self.in_flight.claim(&pending);
            if claim.ids.is_empty() {
                self.in_flight.wait_for(&pending);
            } else {
                // A previous holder may have stored some of these already.
                let mut uncached = claim.ids.clone();
                moods.extend(self.store.moods_by_ids(&uncached)?);
                uncached.retain(|id| !moods.contains_key(id));
                self.classify_into(&uncached, names, &mut moods)?;
                pending.retain(|id| !claim.ids.contains(id));
            }
            drop(claim);

            moods.extend(self.store.moods_by_ids(&pending)?);
            pending.retain(|id| !moods.contains_key(id));
        }

        Ok(moods)
    }

    /// Fetches features for `uncached`, classifies the usable ones in one
    /// batch and persists the results into the store and `moods`.
    fn classify_into(&self, uncached: &[String], names: &NameLookup, moods: &mut MoodMap) -> Result<()> {
        if uncached.is_empty() {
            return Ok(());
        }

        let features = self.features.get_or_fetch(uncached, names)?;
        let (batch_ids, inputs): (Vec<&String>, Vec<ModelInput>) = uncached
            .iter()
            .filter_map(|id| match features.get(id).and_then(|f| f.model_input()) {
                Some(input) => Some((id, input)),
                None => {
                    debug!("Song {id} has no usable features, leaving it unscored");
                    None
                }
            })
            .unzip();
        if inputs.is_empty() {
            return Ok(());
        }

        let predictions = self
            .classifier
            .predict(&inputs)
            .map_err(MoodError::Classifier)?;
        if predictions.happiness.len() != inputs.len() || predictions.excitedness.len() != inputs.len() {
            return Err(MoodError::ConsistencyViolation(format!(
                "classifier returned {} happiness and {} excitedness predictions for {} songs",
                predictions.happiness.len(),
                predictions.excitedness.len(),
                inputs.len()
            )));
        }

        let mut stale = Vec::new();
        for (position, id) in batch_ids.into_iter().enumerate() {
            let mood = Mood {
                excitedness: predictions.excitedness[position],
                happiness: predictions.happiness[position],
            };
            if self.store.insert_mood_if_absent(id, mood)? {
                moods.insert(id.clone(), mood);
            } else {
                stale.push(id.clone());
            }
        }
        if !stale.is_empty() {
            // Written by another process sharing the database; the stored mood wins.
            warn!("{} songs were classified concurrently elsewhere", stale.len());
            moods.extend(self.store.moods_by_ids(&stale)?);
        }

        info!("Classified {} new songs", inputs.len());
        Ok(())
    }
}
