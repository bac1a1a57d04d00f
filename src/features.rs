//! Feature cache: song id → audio features, backfilled from the catalog.

use crate::catalog::Catalog;
use crate::db::SqliteStore;
use crate::error::{MoodError, Result};
use crate::song::{AudioFeatures, Song};
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Display names for songs, keyed by song id.
pub type NameLookup = HashMap<String, String>;

/// Accretive cache of audio features.
///
/// Misses are fetched from the catalog and stored as new songs; nothing is
/// ever rolled back, so a failed batch leaves earlier batches cached.
#[derive(Clone)]
pub struct FeatureCache {
    store: Arc<SqliteStore>,
    catalog: Arc<dyn Catalog>,
}

impl FeatureCache {
    #[must_use]
    pub fn new(store: Arc<SqliteStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self { store, catalog }
    }

    /// Features for every requested song the catalog knows about.
    ///
    /// Songs the catalog reports as missing are left out of the result and
    /// are not stored. `names` supplies display names for new songs; unnamed
    /// songs are stored under their id.
    pub fn get_or_fetch(
        &self,
        song_ids: &[String],
        names: &NameLookup,
    ) -> Result<HashMap<String, AudioFeatures>> {
        let song_ids = distinct(song_ids);
        let mut features: HashMap<String, AudioFeatures> = self
            .store
            .songs_by_ids(&song_ids)?
            .into_iter()
            .map(|(id, song)| (id, song.features))
            .collect();

        let misses: Vec<String> = song_ids
            .into_iter()
            .filter(|id| !features.contains_key(id))
            .collect();
        if misses.is_empty() {
            return Ok(features);
        }

        debug!("Fetching audio features for {} uncached songs", misses.len());
        let batch_size = self.catalog.max_batch_size().max(1);
        for batch in misses.chunks(batch_size) {
            let fetched = self
                .catalog
                .fetch_features(batch)
                .map_err(MoodError::Catalog)?;
            if fetched.len() != batch.len() {
                return Err(MoodError::ConsistencyViolation(format!(
                    "catalog returned {} feature vectors for {} songs",
                    fetched.len(),
                    batch.len()
                )));
            }

            for (id, song_features) in batch.iter().zip(fetched) {
                let Some(song_features) = song_features else {
                    trace!("Catalog has no features for {id}, skipping");
                    continue;
                };

                let song = Song {
                    id: id.clone(),
                    name: names.get(id).cloned().unwrap_or_else(|| id.clone()),
                    features: song_features,
                };
                self.store.insert_song_if_absent(&song)?;
                features.insert(song.id, song.features);
            }
        }

        Ok(features)
    }
}

/// Order-preserving de-duplication.
pub(crate) fn distinct(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{complete_features, ids, StubCatalog};

    #[test]
    fn test_misses_are_fetched_once_and_stored() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let catalog = Arc::new(
            StubCatalog::new()
                .with_track("a", Some(complete_features()))
                .with_track("b", Some(complete_features())),
        );
        let cache = FeatureCache::new(store.clone(), catalog.clone());

        let mut names = NameLookup::new();
        names.insert("a".to_string(), "Song A".to_string());

        let first = cache.get_or_fetch(&ids(&["a", "b", "a"]), &names).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(catalog.feature_requests(), vec![ids(&["a", "b"])]);

        let second = cache.get_or_fetch(&ids(&["b", "a"]), &NameLookup::new()).unwrap();
        assert_eq!(second, first);
        assert_eq!(catalog.feature_requests().len(), 1, "second call is a cache read");

        let stored = store.songs_by_ids(&ids(&["a", "b"])).unwrap();
        assert_eq!(stored["a"].name, "Song A");
        assert_eq!(stored["b"].name, "b", "unnamed songs fall back to their id");
    }

    #[test]
    fn test_missing_songs_are_excluded() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let catalog = Arc::new(StubCatalog::new().with_track("a", Some(complete_features())));
        let cache = FeatureCache::new(store.clone(), catalog);

        let features = cache.get_or_fetch(&ids(&["a", "ghost"]), &NameLookup::new()).unwrap();
        assert!(features.contains_key("a"));
        assert!(!features.contains_key("ghost"));
        assert!(store.songs_by_ids(&ids(&["ghost"])).unwrap().is_empty());
    }

    #[test]
    fn test_requests_respect_batch_limit() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mut catalog = StubCatalog::new().with_batch_size(2);
        for id in ["a", "b", "c", "d", "e"] {
            catalog = catalog.with_track(id, Some(complete_features()));
        }
        let catalog = Arc::new(catalog);
        let cache = FeatureCache::new(store, catalog.clone());

        let features = cache
            .get_or_fetch(&ids(&["a", "b", "c", "d", "e"]), &NameLookup::new())
            .unwrap();
        assert_eq!(features.len(), 5);
        assert_eq!(
            catalog.feature_requests(),
            vec![ids(&["a", "b"]), ids(&["c", "d"]), ids(&["e"])]
        );
    }

    #[test]
    fn test_failed_batch_keeps_earlier_batches() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let catalog = Arc::new(
            StubCatalog::new()
                .with_batch_size(1)
                .with_track("a", Some(complete_features()))
                .failing_on("b"),
        );
        let cache = FeatureCache::new(store.clone(), catalog);

        let result = cache.get_or_fetch(&ids(&["a", "b"]), &NameLookup::new());
        assert!(matches!(result, Err(MoodError::Catalog(_))));
        assert_eq!(store.songs_by_ids(&ids(&["a"])).unwrap().len(), 1);
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        assert_eq!(distinct(&ids(&["b", "a", "b", "c", "a"])), ids(&["b", "a", "c"]));
    }
}
