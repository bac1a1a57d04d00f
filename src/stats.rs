//! Read-only views over a user's listening history.

use crate::db::SqliteStore;
use crate::error::Result;
use crate::features::distinct;
use crate::history::{HistoryLedger, HistoryQuery};
use crate::mood::{Mood, MoodPoint};
use crate::song::Metric;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A recently played song.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub song_id: String,
    pub name: String,
    pub played_at: DateTime<Utc>,
    pub mood: Option<Mood>,
}

/// Recent songs plus the mean mood of those that have one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub songs: Vec<HistoryEntry>,
    pub mean_mood: Option<MoodPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopSong {
    pub song_id: String,
    pub name: String,
    pub play_count: usize,
    pub last_played: DateTime<Utc>,
}

/// Feature values of one play.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub song_id: String,
    pub played_at: DateTime<Utc>,
    pub values: BTreeMap<&'static str, Option<f64>>,
}

pub struct ListeningStats {
    store: Arc<SqliteStore>,
}

impl ListeningStats {
    #[must_use]
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// The latest `count` distinct songs, most recent first, drawn from the
    /// latest `3 * count` plays. `count == 0` reads the whole history.
    ///
    /// Only cached moods are reported; nothing is classified here.
    pub fn recent_history(&self, user_id: &str, count: usize) -> Result<Option<HistorySummary>> {
        let query = match count {
            0 => HistoryQuery::All,
            n => HistoryQuery::Latest(n.saturating_mul(3)),
        };
        let plays = self.store.query_recent(user_id, query)?;
        if plays.is_empty() {
            info!("No history found for {user_id}");
            return Ok(None);
        }

        // First sighting of a song in a descending log is its latest play.
        let limit = if count == 0 { usize::MAX } else { count };
        let mut last_played: HashMap<String, DateTime<Utc>> = HashMap::new();
        let mut song_ids = Vec::new();
        for play in plays {
            if song_ids.len() == limit {
                break;
            }
            if let Entry::Vacant(slot) = last_played.entry(play.song_id.clone()) {
                slot.insert(play.played_at);
                song_ids.push(play.song_id);
            }
        }

        let names = self.names_of(&song_ids)?;
        let moods = self.store.moods_by_ids(&song_ids)?;

        let songs: Vec<HistoryEntry> = song_ids
            .into_iter()
            .map(|song_id| HistoryEntry {
                name: names.get(&song_id).cloned().unwrap_or_else(|| song_id.clone()),
                played_at: last_played[&song_id],
                mood: moods.get(&song_id).copied(),
                song_id,
            })
            .collect();
        let mean_mood = MoodPoint::mean(songs.iter().filter_map(|s| s.mood).map(Mood::point))
            .map(|(mean, _)| mean);

        Ok(Some(HistorySummary { songs, mean_mood }))
    }

    /// Most played songs over the whole history. Ties go to the song played
    /// most recently. `count == 0` returns every song.
    pub fn top_songs(&self, user_id: &str, count: usize) -> Result<Vec<TopSong>> {
        let plays = self.store.query_recent(user_id, HistoryQuery::All)?;
        if plays.is_empty() {
            info!("No history found for {user_id}");
            return Ok(Vec::new());
        }

        let mut tallies: Vec<TopSong> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for play in plays {
            match positions.get(&play.song_id) {
                Some(&position) => tallies[position].play_count += 1,
                None => {
                    positions.insert(play.song_id.clone(), tallies.len());
                    tallies.push(TopSong {
                        name: String::new(),
                        song_id: play.song_id,
                        play_count: 1,
                        last_played: play.played_at,
                    });
                }
            }
        }

        // Stable sort: tallies are already in last-played order.
        tallies.sort_by(|a, b| b.play_count.cmp(&a.play_count));
        if count > 0 {
            tallies.truncate(count);
        }

        let song_ids: Vec<String> = tallies.iter().map(|t| t.song_id.clone()).collect();
        let names = self.names_of(&song_ids)?;
        for tally in &mut tallies {
            tally.name = names.get(&tally.song_id).cloned().unwrap_or_else(|| tally.song_id.clone());
        }
        Ok(tallies)
    }

    /// Values of `metrics` (a comma-separated list of feature names) for the
    /// latest `count` plays, most recent first.
    ///
    /// Plays of songs with no cached features are skipped.
    pub fn feature_metrics(&self, user_id: &str, metrics: &str, count: usize) -> Result<Vec<MetricSample>> {
        let metrics = Metric::parse_list(metrics)?;
        let plays = self.store.query_recent(user_id, HistoryQuery::Latest(count))?;
        if plays.is_empty() {
            info!("No history found for {user_id}");
            return Ok(Vec::new());
        }

        let song_ids: Vec<String> = plays.iter().map(|play| play.song_id.clone()).collect();
        let songs = self.store.songs_by_ids(&distinct(&song_ids))?;

        Ok(plays
            .into_iter()
            .filter_map(|play| {
                let song = songs.get(&play.song_id)?;
                let values = metrics
                    .iter()
                    .map(|&metric| (metric.as_str(), song.features.get(metric)))
                    .collect();
                Some(MetricSample {
                    song_id: play.song_id,
                    played_at: play.played_at,
                    values,
                })
            })
            .collect())
    }

    fn names_of(&self, song_ids: &[String]) -> Result<HashMap<String, String>> {
        Ok(self
            .store
            .songs_by_ids(song_ids)?
            .into_iter()
            .map(|(id, song)| (id, song.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MoodError;
    use crate::history::PlayEvent;
    use crate::test_support::{at, complete_features, features_with, song};

    fn stats_with(plays: &[(&str, i64)]) -> (Arc<SqliteStore>, ListeningStats) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let events: Vec<PlayEvent> = plays
            .iter()
            .map(|&(song_id, minute)| PlayEvent {
                user_id: "u".to_string(),
                song_id: song_id.to_string(),
                played_at: at(minute),
            })
            .collect();
        store.append_plays(&events).unwrap();
        (store.clone(), ListeningStats::new(store))
    }

    #[test]
    fn test_recent_history_distinct_songs_with_moods() {
        let (store, stats) = stats_with(&[("a", 1), ("b", 2), ("a", 3), ("c", 4)]);
        store.insert_song_if_absent(&song("a", complete_features())).unwrap();
        store.insert_song_if_absent(&song("c", complete_features())).unwrap();
        store.insert_mood_if_absent("a", Mood { excitedness: 0.2, happiness: 0.4 }).unwrap();
        store.insert_mood_if_absent("c", Mood { excitedness: 0.6, happiness: 0.0 }).unwrap();

        let summary = stats.recent_history("u", 0).unwrap().unwrap();
        let order: Vec<_> = summary.songs.iter().map(|s| s.song_id.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
        assert_eq!(summary.songs[1].name, "Song a");
        assert_eq!(summary.songs[1].played_at, at(3));
        assert_eq!(summary.songs[2].name, "b", "unknown songs fall back to their id");
        assert!(summary.songs[2].mood.is_none());

        let mean = summary.mean_mood.unwrap();
        assert!((mean.excitedness - 0.4).abs() < 1e-12);
        assert!((mean.happiness - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_recent_history_count_limits_songs() {
        let (_store, stats) = stats_with(&[("a", 1), ("b", 2), ("c", 3), ("c", 4)]);
        let summary = stats.recent_history("u", 2).unwrap().unwrap();
        let order: Vec<_> = summary.songs.iter().map(|s| s.song_id.as_str()).collect();
        assert_eq!(order, ["c", "b"]);
        assert!(summary.mean_mood.is_none());
    }

    #[test]
    fn test_recent_history_empty() {
        let (_store, stats) = stats_with(&[]);
        assert!(stats.recent_history("u", 5).unwrap().is_none());
    }

    #[test]
    fn test_top_songs_by_count_then_recency() {
        let (store, stats) = stats_with(&[("a", 1), ("b", 2), ("a", 3), ("b", 4), ("c", 5), ("d", 6), ("d", 7), ("d", 8)]);
        store.insert_song_if_absent(&song("d", complete_features())).unwrap();

        let top = stats.top_songs("u", 0).unwrap();
        let order: Vec<_> = top.iter().map(|t| (t.song_id.as_str(), t.play_count)).collect();
        assert_eq!(order, [("d", 3), ("b", 2), ("a", 2), ("c", 1)]);
        assert_eq!(top[0].name, "Song d");
        assert_eq!(top[0].last_played, at(8));

        assert_eq!(stats.top_songs("u", 2).unwrap().len(), 2);
        assert!(stats.top_songs("nobody", 5).unwrap().is_empty());
    }

    #[test]
    fn test_feature_metrics() {
        let (store, stats) = stats_with(&[("a", 1), ("ghost", 2), ("b", 3)]);
        store.insert_song_if_absent(&song("a", features_with(0.3, 0.7))).unwrap();
        store.insert_song_if_absent(&song("b", features_with(0.8, 0.1))).unwrap();

        let samples = stats.feature_metrics("u", "energy, valence", 3).unwrap();
        assert_eq!(samples.len(), 2, "ghost has no features");
        assert_eq!(samples[0].song_id, "b");
        assert_eq!(samples[0].values["energy"], Some(0.8));
        assert_eq!(samples[1].values["valence"], Some(0.7));
        assert_eq!(samples[1].values.len(), 2);
    }

    #[test]
    fn test_feature_metrics_rejects_unknown_metric() {
        let (_store, stats) = stats_with(&[("a", 1)]);
        match stats.feature_metrics("u", "energy,vibes", 3) {
            Err(MoodError::InvalidMetric(name)) => assert_eq!(name, "vibes"),
            other => panic!("expected InvalidMetric, got {other:?}"),
        }
    }
}
