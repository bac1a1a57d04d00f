//! Mood synchronization: recent plays → cached moods → one snapshot per run.

use crate::error::{MoodError, Result};
use crate::features::distinct;
use crate::history::{HistoryLedger, HistoryQuery};
use crate::mood::{MoodPoint, MoodSnapshot};
use crate::moods::MoodCache;
use chrono::{DateTime, Duration, Utc};
use log::info;
use std::sync::Arc;

/// Keeps a user's mood profile in step with what they have been playing.
///
/// Periodic invocation is up to the caller.
pub struct MoodSynchronizer {
    ledger: Arc<dyn HistoryLedger>,
    moods: Arc<MoodCache>,
}

impl MoodSynchronizer {
    #[must_use]
    pub fn new(ledger: Arc<dyn HistoryLedger>, moods: Arc<MoodCache>) -> Self {
        Self { ledger, moods }
    }

    /// Aggregates the moods of the songs `user_id` played within `window`
    /// and persists the result as a new snapshot.
    ///
    /// Returns `None` (and logs why) when the window holds no plays or none
    /// of the played songs has a mood.
    pub fn synchronize(&self, user_id: &str, window: Duration) -> Result<Option<MoodSnapshot>> {
        self.synchronize_at(user_id, window, Utc::now())
    }

    /// [`MoodSynchronizer::synchronize`] with an explicit clock.
    pub fn synchronize_at(
        &self,
        user_id: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<MoodSnapshot>> {
        let since = now
            .checked_sub_signed(window)
            .ok_or_else(|| MoodError::InvalidWindow(window.to_string()))?;
        let plays = self.ledger.query_recent(user_id, HistoryQuery::Since(since))?;
        if plays.is_empty() {
            info!("No recent history found for {user_id} in the last {window}");
            return Ok(None);
        }

        let song_ids: Vec<String> = plays.into_iter().map(|play| play.song_id).collect();
        let song_ids = distinct(&song_ids);
        let moods = self.moods.get_or_classify(&song_ids)?;

        let Some((mean, song_count)) = MoodPoint::mean(moods.values().map(|mood| mood.point())) else {
            info!("No moods found for {user_id}");
            return Ok(None);
        };

        let snapshot = MoodSnapshot {
            user_id: user_id.to_string(),
            taken_at: now,
            excitedness: mean.excitedness,
            happiness: mean.happiness,
            song_count,
        };
        self.ledger.write_snapshot(&snapshot)?;

        info!(
            "Updated moods for {user_id}: excitedness {:.3}, happiness {:.3} over {song_count} songs",
            snapshot.excitedness, snapshot.happiness
        );
        Ok(Some(snapshot))
    }
}
