//! Mood-targeted recommendations.
//!
//! Seeds go to the catalog, the returned pool is backfilled through the mood
//! cache, and the survivors are ranked by distance to the target mood.

use crate::catalog::Catalog;
use crate::error::{MoodError, Result};
use crate::features::{distinct, NameLookup};
use crate::history::HistoryLedger;
use crate::mood::MoodPoint;
use crate::moods::MoodCache;
use crate::ranker::{rank, Recommendation};
use crate::target::{Mode, Target};
use log::{debug, info};
use std::sync::Arc;

/// Candidate pool size requested from the catalog.
pub const DEFAULT_POOL_SIZE: usize = 50;
/// Seeds forwarded to the catalog; extra seeds are ignored.
pub const DEFAULT_MAX_SEEDS: usize = 5;

/// What a recommendation should aim at.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    /// An explicit point in mood space.
    Point(MoodPoint),
    /// A named mode, optionally with the point a preset should aim at.
    Mode {
        name: String,
        requested: Option<MoodPoint>,
    },
}

pub struct RecommendationEngine {
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn HistoryLedger>,
    moods: Arc<MoodCache>,
    pool_size: usize,
    max_seeds: usize,
}

impl RecommendationEngine {
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>, ledger: Arc<dyn HistoryLedger>, moods: Arc<MoodCache>) -> Self {
        Self {
            catalog,
            ledger,
            moods,
            pool_size: DEFAULT_POOL_SIZE,
            max_seeds: DEFAULT_MAX_SEEDS,
        }
    }

    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn with_max_seeds(mut self, max_seeds: usize) -> Self {
        self.max_seeds = max_seeds.max(1);
        self
    }

    /// Up to `n` catalog songs whose moods lie closest to the target.
    ///
    /// Fails with [`MoodError::NoSeedTracks`] before touching any
    /// collaborator when `seed_song_ids` is empty, and with
    /// [`MoodError::UnknownMode`] before any I/O when the mode is not known.
    pub fn recommend(
        &self,
        seed_song_ids: &[String],
        user_id: &str,
        n: usize,
        target_spec: &TargetSpec,
    ) -> Result<Vec<Recommendation>> {
        if seed_song_ids.is_empty() {
            return Err(MoodError::NoSeedTracks);
        }

        let target = self.resolve_target(user_id, target_spec)?;
        debug!(
            "Recommending for {user_id} towards ({:.3}, {:.3})",
            target.point.excitedness, target.point.happiness
        );

        let seeds: Vec<String> = distinct(seed_song_ids).into_iter().take(self.max_seeds).collect();
        let pool = self
            .catalog
            .fetch_recommendations(&seeds, self.pool_size, &target.bounds)
            .map_err(MoodError::Catalog)?;

        let mut names = NameLookup::new();
        let mut pool_ids = Vec::with_capacity(pool.len());
        for track in pool {
            if !names.contains_key(&track.song_id) {
                pool_ids.push(track.song_id.clone());
                names.insert(track.song_id, track.name);
            }
        }

        let moods = self.moods.get_or_classify_named(&pool_ids, &names)?;
        let candidates: Vec<Recommendation> = pool_ids
            .into_iter()
            .filter_map(|song_id| {
                let mood = moods.get(&song_id)?;
                Some(Recommendation {
                    name: names.remove(&song_id).unwrap_or_else(|| song_id.clone()),
                    song_id,
                    excitedness: mood.excitedness,
                    happiness: mood.happiness,
                })
            })
            .collect();

        if candidates.is_empty() {
            info!("No recommendations found for {user_id}");
            return Ok(Vec::new());
        }

        Ok(rank(candidates, target.point, n))
    }

    fn resolve_target(&self, user_id: &str, target_spec: &TargetSpec) -> Result<Target> {
        match target_spec {
            TargetSpec::Point(point) => Ok(Target::at(*point)),
            TargetSpec::Mode { name, requested } => {
                let mode: Mode = name.parse()?;
                let current = self
                    .ledger
                    .latest_snapshot(user_id)?
                    .map_or(MoodPoint::ORIGIN, |snapshot| snapshot.point());
                Ok(mode.resolve(current, *requested))
            }
        }
    }
}
