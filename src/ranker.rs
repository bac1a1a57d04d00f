//! Candidate ranking by distance to a target mood.
//!
//! Candidates closer to the target rank higher; ties keep their pool order.

use crate::mood::MoodPoint;
use serde::{Deserialize, Serialize};

/// A scored candidate, ready to hand back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub song_id: String,
    pub name: String,
    pub excitedness: f64,
    pub happiness: f64,
}

impl Recommendation {
    #[must_use]
    pub const fn point(&self) -> MoodPoint {
        MoodPoint::new(self.excitedness, self.happiness)
    }

    /// Euclidean distance from this candidate's mood to `target`.
    #[must_use]
    pub fn distance_to(&self, target: MoodPoint) -> f64 {
        self.point().distance(target)
    }
}

/// Orders `candidates` by ascending distance to `target` and keeps the
/// closest `n`.
///
/// The sort is stable, so equally distant candidates stay in input order.
///
/// # Examples
///
/// ```
/// use muse_mood::mood::MoodPoint;
/// use muse_mood::ranker::{rank, Recommendation};
///
/// let candidate = |id: &str, excitedness, happiness| Recommendation {
///     song_id: id.to_string(),
///     name: id.to_string(),
///     excitedness,
///     happiness,
/// };
///
/// let ranked = rank(
///     vec![candidate("far", 3.0, 4.0), candidate("near", 1.0, 0.0), candidate("here", 0.0, 0.0)],
///     MoodPoint::ORIGIN,
///     10,
/// );
/// let order: Vec<_> = ranked.iter().map(|r| r.song_id.as_str()).collect();
/// assert_eq!(order, ["here", "near", "far"]);
/// ```
#[must_use]
pub fn rank(candidates: Vec<Recommendation>, target: MoodPoint, n: usize) -> Vec<Recommendation> {
    let mut scored: Vec<(f64, Recommendation)> = candidates
        .into_iter()
        .map(|candidate| (candidate.distance_to(target), candidate))
        .collect();

    scored.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    scored
        .into_iter()
        .take(n)
        .map(|(_, candidate)| candidate)
        .collect()
}
