//! Points in mood space and the records built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 2-D (excitedness, happiness) coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodPoint {
    pub excitedness: f64,
    pub happiness: f64,
}

impl MoodPoint {
    pub const ORIGIN: MoodPoint = MoodPoint { excitedness: 0.0, happiness: 0.0 };

    #[must_use]
    pub const fn new(excitedness: f64, happiness: f64) -> Self {
        Self { excitedness, happiness }
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: MoodPoint) -> f64 {
        (self.excitedness - other.excitedness).hypot(self.happiness - other.happiness)
    }

    /// Per-axis arithmetic mean of two points.
    #[must_use]
    pub fn midpoint(self, other: MoodPoint) -> MoodPoint {
        MoodPoint {
            excitedness: (self.excitedness + other.excitedness) / 2.0,
            happiness: (self.happiness + other.happiness) / 2.0,
        }
    }

    /// Plain arithmetic mean of a set of points, `None` when empty.
    pub fn mean<I>(points: I) -> Option<(MoodPoint, usize)>
    where
        I: IntoIterator<Item = MoodPoint>,
    {
        let (sum, count) = points.into_iter().fold(
            (MoodPoint::ORIGIN, 0usize),
            |(sum, count), point| {
                (
                    MoodPoint::new(sum.excitedness + point.excitedness, sum.happiness + point.happiness),
                    count + 1,
                )
            },
        );

        if count == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        Some((MoodPoint::new(sum.excitedness / n, sum.happiness / n), count))
    }
}

/// Classified mood of one song. Written once, never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    pub excitedness: f64,
    pub happiness: f64,
}

impl Mood {
    #[must_use]
    pub const fn point(self) -> MoodPoint {
        MoodPoint::new(self.excitedness, self.happiness)
    }
}

impl From<MoodPoint> for Mood {
    fn from(point: MoodPoint) -> Self {
        Self {
            excitedness: point.excitedness,
            happiness: point.happiness,
        }
    }
}

/// Aggregate mood of a user's recent listening, one per synchronization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSnapshot {
    pub user_id: String,
    pub taken_at: DateTime<Utc>,
    pub excitedness: f64,
    pub happiness: f64,
    pub song_count: usize,
}

impl MoodSnapshot {
    #[must_use]
    pub const fn point(&self) -> MoodPoint {
        MoodPoint::new(self.excitedness, self.happiness)
    }
}
