//! The listening-history ledger: an append-only, time-ordered log of plays
//! per user, plus the mood snapshots derived from it.

use crate::error::{MoodError, Result};
use crate::mood::MoodSnapshot;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One play of one song by one user.
///
/// Repeated listens are distinct events; they are what "most played" counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub user_id: String,
    pub song_id: String,
    pub played_at: DateTime<Utc>,
}

/// Which slice of a user's history to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryQuery {
    /// Every play strictly after the given instant.
    Since(DateTime<Utc>),
    /// The latest `n` plays.
    Latest(usize),
    /// The whole history.
    All,
}

/// Time-series store of plays and snapshots.
///
/// Implementations return plays in descending time order.
pub trait HistoryLedger: Send + Sync {
    /// Appends plays. A play with the same user and timestamp as an existing
    /// one replaces it. Returns the number of plays that were new or changed
    /// an existing one.
    fn append_plays(&self, plays: &[PlayEvent]) -> Result<usize>;

    /// Reads plays for `user_id`, most recent first.
    fn query_recent(&self, user_id: &str, query: HistoryQuery) -> Result<Vec<PlayEvent>>;

    /// Appends one snapshot.
    fn write_snapshot(&self, snapshot: &MoodSnapshot) -> Result<()>;

    /// The most recent snapshot for `user_id`, if any.
    fn latest_snapshot(&self, user_id: &str) -> Result<Option<MoodSnapshot>>;
}

/// Parses a history window such as `90s`, `30m`, `1h`, `2d` or `1w`.
pub fn parse_window(window: &str) -> Result<Duration> {
    let trimmed = window.trim();
    let invalid = || MoodError::InvalidWindow(window.to_string());

    let unit_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (amount, unit) = trimmed.split_at(unit_at);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        _ => None,
    }
    .ok_or_else(invalid)
}

/// Parses an RFC 3339 play timestamp.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| MoodError::InvalidTimestamp(value.to_string()))
}
