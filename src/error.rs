//! Error taxonomy for the mood pipeline.
//!
//! "Nothing found" outcomes (no history, no moods, no recommendations) are not
//! errors: operations return `None` or an empty `Vec` and log the fact.

use thiserror::Error;

/// Errors surfaced by the library.
#[derive(Debug, Error)]
pub enum MoodError {
    /// The requested mode is neither a mood archetype nor an activity preset.
    #[error("unknown mode `{0}`; expected one of sad, mellow, angry, excited, dance, study, karaoke, nogiets")]
    UnknownMode(String),

    /// A recommendation was requested without any seed tracks.
    #[error("no seed tracks given for recommendations")]
    NoSeedTracks,

    /// A metric name outside the audio-feature schema.
    #[error("invalid metric `{0}`")]
    InvalidMetric(String),

    /// A history window that could not be parsed (expected e.g. `30m`, `1h`, `1d`, `1w`).
    #[error("invalid history window `{0}`")]
    InvalidWindow(String),

    /// A play timestamp that is not RFC 3339.
    #[error("could not parse `{0}` as a timestamp")]
    InvalidTimestamp(String),

    /// The catalog collaborator failed.
    #[error("catalog request failed: {0}")]
    Catalog(#[source] anyhow::Error),

    /// The mood classifier failed.
    #[error("mood classification failed: {0}")]
    Classifier(#[source] anyhow::Error),

    /// The relational store or history ledger failed.
    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Internal bookkeeping went wrong, e.g. the classifier returned a batch of
    /// the wrong length. Never silently recovered.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),
}

pub type Result<T, E = MoodError> = std::result::Result<T, E>;
