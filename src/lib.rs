//! Mood tracking and mood-targeted recommendations from listening history.
//!
//! Every song gets a point in a two-dimensional mood space (excitedness,
//! happiness), predicted once from its audio features and cached forever.
//! A user's mood is the mean of the songs they played recently; a
//! recommendation is the set of catalog songs closest to a target mood.
//!
//! Core modules:
//! - [`features`] - Audio feature cache in front of the catalog
//! - [`moods`] - Mood cache in front of the classifier
//! - [`sync`] - Periodic mood snapshots from recent plays
//! - [`target`] - Mood archetypes and activity presets
//! - [`ranker`] - Distance-based candidate ranking
//! - [`engine`] - End-to-end recommendations
//!
//! ### Supporting Modules
//!
//! - [`db`] - SQLite caches and listening-history ledger
//! - [`catalog`] / [`classifier`] - Collaborator traits and local adapters
//! - [`ingest`] / [`stats`] - Recording plays and reading them back
//! - [`config`] - Configuration and data directory management
//! - [`cli`] / [`completion`] - Command-line interface
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use muse_mood::catalog::JsonCatalog;
//! use muse_mood::classifier::shared_model;
//! use muse_mood::db::SqliteStore;
//! use muse_mood::engine::{RecommendationEngine, TargetSpec};
//! use muse_mood::features::FeatureCache;
//! use muse_mood::moods::MoodCache;
//! use muse_mood::sync::MoodSynchronizer;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteStore::open(Path::new("mood.db"))?);
//! let catalog = Arc::new(JsonCatalog::load(Path::new("catalog.json"))?);
//! let model = shared_model(Path::new("mood-model.json"))?;
//!
//! let features = FeatureCache::new(store.clone(), catalog.clone());
//! let moods = Arc::new(MoodCache::new(store.clone(), features, model));
//!
//! // Snapshot the last hour of listening
//! let sync = MoodSynchronizer::new(store.clone(), moods.clone());
//! if let Some(snapshot) = sync.synchronize("alice", chrono::Duration::hours(1))? {
//!     println!("alice is at ({:.2}, {:.2})", snapshot.excitedness, snapshot.happiness);
//! }
//!
//! // Pull alice towards "mellow"
//! let engine = RecommendationEngine::new(catalog, store, moods);
//! let target = TargetSpec::Mode { name: "mellow".to_string(), requested: None };
//! for rec in engine.recommend(&["4uLU6hMCjMI75M1A2tKUQC".to_string()], "alice", 10, &target)? {
//!     println!("{} ({:.2}, {:.2})", rec.name, rec.excitedness, rec.happiness);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`error::Result`], whose [`error::MoodError`]
//! separates bad input, collaborator failures and consistency violations.
//! Missing data (no plays, no moods, no candidates) is never an error: it
//! comes back as `None` or an empty list and is logged.

pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod features;
pub mod history;
pub mod ingest;
pub mod mood;
pub mod moods;
pub mod ranker;
pub mod song;
pub mod stats;
pub mod sync;
pub mod target;

#[cfg(test)]
pub(crate) mod test_support;
