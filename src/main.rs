//! # muse-mood
//!
//! Tracks a listener's mood from what they play and recommends songs that
//! move them towards a target mood.
//!
//! ## Usage
//!
//! ```bash
//! # Create the database
//! muse-mood init-db
//!
//! # Record plays, then aggregate the last two hours into a snapshot
//! muse-mood import-plays alice recent.json
//! muse-mood sync alice --window 2h
//!
//! # Inspect history
//! muse-mood history alice -n 10
//! muse-mood metrics alice --metrics energy,tempo
//!
//! # Recommend
//! muse-mood recommend alice --mode mellow
//! muse-mood recommend alice --excitedness 0.2 --happiness 0.8 --seed 4uLU6hMCjMI75M1A2tKUQC
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use muse_mood::catalog::{Catalog, JsonCatalog};
use muse_mood::classifier::shared_model;
use muse_mood::cli::{self, TargetArgs};
use muse_mood::completion;
use muse_mood::config::RuntimeConfig;
use muse_mood::db::SqliteStore;
use muse_mood::engine::{RecommendationEngine, TargetSpec};
use muse_mood::features::FeatureCache;
use muse_mood::history::{parse_window, HistoryLedger};
use muse_mood::ingest::{PlayIngestor, PlayedTrack};
use muse_mood::mood::MoodPoint;
use muse_mood::moods::MoodCache;
use muse_mood::stats::ListeningStats;
use muse_mood::sync::MoodSynchronizer;
use serde::Serialize;
use std::fs;
use std::sync::Arc;

/// Store, catalog and mood cache wired together for one invocation.
struct Services {
    store: Arc<SqliteStore>,
    catalog: Arc<dyn Catalog>,
    moods: Arc<MoodCache>,
}

impl Services {
    fn open(config: &RuntimeConfig) -> Result<Self> {
        let store = open_store(config)?;
        let catalog: Arc<dyn Catalog> = Arc::new(
            JsonCatalog::load(&config.catalog_path)
                .with_context(|| format!("Failed to load catalog {}", config.catalog_path.display()))?,
        );
        let model = shared_model(&config.model_path)
            .with_context(|| format!("Failed to load mood model {}", config.model_path.display()))?;

        let features = FeatureCache::new(store.clone(), catalog.clone());
        let moods = Arc::new(MoodCache::new(store.clone(), features, model));
        Ok(Self { store, catalog, moods })
    }
}

fn open_store(config: &RuntimeConfig) -> Result<Arc<SqliteStore>> {
    debug!("Opening database {}", config.db_path.display());
    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    Ok(Arc::new(store))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Builds the recommendation target. Without a mode or an explicit point the
/// user's current mood is the target.
fn target_spec(target: TargetArgs, current: impl FnOnce() -> Result<MoodPoint>) -> Result<TargetSpec> {
    let requested = match (target.excitedness, target.happiness) {
        (Some(excitedness), Some(happiness)) => Some(MoodPoint::new(excitedness, happiness)),
        _ => None,
    };

    Ok(match (target.mode, requested) {
        (Some(name), requested) => TargetSpec::Mode { name, requested },
        (None, Some(point)) => TargetSpec::Point(point),
        (None, None) => TargetSpec::Point(current()?),
    })
}

/// Main entry point.
///
/// Logging is controlled through `RUST_LOG`, e.g.
/// `RUST_LOG=muse_mood=debug muse-mood sync alice`.
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let config = RuntimeConfig::load()?.with_overrides(args.db, args.model, args.catalog);
    debug!("Runtime config: {config:?}");

    match args.command {
        cli::Command::InitDb => {
            open_store(&config)?;
            info!("Database ready at {}", config.db_path.display());
        }
        cli::Command::ImportPlays { user, file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read plays from {}", file.display()))?;
            let plays: Vec<PlayedTrack> = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid plays file {}", file.display()))?;

            let services = Services::open(&config)?;
            let ingestor = PlayIngestor::new(services.store, services.catalog, services.moods);
            print_json(&ingestor.ingest_plays(&user, &plays)?)?;
        }
        cli::Command::Sync { user, window } => {
            let window = parse_window(window.as_deref().unwrap_or(&config.default_window))?;
            let services = Services::open(&config)?;
            let synchronizer = MoodSynchronizer::new(services.store, services.moods);
            if let Some(snapshot) = synchronizer.synchronize(&user, window)? {
                print_json(&snapshot)?;
            }
        }
        cli::Command::History { user, count } => {
            let stats = ListeningStats::new(open_store(&config)?);
            if let Some(summary) = stats.recent_history(&user, count)? {
                print_json(&summary)?;
            }
        }
        cli::Command::Top { user, count } => {
            let stats = ListeningStats::new(open_store(&config)?);
            print_json(&stats.top_songs(&user, count)?)?;
        }
        cli::Command::Metrics { user, metrics, count } => {
            let stats = ListeningStats::new(open_store(&config)?);
            print_json(&stats.feature_metrics(&user, &metrics, count)?)?;
        }
        cli::Command::Recommend { user, seeds, count, target } => {
            let services = Services::open(&config)?;
            let ledger = services.store.clone();
            let spec = target_spec(target, || {
                Ok(ledger
                    .latest_snapshot(&user)?
                    .map_or(MoodPoint::ORIGIN, |snapshot| snapshot.point()))
            })?;

            let seeds = if seeds.is_empty() {
                debug!("No seeds given, using the latest songs of {user}");
                ListeningStats::new(services.store.clone())
                    .recent_history(&user, config.max_seeds)?
                    .map(|summary| summary.songs.into_iter().map(|entry| entry.song_id).collect())
                    .unwrap_or_default()
            } else {
                seeds
            };

            let engine = RecommendationEngine::new(services.catalog, services.store, services.moods)
                .with_pool_size(config.pool_size)
                .with_max_seeds(config.max_seeds);
            print_json(&engine.recommend(&seeds, &user, count, &spec)?)?;
        }
        cli::Command::Classify { songs } => {
            let services = Services::open(&config)?;
            let moods = services.moods.get_or_classify(&songs)?;
            let scored: std::collections::BTreeMap<_, _> = moods.into_iter().collect();
            print_json(&scored)?;
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(shell, &mut cmd)?;
        }
        cli::Command::CompleteSongs => {
            completion::print_song_completions(&config.db_path)?;
        }
    }

    Ok(())
}
