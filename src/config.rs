//! # Configuration Module
//!
//! Data directory discovery and runtime settings for muse-mood.
//!
//! ## Data Storage
//!
//! Everything lives in the platform-standard data directory:
//! - Linux: `~/.local/share/muse-mood/`
//! - macOS: `~/Library/Application Support/muse-mood/`
//! - Windows: `%APPDATA%\muse-mood\`
//!
//! The directory holds the SQLite database (`mood.db`), the classifier
//! coefficients (`mood-model.json`), the local catalog (`catalog.json`) and an
//! optional `config.json` with overrides for any [`RuntimeConfig`] field.

use crate::engine::{DEFAULT_MAX_SEEDS, DEFAULT_POOL_SIZE};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "muse-mood";
const DB_FILE: &str = "mood.db";
const MODEL_FILE: &str = "mood-model.json";
const CATALOG_FILE: &str = "catalog.json";
const CONFIG_FILE: &str = "config.json";

/// Window used by `sync` when none is given.
pub const DEFAULT_WINDOW: &str = "1h";

/// Returns the platform-appropriate data directory, creating it if needed.
///
/// # Errors
///
/// Fails when the system data directory cannot be determined or the
/// `muse-mood` subdirectory cannot be created.
///
/// # Examples
///
/// ```no_run
/// use muse_mood::config::get_data_dir;
///
/// let dir = get_data_dir()?;
/// println!("Data directory: {}", dir.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let mood_dir = data_dir.join(DATA_DIR_NAME);
    fs::create_dir_all(&mood_dir).with_context(|| {
        format!(
            "Failed to create muse-mood data directory at {}. Please check file permissions.",
            mood_dir.display()
        )
    })?;

    Ok(mood_dir)
}

/// Returns the default database file path inside [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Runtime settings, resolved from defaults, `config.json` and the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// SQLite database holding caches, plays and snapshots.
    pub db_path: PathBuf,
    /// Linear mood model coefficients.
    pub model_path: PathBuf,
    /// Local catalog of tracks and artists.
    pub catalog_path: PathBuf,
    /// Candidate pool size requested per recommendation.
    pub pool_size: usize,
    /// Seeds forwarded to the catalog per recommendation.
    pub max_seeds: usize,
    /// History window for `sync`, e.g. `1h` or `2d`.
    pub default_window: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::in_dir(&get_data_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

impl RuntimeConfig {
    /// Defaults with every file inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            db_path: dir.join(DB_FILE),
            model_path: dir.join(MODEL_FILE),
            catalog_path: dir.join(CATALOG_FILE),
            pool_size: DEFAULT_POOL_SIZE,
            max_seeds: DEFAULT_MAX_SEEDS,
            default_window: DEFAULT_WINDOW.to_string(),
        }
    }

    /// Loads `config.json` from the data directory, falling back to defaults
    /// when it does not exist.
    pub fn load() -> Result<Self> {
        let dir = get_data_dir()?;
        Self::load_from(&dir.join(CONFIG_FILE), &dir)
    }

    /// Loads overrides from `path`. Fields the file leaves out take their
    /// defaults relative to `dir`.
    pub fn load_from(path: &Path, dir: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::in_dir(dir));
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let overrides: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in config file {}", path.display()))?;

        let mut merged = serde_json::to_value(Self::in_dir(dir))?;
        if let (Some(base), serde_json::Value::Object(fields)) = (merged.as_object_mut(), overrides) {
            base.extend(fields);
        }
        serde_json::from_value(merged)
            .with_context(|| format!("Invalid settings in config file {}", path.display()))
    }

    /// Replaces whichever paths were given explicitly.
    #[must_use]
    pub fn with_overrides(
        mut self,
        db_path: Option<PathBuf>,
        model_path: Option<PathBuf>,
        catalog_path: Option<PathBuf>,
    ) -> Self {
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        if let Some(model_path) = model_path {
            self.model_path = model_path;
        }
        if let Some(catalog_path) = catalog_path {
            self.catalog_path = catalog_path;
        }
        self
    }
}
