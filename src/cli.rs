//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `muse-mood` binary.
//!
//! ## Commands
//!
//! - `init-db`: Create the database schema
//! - `import-plays`: Record recently played tracks from a JSON file
//! - `sync`: Aggregate recent plays into a mood snapshot
//! - `history`, `top`, `metrics`: Inspect a user's listening history
//! - `recommend`: Suggest songs near a target mood
//! - `classify`: Score songs without recording plays
//!
//! ## Examples
//!
//! ```bash
//! muse-mood import-plays alice recent.json
//! muse-mood sync alice --window 2h
//! muse-mood recommend alice --mode study --seed 4uLU6hMCjMI75M1A2tKUQC
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "muse-mood")]
#[command(about = "muse-mood: mood tracking and mood-targeted recommendations from listening history")]
#[command(version)]
pub struct Args {
    /// SQLite database path (defaults to the data directory)
    #[arg(long, global = true, env = "MUSE_MOOD_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Mood model coefficients (JSON)
    #[arg(long, global = true, env = "MUSE_MOOD_MODEL", value_hint = clap::ValueHint::FilePath)]
    pub model: Option<PathBuf>,

    /// Local catalog of tracks and artists (JSON)
    #[arg(long, global = true, env = "MUSE_MOOD_CATALOG", value_hint = clap::ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    ///
    /// Safe to run repeatedly; existing data is kept.
    InitDb,

    /// Record recently played tracks for a user
    ///
    /// Reads a JSON array of `{ song_id, name, artist_id, played_at }`
    /// records. Features, artists and moods for the new songs are fetched
    /// and cached along the way. Plays already recorded are ignored.
    ImportPlays {
        /// User the plays belong to
        user: String,

        /// JSON file with the played tracks
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Aggregate recent plays into a new mood snapshot
    ///
    /// Averages the moods of the distinct songs played within the window.
    Sync {
        /// User to synchronize
        user: String,

        /// History window such as 30m, 1h, 2d or 1w (defaults to the configured window)
        #[arg(short, long)]
        window: Option<String>,
    },

    /// Show recently played songs with their moods
    History {
        user: String,

        /// Number of distinct songs to show; 0 shows the whole history
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,
    },

    /// Show a user's most played songs
    Top {
        user: String,

        /// Number of songs to show; 0 shows every song
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Show audio features of recent plays
    Metrics {
        user: String,

        /// Comma-separated feature names, e.g. "energy,valence,tempo"
        #[arg(short, long, default_value = "energy,valence")]
        metrics: String,

        /// Number of plays to show
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,
    },

    /// Recommend songs near a target mood
    ///
    /// Without `--seed`, the user's five most recent songs seed the catalog.
    Recommend {
        user: String,

        /// Seed song ids (repeatable)
        #[arg(short, long = "seed")]
        seeds: Vec<String>,

        /// Number of songs to return
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Classify songs by id and print their moods
    Classify {
        /// Song ids to classify
        #[arg(required = true)]
        songs: Vec<String>,
    },

    /// Generate shell completions
    ///
    /// Usage: muse-mood completion bash > ~/.local/share/bash-completion/completions/muse-mood
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List cached song ids for completion (hidden command)
    #[command(hide = true)]
    CompleteSongs,
}

/// Where a recommendation should aim.
#[derive(ClapArgs, Debug, Clone, PartialEq)]
pub struct TargetArgs {
    /// Mood mode: sad, mellow, angry, excited, dance, study, karaoke or nogiets
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Target excitedness
    #[arg(long, allow_negative_numbers = true, requires = "happiness")]
    pub excitedness: Option<f64>,

    /// Target happiness
    #[arg(long, allow_negative_numbers = true, requires = "excitedness")]
    pub happiness: Option<f64>,
}
