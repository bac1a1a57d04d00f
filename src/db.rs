//! SQLite persistence: the song/mood/artist caches and the listening-history
//! ledger.
//!
//! Every cache write is `INSERT OR IGNORE`, so concurrent writers for the same
//! key never overwrite each other: whoever lands first wins and the entry is
//! immutable afterwards. Plays are keyed by user and timestamp instead, and
//! the latest write for a timestamp wins.

use crate::error::Result;
use crate::history::{HistoryLedger, HistoryQuery, PlayEvent};
use crate::mood::{Mood, MoodSnapshot};
use crate::song::{Artist, AudioFeatures, Song};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite caps bound parameters per statement; stay well below it.
const MAX_IDS_PER_QUERY: usize = 500;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS songs (
        song_id          TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        duration_ms      REAL,
        key              REAL,
        mode             REAL,
        time_signature   REAL,
        acousticness     REAL,
        danceability     REAL,
        energy           REAL,
        instrumentalness REAL,
        liveness         REAL,
        loudness         REAL,
        speechiness      REAL,
        valence          REAL,
        tempo            REAL
    );

    CREATE TABLE IF NOT EXISTS moods (
        song_id     TEXT PRIMARY KEY REFERENCES songs(song_id),
        excitedness REAL NOT NULL,
        happiness   REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS artists (
        artist_id  TEXT PRIMARY KEY,
        name       TEXT NOT NULL,
        genres     TEXT NOT NULL,
        popularity INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS play_events (
        id        INTEGER PRIMARY KEY,
        user_id   TEXT NOT NULL,
        song_id   TEXT NOT NULL,
        played_at INTEGER NOT NULL,
        UNIQUE(user_id, played_at)
    );

    CREATE INDEX IF NOT EXISTS idx_play_events_user_time
        ON play_events(user_id, played_at DESC);

    CREATE TABLE IF NOT EXISTS mood_snapshots (
        id          INTEGER PRIMARY KEY,
        user_id     TEXT NOT NULL,
        taken_at    INTEGER NOT NULL,
        excitedness REAL NOT NULL,
        happiness   REAL NOT NULL,
        song_count  INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_mood_snapshots_user_time
        ON mood_snapshots(user_id, taken_at DESC);
";

/// Relational store for songs, moods and artists, and the default
/// [`HistoryLedger`].
///
/// The connection lives behind a mutex that is held for one statement (or one
/// short transaction) at a time.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and makes sure the
    /// schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        debug!("Opening mood database at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    /// A throwaway store, handy for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Songs
    // =========================================================================

    /// Songs already stored for the given ids. Unknown ids are simply absent.
    pub fn songs_by_ids(&self, song_ids: &[String]) -> Result<HashMap<String, Song>> {
        let conn = self.conn();
        let mut songs = HashMap::new();

        for chunk in song_ids.chunks(MAX_IDS_PER_QUERY) {
            let sql = format!(
                "SELECT song_id, name, duration_ms, key, mode, time_signature, acousticness,
                        danceability, energy, instrumentalness, liveness, loudness,
                        speechiness, valence, tempo
                 FROM songs WHERE song_id IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk), song_from_row)?;
            for song in rows {
                let song = song?;
                songs.insert(song.id.clone(), song);
            }
        }

        trace!("{} of {} songs found in cache", songs.len(), song_ids.len());
        Ok(songs)
    }

    /// Stores `song` unless a song with the same id exists. Returns whether a
    /// row was written.
    pub fn insert_song_if_absent(&self, song: &Song) -> Result<bool> {
        let f = &song.features;
        let written = self.conn().execute(
            "INSERT OR IGNORE INTO songs (song_id, name, duration_ms, key, mode, time_signature,
                acousticness, danceability, energy, instrumentalness, liveness, loudness,
                speechiness, valence, tempo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                song.id,
                song.name,
                f.duration_ms,
                f.key,
                f.mode,
                f.time_signature,
                f.acousticness,
                f.danceability,
                f.energy,
                f.instrumentalness,
                f.liveness,
                f.loudness,
                f.speechiness,
                f.valence,
                f.tempo,
            ],
        )?;
        Ok(written == 1)
    }

    // =========================================================================
    // Moods
    // =========================================================================

    /// Moods already classified for the given ids.
    pub fn moods_by_ids(&self, song_ids: &[String]) -> Result<HashMap<String, Mood>> {
        let conn = self.conn();
        let mut moods = HashMap::new();

        for chunk in song_ids.chunks(MAX_IDS_PER_QUERY) {
            let sql = format!(
                "SELECT song_id, excitedness, happiness FROM moods WHERE song_id IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    Mood {
                        excitedness: row.get(1)?,
                        happiness: row.get(2)?,
                    },
                ))
            })?;
            for row in rows {
                let (id, mood) = row?;
                moods.insert(id, mood);
            }
        }

        Ok(moods)
    }

    /// Stores the mood for `song_id` unless one exists. Returns whether a row
    /// was written.
    pub fn insert_mood_if_absent(&self, song_id: &str, mood: Mood) -> Result<bool> {
        let written = self.conn().execute(
            "INSERT OR IGNORE INTO moods (song_id, excitedness, happiness) VALUES (?1, ?2, ?3)",
            params![song_id, mood.excitedness, mood.happiness],
        )?;
        Ok(written == 1)
    }

    /// Number of classified songs.
    pub fn mood_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM moods", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    // =========================================================================
    // Artists
    // =========================================================================

    /// The subset of `artist_ids` already stored.
    pub fn known_artist_ids(&self, artist_ids: &[String]) -> Result<HashSet<String>> {
        let conn = self.conn();
        let mut known = HashSet::new();

        for chunk in artist_ids.chunks(MAX_IDS_PER_QUERY) {
            let sql = format!(
                "SELECT artist_id FROM artists WHERE artist_id IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk), |row| row.get::<_, String>(0))?;
            for id in rows {
                known.insert(id?);
            }
        }

        Ok(known)
    }

    pub fn insert_artist_if_absent(&self, artist: &Artist) -> Result<bool> {
        let written = self.conn().execute(
            "INSERT OR IGNORE INTO artists (artist_id, name, genres, popularity) VALUES (?1, ?2, ?3, ?4)",
            params![artist.id, artist.name, artist.genres.join(", "), artist.popularity],
        )?;
        Ok(written == 1)
    }

    pub fn artist_by_id(&self, artist_id: &str) -> Result<Option<Artist>> {
        let artist = self
            .conn()
            .query_row(
                "SELECT artist_id, name, genres, popularity FROM artists WHERE artist_id = ?1",
                [artist_id],
                |row| {
                    let genres: String = row.get(2)?;
                    Ok(Artist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        genres: genres
                            .split(", ")
                            .filter(|genre| !genre.is_empty())
                            .map(str::to_string)
                            .collect(),
                        popularity: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(artist)
    }

    /// Ids of every stored song, sorted. Used for shell completion.
    pub fn all_song_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT song_id FROM songs ORDER BY song_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl HistoryLedger for SqliteStore {
    fn append_plays(&self, plays: &[PlayEvent]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut written = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO play_events (user_id, song_id, played_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, played_at) DO UPDATE SET song_id = excluded.song_id
                 WHERE song_id <> excluded.song_id",
            )?;
            for play in plays {
                written += stmt.execute(params![
                    play.user_id,
                    play.song_id,
                    play.played_at.timestamp_millis()
                ])?;
            }
        }

        tx.commit()?;
        debug!("Recorded {written} new or changed plays ({} submitted)", plays.len());
        Ok(written)
    }

    fn query_recent(&self, user_id: &str, query: HistoryQuery) -> Result<Vec<PlayEvent>> {
        let conn = self.conn();
        let base = "SELECT user_id, song_id, played_at FROM play_events WHERE user_id = ?1";

        let plays = match query {
            HistoryQuery::Since(since) => {
                let mut stmt = conn.prepare(&format!(
                    "{base} AND played_at > ?2 ORDER BY played_at DESC"
                ))?;
                let rows = stmt.query_map(params![user_id, since.timestamp_millis()], play_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            HistoryQuery::Latest(limit) => {
                let mut stmt =
                    conn.prepare(&format!("{base} ORDER BY played_at DESC LIMIT ?2"))?;
                let limit = i64::try_from(limit).unwrap_or(i64::MAX);
                let rows = stmt.query_map(params![user_id, limit], play_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            HistoryQuery::All => {
                let mut stmt = conn.prepare(&format!("{base} ORDER BY played_at DESC"))?;
                let rows = stmt.query_map(params![user_id], play_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        trace!("{} plays read for {user_id} ({query:?})", plays.len());
        Ok(plays)
    }

    fn write_snapshot(&self, snapshot: &MoodSnapshot) -> Result<()> {
        self.conn().execute(
            "INSERT INTO mood_snapshots (user_id, taken_at, excitedness, happiness, song_count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                snapshot.user_id,
                snapshot.taken_at.timestamp_millis(),
                snapshot.excitedness,
                snapshot.happiness,
                i64::try_from(snapshot.song_count).unwrap_or(i64::MAX),
            ],
        )?;
        Ok(())
    }

    fn latest_snapshot(&self, user_id: &str) -> Result<Option<MoodSnapshot>> {
        let snapshot = self
            .conn()
            .query_row(
                "SELECT user_id, taken_at, excitedness, happiness, song_count
                 FROM mood_snapshots WHERE user_id = ?1
                 ORDER BY taken_at DESC, id DESC LIMIT 1",
                [user_id],
                |row| {
                    let song_count: i64 = row.get(4)?;
                    Ok(MoodSnapshot {
                        user_id: row.get(0)?,
                        taken_at: timestamp_from_millis(row.get(1)?),
                        excitedness: row.get(2)?,
                        happiness: row.get(3)?,
                        song_count: usize::try_from(song_count).unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(snapshot)
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        name: row.get(1)?,
        features: AudioFeatures {
            duration_ms: row.get(2)?,
            key: row.get(3)?,
            mode: row.get(4)?,
            time_signature: row.get(5)?,
            acousticness: row.get(6)?,
            danceability: row.get(7)?,
            energy: row.get(8)?,
            instrumentalness: row.get(9)?,
            liveness: row.get(10)?,
            loudness: row.get(11)?,
            speechiness: row.get(12)?,
            valence: row.get(13)?,
            tempo: row.get(14)?,
        },
    })
}

fn play_from_row(row: &Row<'_>) -> rusqlite::Result<PlayEvent> {
    Ok(PlayEvent {
        user_id: row.get(0)?,
        song_id: row.get(1)?,
        played_at: timestamp_from_millis(row.get(2)?),
    })
}

/// Stored timestamps always come from `timestamp_millis`, so they are in range.
fn timestamp_from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
