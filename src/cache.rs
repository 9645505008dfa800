//! Episode cache storage module
//!
//! This module persists fetched episode lists in a SQLite database, by
//! default located in the system's standard cache directory. A series' rows
//! are always replaced as a whole and expire together after [`CACHE_TTL`].

use crate::tvdb::Episode;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

/// How long a cached episode list is trusted
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// File name of the default cache database
const DATABASE_FILE: &str = "episodes.sqlite";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS thetvdb_episodes (
        thetvdb_id TEXT NOT NULL,
        season_number INTEGER NOT NULL,
        episode_number INTEGER NOT NULL,
        episode_name TEXT NOT NULL DEFAULT '',
        air_date TEXT NOT NULL DEFAULT '',
        last_updated INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_thetvdb_episodes_thetvdb_id
        ON thetvdb_episodes (thetvdb_id);
";

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to determine cache directory location
    #[error("Failed to determine cache directory location")]
    CacheDirectoryNotFound,

    /// Failed to create or access cache directory
    #[error("Failed to create cache directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open or initialize the database
    #[error("Failed to open episode cache at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// A query against the cache table failed
    #[error("Episode cache query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),
}

/// Outcome of looking a series up in the cache
#[derive(Debug)]
pub enum CacheLookup {
    /// Fresh rows exist, ordered by season and episode number
    Hit(Vec<Episode>),
    /// No rows exist, or the stored rows are older than the TTL
    Miss,
    /// The storage layer failed; callers should treat this as a miss
    StorageError(CacheError),
}

/// SQLite-backed cache of episode lists keyed by series
pub struct EpisodeCache {
    conn: Connection,
    ttl: Duration,
}

impl EpisodeCache {
    /// Opens or creates the cache in the system's standard cache directory
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let cache = EpisodeCache::open_default()?;
    /// ```
    pub fn open_default() -> Result<Self, CacheError> {
        Self::open(&Self::default_path()?)
    }

    /// Location of the default cache database
    pub fn default_path() -> Result<PathBuf, CacheError> {
        let proj_dirs = directories::ProjectDirs::from("org", "tvdb-episodes", "tvdb-episodes")
            .ok_or(CacheError::CacheDirectoryNotFound)?;

        Ok(proj_dirs.cache_dir().join(DATABASE_FILE))
    }

    /// Opens or creates the cache database at `path`
    ///
    /// Missing parent directories are created and the episode table is
    /// set up if it does not exist yet.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CacheError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path).map_err(|e| CacheError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::initialize(conn).map_err(|e| CacheError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Opens a cache that lives only as long as the returned value
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::initialize(conn)?)
    }

    fn initialize(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            ttl: CACHE_TTL,
        })
    }

    /// Looks up the cached episodes of a series
    ///
    /// The first row's `last_updated` stands for the whole set, since all
    /// rows of a series are written in one batch.
    pub fn read(&self, series_id: &str) -> CacheLookup {
        match self.load(series_id, unix_now()) {
            Ok(Some(episodes)) => CacheLookup::Hit(episodes),
            Ok(None) => CacheLookup::Miss,
            Err(e) => CacheLookup::StorageError(e),
        }
    }

    fn load(&self, series_id: &str, now: i64) -> Result<Option<Vec<Episode>>, CacheError> {
        let mut stmt = self.conn.prepare(
            "SELECT season_number, episode_number, episode_name, air_date, last_updated
             FROM thetvdb_episodes
             WHERE thetvdb_id = ?1
             ORDER BY season_number, episode_number",
        )?;

        let rows = stmt
            .query_map([series_id], |row| {
                let episode = Episode {
                    series_id: series_id.to_string(),
                    season_number: row.get(0)?,
                    episode_number: row.get(1)?,
                    episode_name: row.get(2)?,
                    air_date: row.get(3)?,
                };
                Ok((episode, row.get::<_, i64>(4)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let Some((_, last_updated)) = rows.first() else {
            return Ok(None);
        };

        if now.saturating_sub(*last_updated) > self.ttl.as_secs() as i64 {
            debug!(series_id, "Cached episodes expired");
            return Ok(None);
        }

        debug!(series_id, count = rows.len(), "Using cached episodes");
        Ok(Some(rows.into_iter().map(|(episode, _)| episode).collect()))
    }

    /// Replaces every cached row of a series with `episodes`
    ///
    /// The delete and the inserts run in one transaction, so readers see
    /// either the old set or the new one.
    pub fn write(&self, series_id: &str, episodes: &[Episode]) -> Result<(), CacheError> {
        self.write_at(series_id, episodes, unix_now())
    }

    pub(crate) fn write_at(
        &self,
        series_id: &str,
        episodes: &[Episode],
        timestamp: i64,
    ) -> Result<(), CacheError> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM thetvdb_episodes WHERE thetvdb_id = ?1",
            [series_id],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO thetvdb_episodes
                 (thetvdb_id, season_number, episode_number, episode_name, air_date, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for episode in episodes {
                insert.execute(params![
                    series_id,
                    episode.season_number,
                    episode.episode_number,
                    episode.episode_name,
                    episode.air_date,
                    timestamp,
                ])?;
            }
        }

        tx.commit()?;
        debug!(series_id, count = episodes.len(), "Cached episodes");
        Ok(())
    }

    /// Deletes the rows of one series, or of every series when `None`
    ///
    /// Returns the number of rows removed.
    pub fn clear(&self, series_id: Option<&str>) -> Result<usize, CacheError> {
        let removed = match series_id {
            Some(series_id) => self.conn.execute(
                "DELETE FROM thetvdb_episodes WHERE thetvdb_id = ?1",
                [series_id],
            )?,
            None => self.conn.execute("DELETE FROM thetvdb_episodes", [])?,
        };
        Ok(removed)
    }

    #[cfg(test)]
    pub(crate) fn row_count(&self, series_id: Option<&str>) -> usize {
        let count: i64 = match series_id {
            Some(series_id) => self.conn.query_row(
                "SELECT COUNT(*) FROM thetvdb_episodes WHERE thetvdb_id = ?1",
                [series_id],
                |row| row.get(0),
            ),
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM thetvdb_episodes", [], |row| row.get(0)),
        }
        .unwrap();
        count as usize
    }

    #[cfg(test)]
    pub(crate) fn drop_table(&self) {
        self.conn.execute_batch("DROP TABLE thetvdb_episodes").unwrap();
    }
}

/// Current time as unix seconds
fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
