//! Persistent Cache Module
//!
//! Durable key-value storage with per-entry expiry, backed by SQLite.
//! Every storage failure is logged and absorbed: reads become misses and
//! writes become no-ops, since persistence only speeds things up.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, DEFAULT_PERSISTENT_TTL};
use crate::clock::{system_clock, SharedClock};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Schema for the durable cache table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    stored_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_expires_at ON cache_entries(expires_at);
"#;

#[derive(Debug, Clone)]
enum StoreLocation {
    File(PathBuf),
    InMemory,
}

/// Outcome of a single row lookup.
enum Lookup {
    Fresh(String),
    Expired,
    Missing,
}

/// Open connection, emptied on close.
type Handle = Arc<Mutex<Option<Connection>>>;

// == Persistent Cache ==
/// Durable cache shared by every fetcher in the process.
///
/// The database is opened lazily on first use, or eagerly through
/// [`PersistentCache::open`]. Concurrent first callers wait on the same open.
#[derive(Debug)]
pub struct PersistentCache {
    location: StoreLocation,
    default_ttl: Duration,
    clock: SharedClock,
    conn: OnceCell<Handle>,
    open_attempts: AtomicUsize,
    stats: Mutex<CacheStats>,
}

impl PersistentCache {
    // == Constructors ==
    /// Creates a cache stored in the SQLite file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_location(StoreLocation::File(path.into()))
    }

    /// Creates a cache held in a private in-memory database.
    pub fn in_memory() -> Self {
        Self::with_location(StoreLocation::InMemory)
    }

    /// Creates a cache from the configured path and TTL.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_path.clone()).with_default_ttl(config.persistent_ttl())
    }

    fn with_location(location: StoreLocation) -> Self {
        Self {
            location,
            default_ttl: DEFAULT_PERSISTENT_TTL,
            clock: system_clock(),
            conn: OnceCell::new(),
            open_attempts: AtomicUsize::new(0),
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Sets the TTL used when `set` is called without one.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Lifecycle ==
    /// Opens the store now instead of on first use.
    ///
    /// Unlike the data operations this reports the failure, so the process
    /// entry point can log it at startup.
    pub async fn open(&self) -> Result<()> {
        self.handle().await.map(|_| ())
    }

    /// Closes the connection. Later operations behave as cache misses.
    pub async fn close(&self) {
        let Some(handle) = self.conn.get() else {
            return;
        };
        let handle = Arc::clone(handle);
        let closed = tokio::task::spawn_blocking(move || lock(&handle).take().is_some()).await;
        if matches!(closed, Ok(true)) {
            info!("Persistent cache closed");
        }
    }

    /// Whether a connection is currently open.
    pub fn is_open(&self) -> bool {
        self.conn
            .get()
            .map(|handle| lock(handle).is_some())
            .unwrap_or(false)
    }

    /// Number of times opening the database has been attempted.
    pub fn open_attempts(&self) -> usize {
        self.open_attempts.load(Ordering::SeqCst)
    }

    async fn handle(&self) -> Result<&Handle> {
        self.conn
            .get_or_try_init(|| async {
                self.open_attempts.fetch_add(1, Ordering::SeqCst);
                let location = self.location.clone();
                let conn = tokio::task::spawn_blocking(move || open_connection(&location)).await??;
                info!("Persistent cache opened ({})", self.location_label());
                Ok::<_, CacheError>(Arc::new(Mutex::new(Some(conn))))
            })
            .await
    }

    fn location_label(&self) -> String {
        match &self.location {
            StoreLocation::File(path) => path.display().to_string(),
            StoreLocation::InMemory => ":memory:".to_string(),
        }
    }

    /// Runs `f` against the open connection on the blocking pool.
    async fn run<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let handle = Arc::clone(self.handle().await?);
        tokio::task::spawn_blocking(move || {
            let guard = lock(&handle);
            let conn = guard.as_ref().ok_or(CacheError::Closed)?;
            f(conn)
        })
        .await?
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut *stats);
    }

    // == Get ==
    /// Returns the data stored under `key` if present and unexpired.
    ///
    /// Expired entries are deleted on the way out.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read persistent cache [{}]: {}", key, e);
                self.record(|s| {
                    s.record_error();
                    s.record_miss();
                });
                None
            }
        }
    }

    async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let owned = key.to_string();
        let now = self.clock.now_ms() as i64;
        let lookup = self
            .run(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT data, expires_at FROM cache_entries WHERE key = ?1",
                        params![owned],
                        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                    )
                    .optional()?;

                match row {
                    Some((_, expires_at)) if now > expires_at => {
                        // Only the row that was read may go; a newer write keeps its expiry
                        conn.execute(
                            "DELETE FROM cache_entries WHERE key = ?1 AND expires_at < ?2",
                            params![owned, now],
                        )?;
                        Ok(Lookup::Expired)
                    }
                    Some((data, _)) => Ok(Lookup::Fresh(data)),
                    None => Ok(Lookup::Missing),
                }
            })
            .await?;

        match lookup {
            Lookup::Fresh(data) => {
                let value = serde_json::from_str(&data)?;
                self.record(CacheStats::record_hit);
                Ok(Some(value))
            }
            Lookup::Expired => {
                debug!("Persistent cache entry expired [{}]", key);
                self.record(|s| {
                    s.record_expirations(1);
                    s.record_miss();
                });
                Ok(None)
            }
            Lookup::Missing => {
                self.record(CacheStats::record_miss);
                Ok(None)
            }
        }
    }

    /// Whether `key` holds an unexpired entry.
    pub async fn has(&self, key: &str) -> bool {
        self.get::<serde_json::Value>(key).await.is_some()
    }

    // == Set ==
    /// Stores `data` under `key` for `ttl`, or the default TTL when `None`.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        if let Err(e) = self.try_set(key, data, ttl).await {
            warn!("Failed to write persistent cache [{}]: {}", key, e);
            self.record(CacheStats::record_error);
        }
    }

    async fn try_set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        data: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let json = serde_json::to_string(data)?;
        let ttl_ms = (ttl.unwrap_or(self.default_ttl).as_millis() as u64).max(1);
        let stored_at = self.clock.now_ms();
        let expires_at = stored_at.saturating_add(ttl_ms);
        let owned = key.to_string();

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO cache_entries (key, data, stored_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                   data = excluded.data,
                   stored_at = excluded.stored_at,
                   expires_at = excluded.expires_at",
                params![owned, json, stored_at as i64, expires_at as i64],
            )?;
            Ok(())
        })
        .await
    }

    // == Delete ==
    /// Removes the entry for `key`.
    pub async fn delete(&self, key: &str) {
        let owned = key.to_string();
        let result = self
            .run(move |conn| {
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![owned])?;
                Ok(())
            })
            .await;
        if let Err(e) = result {
            warn!("Failed to delete persistent cache [{}]: {}", key, e);
            self.record(CacheStats::record_error);
        }
    }

    // == Clear ==
    /// Removes every entry.
    pub async fn clear(&self) {
        let result = self
            .run(|conn| {
                conn.execute("DELETE FROM cache_entries", [])?;
                Ok(())
            })
            .await;
        match result {
            Ok(()) => info!("Persistent cache cleared"),
            Err(e) => {
                warn!("Failed to clear persistent cache: {}", e);
                self.record(CacheStats::record_error);
            }
        }
    }

    // == Clean Expired ==
    /// Removes every entry whose expiry is at or before now.
    ///
    /// Returns the number of entries removed.
    pub async fn clean_expired(&self) -> usize {
        let now = self.clock.now_ms() as i64;
        let result = self
            .run(move |conn| {
                let removed =
                    conn.execute("DELETE FROM cache_entries WHERE expires_at <= ?1", params![now])?;
                Ok(removed)
            })
            .await;
        match result {
            Ok(removed) => {
                self.record(|s| s.record_expirations(removed as u64));
                removed
            }
            Err(e) => {
                warn!("Failed to clean expired cache entries: {}", e);
                self.record(CacheStats::record_error);
                0
            }
        }
    }

    // == Keys ==
    /// Lists every stored key, expired or not.
    pub async fn keys(&self) -> Vec<String> {
        let result = self
            .run(|conn| {
                let mut stmt = conn.prepare("SELECT key FROM cache_entries ORDER BY key")?;
                let keys = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await;
        result.unwrap_or_else(|e| {
            warn!("Failed to list persistent cache keys: {}", e);
            self.record(CacheStats::record_error);
            Vec::new()
        })
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn lock(handle: &Mutex<Option<Connection>>) -> MutexGuard<'_, Option<Connection>> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

fn open_connection(location: &StoreLocation) -> Result<Connection> {
    let conn = match location {
        StoreLocation::File(path) => open_file(path)?,
        StoreLocation::InMemory => Connection::open_in_memory()?,
    };
    conn.execute_batch(CACHE_SCHEMA)?;
    Ok(conn)
}

fn open_file(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Connection::open(path).map_err(|e| {
        CacheError::Unavailable(format!(
            "Failed to open cache database at {}: {}",
            path.display(),
            e
        ))
    })
}
