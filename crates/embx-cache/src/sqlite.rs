use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use embx_core::CacheKey;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};

use crate::entry::{decode_vector, encode_vector};
use crate::{CacheEntry, CacheError, CacheStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS embeddings (
    cache_key     TEXT PRIMARY KEY,
    vector        BLOB NOT NULL,
    dimension     INTEGER NOT NULL,
    provider      TEXT NOT NULL,
    model         TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL
)";

const UPSERT: &str = "
INSERT INTO embeddings (cache_key, vector, dimension, provider, model, created_at_ms)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(cache_key) DO UPDATE SET
    vector = excluded.vector,
    dimension = excluded.dimension,
    provider = excluded.provider,
    model = excluded.model,
    created_at_ms = excluded.created_at_ms";

const DEFAULT_READERS: usize = 4;

/// On-disk store. One writer connection serializes upserts; a small pool of
/// read-only connections serves lookups concurrently under WAL.
pub struct SqliteCacheStore {
    path: PathBuf,
    writer: Mutex<Option<Connection>>,
    readers: Vec<Mutex<Option<Connection>>>,
    next_reader: AtomicUsize,
}

impl SqliteCacheStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        Self::open_with_readers(path, DEFAULT_READERS)
    }

    pub fn open_with_readers(path: impl AsRef<Path>, readers: usize) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let writer = Connection::open(&path)?;
        let mode: String =
            writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(journal_mode = %mode, "cache journal mode");
        writer.pragma_update(None, "synchronous", "NORMAL")?;
        writer.busy_timeout(std::time::Duration::from_secs(5))?;
        writer.execute_batch(SCHEMA)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let readers = (0..readers.max(1))
            .map(|_| {
                let conn = Connection::open_with_flags(&path, flags)?;
                conn.busy_timeout(std::time::Duration::from_secs(5))?;
                Ok(Mutex::new(Some(conn)))
            })
            .collect::<Result<Vec<_>, CacheError>>()?;

        info!(path = %path.display(), readers = readers.len(), "opened embedding cache");
        Ok(Self {
            path,
            writer: Mutex::new(Some(writer)),
            readers,
            next_reader: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes every connection. Later calls fail with [`CacheError::Closed`].
    pub fn close(&self) -> Result<(), CacheError> {
        if let Some(conn) = self.writer.lock().take() {
            conn.close().map_err(|(_, err)| err)?;
        }
        for reader in &self.readers {
            if let Some(conn) = reader.lock().take() {
                conn.close().map_err(|(_, err)| err)?;
            }
        }
        debug!(path = %self.path.display(), "closed embedding cache");
        Ok(())
    }

    fn with_reader<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, CacheError>,
    ) -> Result<T, CacheError> {
        let start = self.next_reader.fetch_add(1, Ordering::Relaxed);
        let n = self.readers.len();
        let mut slot = None;
        for offset in 0..n {
            if let Some(reader) = self.readers.get((start + offset) % n) {
                if let Some(guard) = reader.try_lock() {
                    slot = Some(guard);
                    break;
                }
            }
        }
        let guard = match slot {
            Some(guard) => guard,
            None => self
                .readers
                .get(start % n)
                .ok_or(CacheError::Closed)?
                .lock(),
        };
        let conn = guard.as_ref().ok_or(CacheError::Closed)?;
        f(conn)
    }
}

impl CacheStore for SqliteCacheStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let hex = key.to_hex();
        let row = self.with_reader(|conn| {
            Ok(conn
                .query_row(
                    "SELECT vector, dimension, provider, model, created_at_ms
                     FROM embeddings WHERE cache_key = ?1",
                    params![hex],
                    |row| {
                        Ok((
                            row.get::<_, Vec<u8>>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                        ))
                    },
                )
                .optional()?)
        })?;

        let Some((blob, dimension, provider, model, created_at_ms)) = row else {
            return Ok(None);
        };
        let corrupt = |reason: &str| CacheError::Corrupt {
            key: hex.clone(),
            reason: reason.to_string(),
        };
        let vector = decode_vector(&blob).ok_or_else(|| corrupt("vector blob length"))?;
        if usize::try_from(dimension).ok() != Some(vector.len()) {
            return Err(corrupt("dimension does not match vector"));
        }

        Ok(Some(CacheEntry {
            key: *key,
            dimensions: vector.len(),
            vector,
            provider,
            model,
            created_at_ms: u64::try_from(created_at_ms).unwrap_or(0),
        }))
    }

    fn put(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let guard = self.writer.lock();
        let conn = guard.as_ref().ok_or(CacheError::Closed)?;
        conn.execute(
            UPSERT,
            params![
                entry.key.to_hex(),
                encode_vector(&entry.vector),
                i64::try_from(entry.vector.len()).unwrap_or(i64::MAX),
                entry.provider,
                entry.model,
                i64::try_from(entry.created_at_ms).unwrap_or(i64::MAX),
            ],
        )?;
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        let count = self.with_reader(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| {
                row.get::<_, i64>(0)
            })?)
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// `$EMBX_CACHE_PATH`, else `$XDG_CACHE_HOME/embx/cache.db`, else
/// `$HOME/.cache/embx/cache.db`, else `./.embx/cache.db`.
pub fn default_cache_path<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
    if let Some(p) = non_empty("EMBX_CACHE_PATH") {
        return PathBuf::from(p);
    }
    if let Some(xdg) = non_empty("XDG_CACHE_HOME") {
        return PathBuf::from(xdg).join("embx").join("cache.db");
    }
    if let Some(home) = non_empty("HOME") {
        return PathBuf::from(home).join(".cache").join("embx").join("cache.db");
    }
    PathBuf::from(".embx").join("cache.db")
}
