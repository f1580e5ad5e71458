//! Content-addressed store for previously computed embedding vectors.
//!
//! Entries are keyed by [`CacheKey`] and never mutated in place: a `put` for an
//! existing key replaces the whole entry. There is no eviction.

mod entry;
mod error;
mod memory;
mod sqlite;

use embx_core::CacheKey;

pub use entry::{CacheEntry, now_ms};
pub use error::CacheError;
pub use memory::MemoryCacheStore;
pub use sqlite::{SqliteCacheStore, default_cache_path};

pub trait CacheStore: Send + Sync {
    fn name(&self) -> &'static str;

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Idempotent upsert; last write wins.
    fn put(&self, entry: CacheEntry) -> Result<(), CacheError>;

    fn len(&self) -> Result<usize, CacheError>;

    fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
