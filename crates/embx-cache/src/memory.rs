use dashmap::DashMap;
use embx_core::CacheKey;

use crate::{CacheEntry, CacheError, CacheStore};

/// Process-local store. Reads do not block each other; writes lock only the
/// shard holding the key.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn put(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries.insert(entry.key, entry);
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use embx_core::EmbeddingParams;

    use super::*;

    fn key(text: &str) -> CacheKey {
        CacheKey::derive("dummy", "m", text, EmbeddingParams::default())
    }

    #[test]
    fn get_returns_what_was_put() {
        let store = MemoryCacheStore::new();
        store
            .put(CacheEntry::new(key("hello"), vec![0.1, 0.2], "dummy", "m"))
            .expect("put");
        let hit = store.get(&key("hello")).expect("get").expect("hit");
        assert_eq!(hit.vector, vec![0.1, 0.2]);
        assert_eq!(hit.dimensions, 2);
        assert!(store.get(&key("missing")).expect("get").is_none());
    }

    #[test]
    fn put_overwrites_whole_entry() {
        let store = MemoryCacheStore::new();
        store
            .put(CacheEntry::new(key("a"), vec![1.0], "dummy", "m"))
            .expect("put");
        store
            .put(CacheEntry::new(key("a"), vec![2.0, 3.0], "dummy", "m"))
            .expect("put");
        assert_eq!(store.len().expect("len"), 1);
        let hit = store.get(&key("a")).expect("get").expect("hit");
        assert_eq!(hit.vector, vec![2.0, 3.0]);
        assert_eq!(hit.dimensions, 2);
    }
}
