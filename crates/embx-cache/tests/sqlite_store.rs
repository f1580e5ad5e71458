use std::sync::Arc;
use std::thread;

use embx_cache::{CacheEntry, CacheError, CacheStore, SqliteCacheStore};
use embx_core::{CacheKey, EmbeddingParams};

fn key(text: &str) -> CacheKey {
    CacheKey::derive("dummy", "m", text, EmbeddingParams::default().with_dimensions(2))
}

#[test]
fn roundtrip_and_miss() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteCacheStore::open(dir.path().join("cache.db")).expect("open");

    store
        .put(CacheEntry::new(key("hello"), vec![0.1, 0.2], "dummy", "m"))
        .expect("put");

    let hit = store.get(&key("hello")).expect("get").expect("hit");
    assert_eq!(hit.vector, vec![0.1, 0.2]);
    assert_eq!(hit.dimensions, 2);
    assert_eq!(hit.provider, "dummy");
    assert_eq!(hit.model, "m");
    assert!(store.get(&key("missing")).expect("get").is_none());
}

#[test]
fn upsert_is_idempotent_and_last_write_wins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteCacheStore::open(dir.path().join("cache.db")).expect("open");

    let entry = CacheEntry::new(key("a"), vec![1.0, 2.0], "dummy", "m");
    store.put(entry.clone()).expect("put");
    store.put(entry).expect("put again");
    store
        .put(CacheEntry::new(key("a"), vec![3.0, 4.0], "dummy", "m"))
        .expect("overwrite");

    assert_eq!(store.len().expect("len"), 1);
    let hit = store.get(&key("a")).expect("get").expect("hit");
    assert_eq!(hit.vector, vec![3.0, 4.0]);
}

#[test]
fn entries_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("cache.db");
    {
        let store = SqliteCacheStore::open(&path).expect("open");
        store
            .put(CacheEntry::new(key("persist"), vec![0.5, 0.25], "dummy", "m"))
            .expect("put");
        store.close().expect("close");
    }
    let store = SqliteCacheStore::open(&path).expect("reopen");
    let hit = store.get(&key("persist")).expect("get").expect("hit");
    assert_eq!(hit.vector, vec![0.5, 0.25]);
}

#[test]
fn closed_store_reports_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteCacheStore::open(dir.path().join("cache.db")).expect("open");
    store.close().expect("close");

    assert!(matches!(store.get(&key("a")), Err(CacheError::Closed)));
    assert!(matches!(
        store.put(CacheEntry::new(key("a"), vec![1.0], "dummy", "m")),
        Err(CacheError::Closed)
    ));
}

#[test]
fn unopenable_path_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    // The database path is an existing directory.
    assert!(SqliteCacheStore::open(dir.path()).is_err());
}

#[test]
fn concurrent_readers_and_writers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SqliteCacheStore::open(dir.path().join("cache.db")).expect("open"));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let text = format!("text-{}", i % 4);
                #[allow(clippy::cast_precision_loss)]
                let v = vec![i as f32, 1.0];
                store
                    .put(CacheEntry::new(key(&text), v, "dummy", "m"))
                    .expect("put");
                let hit = store.get(&key(&text)).expect("get").expect("hit");
                assert_eq!(hit.dimensions, 2);
            })
        })
        .collect();
    for h in handles {
        h.join().expect("thread");
    }
    assert_eq!(store.len().expect("len"), 4);
}
