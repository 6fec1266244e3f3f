//! Parsed spec cache, keyed by source identity

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use oascheck_core::{ContractError, Document};
use tracing::debug;

/// One key's document; its lock is held while the document loads.
type Slot = Arc<Mutex<Option<Arc<Document>>>>;

/// Shared handle; clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct SpecCache {
    entries: Arc<Mutex<HashMap<String, Slot>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SpecCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached document for `key`, loading it on first use.
    ///
    /// Concurrent callers build a key at most once; loads of different keys
    /// run in parallel. Failed loads are not cached.
    pub fn get_or_load<F>(&self, key: &str, load: F) -> Result<Arc<Document>, ContractError>
    where
        F: FnOnce() -> Result<Document, ContractError>,
    {
        let slot = Arc::clone(lock(&self.entries).entry(key.to_string()).or_default());

        let mut loaded = lock(&slot);
        if let Some(document) = loaded.as_ref() {
            debug!(spec = key, "spec cache hit");
            return Ok(Arc::clone(document));
        }
        debug!(spec = key, "spec cache miss");
        let document = Arc::new(load()?);
        *loaded = Some(Arc::clone(&document));
        Ok(document)
    }

    /// Number of loaded documents. Loads still in flight are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries)
            .values()
            .filter(|slot| matches!(slot.try_lock().as_deref(), Ok(Some(_))))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn empty_doc() -> Result<Document, ContractError> {
        Document::from_value(&serde_json::json!({"openapi": "3.1.0", "paths": {}}))
    }

    #[test]
    fn loads_each_key_once_across_threads() {
        let cache = SpecCache::new();
        let loads = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    cache
                        .get_or_load("users.yaml", || {
                            loads.fetch_add(1, Ordering::SeqCst);
                            empty_doc()
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clones_share_entries_and_failures_are_not_cached() {
        let cache = SpecCache::new();
        let err = cache
            .get_or_load("bad", || Err(ContractError::MalformedSpec("nope".into())))
            .unwrap_err();
        assert_eq!(err, ContractError::MalformedSpec("nope".into()));
        assert!(cache.is_empty());

        let first = cache.clone().get_or_load("good", empty_doc).unwrap();
        let second = cache.get_or_load("good", || unreachable!()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn slow_load_does_not_block_other_keys() {
        let cache = SpecCache::new();
        let shared = &cache;
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        std::thread::scope(|scope| {
            let slow = scope.spawn(move || {
                shared.get_or_load("slow.yaml", || {
                    started_tx.send(()).unwrap();
                    release_rx
                        .recv_timeout(Duration::from_secs(5))
                        .map_err(|_| ContractError::MissingSpec("timed out".into()))?;
                    empty_doc()
                })
            });

            started_rx.recv().unwrap();
            assert_eq!(cache.len(), 0);
            cache.get_or_load("fast.yaml", empty_doc).unwrap();
            release_tx.send(()).unwrap();
            slow.join().unwrap().unwrap();
        });

        assert_eq!(cache.len(), 2);
    }
}
