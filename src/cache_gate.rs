//! Lazily constructed, process-wide access to the thumbnail disk cache.
//!
//! The first thumbnail request can race the creation of the cache directory, so
//! every cache operation waits here until construction has finished. A failed
//! construction leaves the cache disabled for the rest of the process; the
//! pipeline keeps generating thumbnails, it just cannot persist them.

use crate::config::CacheSettings;
use crate::content::CacheKey;
use crate::image_cache::DiskImageCache;
use image::DynamicImage;
use log::{debug, error, warn};
use once_cell::sync::Lazy;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

enum GateState {
    NotStarted,
    Initializing,
    /// `None` when the store failed to open.
    Ready(Option<DiskImageCache>),
}

/// One-time initialization gate guarding the disk cache handle.
pub struct ThumbnailCacheGate {
    state: Mutex<GateState>,
    init_done: Condvar,
}

static GLOBAL_GATE: Lazy<Arc<ThumbnailCacheGate>> =
    Lazy::new(|| Arc::new(ThumbnailCacheGate::new()));

impl ThumbnailCacheGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::NotStarted),
            init_done: Condvar::new(),
        }
    }

    /// The gate shared by the whole process.
    pub fn global() -> Arc<ThumbnailCacheGate> {
        Arc::clone(&GLOBAL_GATE)
    }

    /// Opens the disk cache unless another caller already did or is doing so.
    ///
    /// Returns `true` if this call performed the construction.
    pub fn ensure_initialized(&self, settings: &CacheSettings) -> bool {
        {
            let mut state = self.lock();
            if !matches!(*state, GateState::NotStarted) {
                return false;
            }
            *state = GateState::Initializing;
        }

        debug!("Creating thumbnail cache in {}", settings.dir.display());
        let store = match panic::catch_unwind(AssertUnwindSafe(|| DiskImageCache::open(settings)))
        {
            Ok(Ok(store)) => Some(store),
            Ok(Err(e)) => {
                error!("Thumbnail cache could not be opened: {}", e);
                None
            }
            Err(_) => {
                error!("Thumbnail cache construction panicked");
                None
            }
        };

        *self.lock() = GateState::Ready(store);
        self.init_done.notify_all();
        true
    }

    /// Blocks until initialization has completed, successfully or not.
    pub fn await_ready(&self) {
        drop(self.wait_ready());
    }

    /// Whether initialization has completed.
    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), GateState::Ready(_))
    }

    /// Whether the store opened successfully. Blocks until ready.
    pub fn is_available(&self) -> bool {
        matches!(*self.wait_ready(), GateState::Ready(Some(_)))
    }

    /// Looks up a cached thumbnail. Blocks until ready.
    pub fn get(&self, key: &CacheKey) -> Option<DynamicImage> {
        match &mut *self.wait_ready() {
            GateState::Ready(Some(store)) => store.get(key),
            _ => None,
        }
    }

    /// Stores a thumbnail; a no-op when the store is disabled. Blocks until ready.
    pub fn put(&self, key: &CacheKey, image: &DynamicImage) {
        if let GateState::Ready(Some(store)) = &mut *self.wait_ready() {
            if let Err(e) = store.put(key, image) {
                warn!("Failed to cache thumbnail for {}: {}", key, e);
            }
        }
    }

    /// Removes a cached thumbnail; a no-op when the store is disabled. Blocks until ready.
    pub fn remove(&self, key: &CacheKey) {
        if let GateState::Ready(Some(store)) = &mut *self.wait_ready() {
            store.remove(key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_ready(&self) -> MutexGuard<'_, GateState> {
        let guard = self.lock();
        self.init_done
            .wait_while(guard, |state| !matches!(state, GateState::Ready(_)))
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ThumbnailCacheGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::solid_image;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn settings(dir: &std::path::Path) -> CacheSettings {
        CacheSettings {
            dir: dir.to_path_buf(),
            capacity_bytes: 1024 * 1024,
            quality: 70,
        }
    }

    #[test]
    fn concurrent_initializers_construct_once() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(ThumbnailCacheGate::new());
        let constructions = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let gate = Arc::clone(&gate);
                let constructions = Arc::clone(&constructions);
                let settings = settings(dir.path());
                thread::spawn(move || {
                    if gate.ensure_initialized(&settings) {
                        constructions.fetch_add(1, Ordering::SeqCst);
                    }
                    let key = CacheKey::new(format!("k{}", i));
                    gate.put(&key, &solid_image(8, 8, [1, 2, 3, 255]));
                    assert!(gate.get(&key).is_some());
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert!(gate.is_available());
    }

    #[test]
    fn readers_block_until_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(ThumbnailCacheGate::new());

        let reader = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.get(&"early".into()).is_none())
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!gate.is_ready());
        assert!(!reader.is_finished());

        gate.ensure_initialized(&settings(dir.path()));
        assert!(reader.join().unwrap());
        assert!(gate.is_ready());
    }

    #[test]
    fn await_ready_returns_once_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(ThumbnailCacheGate::new());

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.await_ready())
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        gate.ensure_initialized(&settings(dir.path()));
        waiter.join().unwrap();
        assert!(gate.is_ready());
        gate.await_ready();
    }

    #[test]
    fn failed_open_disables_store_permanently() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file in the way").unwrap();
        let gate = ThumbnailCacheGate::new();

        assert!(gate.ensure_initialized(&settings(&blocker)));
        assert!(!gate.ensure_initialized(&settings(dir.path())));

        let key = CacheKey::from("k");
        gate.put(&key, &solid_image(8, 8, [1, 2, 3, 255]));
        assert!(gate.get(&key).is_none());
        gate.remove(&key);
        assert!(!gate.is_available());
    }

    #[test]
    fn remove_invalidates_entry() {
        let dir = tempfile::tempdir().unwrap();
        let gate = ThumbnailCacheGate::new();
        gate.ensure_initialized(&settings(dir.path()));

        let key = CacheKey::from("k");
        gate.put(&key, &solid_image(8, 8, [1, 2, 3, 255]));
        gate.remove(&key);
        assert!(gate.get(&key).is_none());
    }
}
