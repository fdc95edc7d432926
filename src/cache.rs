//! Time-bounded snapshot caching for external listings.
//!
//! Holds a single cached value with a fixed time-to-live, refreshed lazily:
//! a read after expiry sees `None` and the caller fetches and `put`s a new
//! snapshot. Last writer wins; staleness only affects search recency, not
//! correctness, so there is no coordination beyond the lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// A single cached snapshot with a fixed TTL.
#[derive(Debug)]
pub struct SnapshotCache<T> {
    ttl: Duration,
    slot: RwLock<Option<(Instant, Arc<T>)>>,
}

impl<T> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Returns the cached snapshot if one exists and has not expired.
    pub fn get(&self) -> Option<Arc<T>> {
        let slot = self.slot.read();
        match slot.as_ref() {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Stores a fresh snapshot, restarting the TTL, and returns it shared.
    pub fn put(&self, value: T) -> Arc<T> {
        let shared = Arc::new(value);
        *self.slot.write() = Some((Instant::now(), Arc::clone(&shared)));
        shared
    }

    /// Drops any cached snapshot.
    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_misses() {
        let cache: SnapshotCache<Vec<String>> = SnapshotCache::new(Duration::from_secs(60));
        assert!(cache.get().is_none());
    }

    #[test]
    fn put_then_get_returns_the_snapshot() {
        let cache = SnapshotCache::new(Duration::from_secs(60));
        cache.put(vec!["file-a".to_string()]);
        let cached = cache.get().expect("snapshot should be fresh");
        assert_eq!(cached.as_slice(), ["file-a".to_string()]);
    }

    #[test]
    fn snapshots_expire_after_the_ttl() {
        let cache = SnapshotCache::new(Duration::from_millis(10));
        cache.put(vec!["file-a".to_string()]);
        std::thread::sleep(Duration::from_millis(25));
        assert!(cache.get().is_none());
    }

    #[test]
    fn last_writer_wins() {
        let cache = SnapshotCache::new(Duration::from_secs(60));
        cache.put(vec!["old".to_string()]);
        cache.put(vec!["new".to_string()]);
        assert_eq!(cache.get().unwrap().as_slice(), ["new".to_string()]);
    }

    #[test]
    fn invalidate_clears_a_fresh_snapshot() {
        let cache = SnapshotCache::new(Duration::from_secs(60));
        cache.put(vec!["file-a".to_string()]);
        cache.invalidate();
        assert!(cache.get().is_none());
    }
}
