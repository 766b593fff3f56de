//! In-memory replay cache for signed service requests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Process-wide set of recently accepted signature keys.
///
/// Each key maps to the instant it stops being rejected. Expired entries are
/// purged on every [`check_and_store`](ReplayCache::check_and_store) call, so
/// the map only ever holds keys that are still inside their replay window.
#[derive(Default)]
pub struct ReplayCache {
    seen: Mutex<HashMap<String, Instant>>,
}

impl ReplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` for `ttl` if it has not been seen.
    ///
    /// Returns `true` the first time a key is presented and `false` while an
    /// earlier recording of the same key is unexpired. The purge, lookup and
    /// insert happen under one lock acquisition.
    pub fn check_and_store(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut seen = self.lock();

        seen.retain(|_, expiry| *expiry > now);

        if seen.contains_key(key) {
            return false;
        }

        let expiry = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + FAR_FUTURE);
        seen.insert(key.to_string(), expiry);
        true
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut seen = self.lock();
        let before = seen.len();
        seen.retain(|_, expiry| *expiry > now);
        before - seen.len()
    }

    /// Number of keys currently held (expired entries included until the next purge).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ReplayCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn test_first_use_accepted() {
        let cache = ReplayCache::new();
        assert!(cache.check_and_store("svc-a:1700000000:abc", TTL));
        assert!(cache.check_and_store("svc-a:1700000000:def", TTL));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_repeat_rejected_within_window() {
        let cache = ReplayCache::new();
        assert!(cache.check_and_store("key", TTL));
        assert!(!cache.check_and_store("key", TTL));
        assert!(!cache.check_and_store("key", TTL));
    }

    #[test]
    fn test_rejection_does_not_extend_expiry() {
        let cache = ReplayCache::new();
        assert!(cache.check_and_store("key", Duration::from_millis(30)));
        thread::sleep(Duration::from_millis(15));
        // Rejected, and the original expiry stays in place.
        assert!(!cache.check_and_store("key", TTL));
        thread::sleep(Duration::from_millis(25));
        assert!(cache.check_and_store("key", TTL));
    }

    #[test]
    fn test_expired_key_accepted_again() {
        let cache = ReplayCache::new();
        assert!(cache.check_and_store("key", Duration::from_millis(10)));

        thread::sleep(Duration::from_millis(20));

        assert!(cache.check_and_store("key", TTL));
    }

    #[test]
    fn test_zero_ttl_never_blocks() {
        let cache = ReplayCache::new();
        assert!(cache.check_and_store("key", Duration::ZERO));
        assert!(cache.check_and_store("key", Duration::ZERO));
    }

    #[test]
    fn test_expired_entries_purged_on_access() {
        let cache = ReplayCache::new();
        cache.check_and_store("old-1", Duration::from_millis(10));
        cache.check_and_store("old-2", Duration::from_millis(10));
        assert_eq!(cache.len(), 2);

        thread::sleep(Duration::from_millis(20));

        // Any call sweeps every expired key, not only the requested one.
        assert!(cache.check_and_store("fresh", TTL));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired_counts_removed() {
        let cache = ReplayCache::new();
        cache.check_and_store("short", Duration::from_millis(10));
        cache.check_and_store("long", TTL);

        thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_concurrent_same_key_single_winner() {
        let cache = Arc::new(ReplayCache::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.check_and_store("contended", TTL))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|first| *first)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_unbounded_ttl_does_not_overflow() {
        let cache = ReplayCache::new();
        assert!(cache.check_and_store("forever", Duration::MAX));
        assert!(!cache.check_and_store("forever", Duration::MAX));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn test_debug_shows_entry_count() {
        let cache = ReplayCache::new();
        cache.check_and_store("k", TTL);
        assert_eq!(format!("{:?}", cache), "ReplayCache { entries: 1 }");
    }
}
