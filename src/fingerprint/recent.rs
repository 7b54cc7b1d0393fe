//! Short-lived exact-match cache (fingerprint -> representative URL)

use super::FingerprintError;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct RecentEntry {
    url: String,
    recorded_at: Instant,
}

/// Bounded LRU of recent fingerprints whose entries also expire after `ttl`
pub struct RecentCache {
    entries: Mutex<LruCache<String, RecentEntry>>,
    ttl: Duration,
}

impl RecentCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Stores `url` for `hash`; the latest writer wins. Returns false when
    /// the cache is unavailable.
    pub fn put(&self, hash: &str, url: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.put(
                    hash.to_string(),
                    RecentEntry {
                        url: url.to_string(),
                        recorded_at: Instant::now(),
                    },
                );
                true
            }
            Err(_) => false,
        }
    }

    /// Looks up a live entry, evicting it if it has expired
    pub fn get(&self, hash: &str) -> Result<Option<String>, FingerprintError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| FingerprintError::Unavailable("recent cache lock poisoned"))?;

        let expired = match entries.get(hash) {
            Some(entry) if entry.recorded_at.elapsed() < self.ttl => {
                return Ok(Some(entry.url.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(hash);
        }
        Ok(None)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leaves the lock poisoned, as a panicking writer would
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.entries.lock().unwrap();
            panic!("writer panicked while holding the recent cache");
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize, ttl: Duration) -> RecentCache {
        RecentCache::new(NonZeroUsize::new(capacity).unwrap(), ttl)
    }

    #[test]
    fn test_put_then_get() {
        let cache = cache(10, Duration::from_secs(60));
        cache.put("h1", "https://example.com/a");
        assert_eq!(cache.get("h1").unwrap(), Some("https://example.com/a".to_string()));
        assert_eq!(cache.get("h2").unwrap(), None);
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = cache(10, Duration::from_secs(60));
        cache.put("h1", "https://example.com/a");
        cache.put("h1", "https://example.com/b");
        assert_eq!(cache.get("h1").unwrap(), Some("https://example.com/b".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = cache(10, Duration::ZERO);
        cache.put("h1", "https://example.com/a");
        assert_eq!(cache.get("h1").unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bound() {
        let cache = cache(2, Duration::from_secs(60));
        cache.put("h1", "a");
        cache.put("h2", "b");
        cache.put("h3", "c");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("h1").unwrap(), None);
    }
}
