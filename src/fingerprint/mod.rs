//! Two-tier content fingerprint cache
//!
//! Answers "have I likely seen this content before?" without touching disk:
//! - a bloom filter holding every fingerprint ever recorded (no false negatives)
//! - a short-lived exact cache mapping recent fingerprints to the URL they came from
//!
//! If either tier becomes unavailable (poisoned lock) the cache fails open:
//! every page is treated as novel and a warning is logged once.

mod filter;
mod hash;
mod recent;

pub use filter::ProbabilisticFilter;
pub use hash::{compute_fingerprint, content_hash};
pub use recent::RecentCache;

use crate::config::DedupConfig;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the fingerprint cache
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Failed to initialize fingerprint filter: {0}")]
    Init(String),

    #[error("Fingerprint cache unavailable: {0}")]
    Unavailable(&'static str),
}

/// Result of checking a fingerprint against the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCheck {
    /// Definitely never recorded before
    Novel,
    /// Probably recorded before; `original` is the cached representative URL
    /// when the exact tier still has it
    LikelyDuplicate { original: Option<String> },
}

impl DuplicateCheck {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::LikelyDuplicate { .. })
    }
}

pub struct FingerprintCache {
    filter: ProbabilisticFilter,
    recent: RecentCache,
    degraded: AtomicBool,
}

impl FingerprintCache {
    /// Creates a cache sized from the dedup configuration
    ///
    /// # Returns
    ///
    /// * `Ok(FingerprintCache)` - Empty cache ready for use
    /// * `Err(FingerprintError)` - The bloom filter could not be sized
    pub fn new(config: &DedupConfig) -> Result<Self, FingerprintError> {
        let capacity = NonZeroUsize::new(config.cache_capacity)
            .ok_or_else(|| FingerprintError::Init("cache capacity must be > 0".to_string()))?;

        Ok(Self {
            filter: ProbabilisticFilter::new(config.expected_items, config.false_positive_rate)?,
            recent: RecentCache::new(capacity, Duration::from_secs(config.cache_ttl_seconds)),
            degraded: AtomicBool::new(false),
        })
    }

    /// Fast membership test against the bloom filter
    ///
    /// May return a false positive; never returns false for a hash passed
    /// to [`record`](Self::record). Returns false when the cache is degraded.
    pub fn probably_seen(&self, hash: &str) -> bool {
        match self.filter.contains(hash) {
            Some(seen) => seen,
            None => {
                self.enter_degraded_mode("bloom filter lock poisoned");
                false
            }
        }
    }

    /// Records a fingerprint with its representative URL
    ///
    /// Idempotent for the filter; the exact tier keeps the latest URL.
    pub fn record(&self, hash: &str, url: &str) {
        if !self.filter.insert(hash) {
            self.enter_degraded_mode("bloom filter lock poisoned");
        }
        if !self.recent.put(hash, url) {
            self.enter_degraded_mode("recent cache lock poisoned");
        }
    }

    /// Best-effort lookup of the URL that first produced `hash`
    ///
    /// `None` does not prove novelty: the entry may have expired or been evicted.
    pub fn exact_lookup(&self, hash: &str) -> Option<String> {
        match self.recent.get(hash) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Exact lookup failed: {}", e);
                self.enter_degraded_mode("recent cache lock poisoned");
                None
            }
        }
    }

    /// Checks and records a fingerprint in one step
    ///
    /// Two producers racing with identical content cannot both see `Novel`:
    /// the filter test-and-set happens under a single exclusive lock. The
    /// exact tier is only written for novel content so it keeps pointing at
    /// the first URL.
    pub fn check_and_record(&self, hash: &str, url: &str) -> DuplicateCheck {
        match self.filter.check_and_insert(hash) {
            Some(false) => {
                if !self.recent.put(hash, url) {
                    self.enter_degraded_mode("recent cache lock poisoned");
                }
                DuplicateCheck::Novel
            }
            Some(true) => DuplicateCheck::LikelyDuplicate {
                original: self.exact_lookup(hash),
            },
            None => {
                self.enter_degraded_mode("bloom filter lock poisoned");
                DuplicateCheck::Novel
            }
        }
    }

    /// Returns true once any tier has failed and the cache is failing open
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn enter_degraded_mode(&self, reason: &str) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "Fingerprint cache degraded ({}), treating all content as novel",
                reason
            );
        }
    }
}
