//! Probabilistic membership filter
//!
//! Thin thread-safe wrapper over a bloom filter. Lookups take a shared lock,
//! inserts take an exclusive one. A poisoned lock surfaces as `None` so the
//! caller can fall back to "not seen".

use super::FingerprintError;
use bloomfilter::Bloom;
use std::sync::RwLock;

pub struct ProbabilisticFilter {
    bloom: RwLock<Bloom<str>>,
}

impl ProbabilisticFilter {
    /// Creates a filter sized for `expected_items` at the given false-positive rate
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Result<Self, FingerprintError> {
        if expected_items == 0 || !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(FingerprintError::Init(format!(
                "invalid filter parameters: {} items at rate {}",
                expected_items, false_positive_rate
            )));
        }

        let bloom = Bloom::new_for_fp_rate(expected_items, false_positive_rate)
            .map_err(|e| FingerprintError::Init(e.to_string()))?;

        Ok(Self {
            bloom: RwLock::new(bloom),
        })
    }

    /// Membership test; `None` when the filter is unavailable
    pub fn contains(&self, item: &str) -> Option<bool> {
        self.bloom.read().ok().map(|bloom| bloom.check(item))
    }

    /// Adds an item; returns false when the filter is unavailable
    pub fn insert(&self, item: &str) -> bool {
        match self.bloom.write() {
            Ok(mut bloom) => {
                bloom.set(item);
                true
            }
            Err(_) => false,
        }
    }

    /// Adds an item and reports whether it was (probably) present before,
    /// as a single atomic step
    pub fn check_and_insert(&self, item: &str) -> Option<bool> {
        let mut bloom = self.bloom.write().ok()?;
        let present = bloom.check(item);
        if !present {
            bloom.set(item);
        }
        Some(present)
    }

    /// Leaves the lock poisoned, as a panicking writer would
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.bloom.write().unwrap();
            panic!("writer panicked while holding the bloom filter");
        }));
    }
}
