//! Aggregate statistics derived from page records
//!
//! Statistics are never a source of truth: [`Statistics::from_pages`] rebuilds
//! them from the page set, and the incremental [`Statistics::apply`] path
//! produces exactly the same result for append-only histories.

use crate::manifest::PageRecord;
use crate::state::PageStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Breakdown key used for duplicate skips, whose messages are per-page
pub const DUPLICATE_REASON: &str = "duplicate content";

/// Latency figures over completed pages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimeStats {
    pub min_ms: u64,
    pub max_ms: u64,
    pub average_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_pages: u64,
    pub successful_pages: u64,
    pub failed_pages: u64,
    pub skipped_pages: u64,
    pub duplicate_pages: u64,
    pub total_bytes: u64,
    pub average_page_size: u64,
    #[serde(default)]
    pub status_codes: BTreeMap<u16, u64>,
    #[serde(default)]
    pub content_types: BTreeMap<String, u64>,
    #[serde(default)]
    pub error_types: BTreeMap<String, u64>,
    #[serde(default)]
    pub skip_reasons: BTreeMap<String, u64>,
    #[serde(default)]
    pub processing_times: ProcessingTimeStats,
}

impl Statistics {
    /// Recomputes statistics from scratch over a page set
    pub fn from_pages<'a>(pages: impl IntoIterator<Item = &'a PageRecord>) -> Self {
        let mut stats = Self::default();
        for page in pages {
            stats.apply(page);
        }
        stats
    }

    /// Folds one newly recorded page into the aggregate
    pub fn apply(&mut self, page: &PageRecord) {
        self.total_pages += 1;

        if let Some(code) = page.response_code {
            *self.status_codes.entry(code).or_insert(0) += 1;
        }

        match page.status {
            PageStatus::Completed => {
                self.successful_pages += 1;
                self.total_bytes += page.file_size;
                self.average_page_size = self.total_bytes / self.successful_pages;

                if let Some(content_type) = &page.content_type {
                    *self.content_types.entry(content_type.clone()).or_insert(0) += 1;
                }

                let t = page.processing_time_ms;
                let times = &mut self.processing_times;
                if self.successful_pages == 1 {
                    times.min_ms = t;
                    times.max_ms = t;
                } else {
                    times.min_ms = times.min_ms.min(t);
                    times.max_ms = times.max_ms.max(t);
                }
                times.total_ms += t;
                times.average_ms = times.total_ms / self.successful_pages;
            }
            PageStatus::Failed => {
                self.failed_pages += 1;
                let reason = page.error_message.as_deref().unwrap_or("unknown error");
                *self.error_types.entry(reason.to_string()).or_insert(0) += 1;
            }
            PageStatus::Skipped => {
                self.skipped_pages += 1;
                let reason = if page.is_duplicate() {
                    self.duplicate_pages += 1;
                    DUPLICATE_REASON
                } else {
                    page.error_message.as_deref().unwrap_or("unspecified")
                };
                *self.skip_reasons.entry(reason.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Returns true if the outcome counts add up to the total
    pub fn is_consistent(&self) -> bool {
        self.successful_pages + self.failed_pages + self.skipped_pages == self.total_pages
    }

    /// Percentage of recorded pages that completed
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            (self.successful_pages as f64 / self.total_pages as f64) * 100.0
        }
    }
}
