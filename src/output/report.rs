//! Session reports over a saved manifest
//!
//! Reports are a pure read path: they work on an independent snapshot and
//! derive every time-based rate from the session timestamps, so the same
//! manifest always yields the same figures for a finished session.

use crate::manifest::{Manifest, ManifestStore, Statistics};
use crate::output::OutputResult;
use crate::state::SessionStatus;
use chrono::{DateTime, Utc};
use std::path::Path;

const BYTES_PER_KB: f64 = 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Figures derived from one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub session_id: String,
    pub base_url: String,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// End time (or the report time for running sessions) minus start time
    pub duration_seconds: f64,
    pub pages_queued: usize,
    pub statistics: Statistics,
    pub pages_per_second: f64,
    pub bytes_per_second: f64,
}

impl SessionReport {
    /// Builds a report, measuring unfinished sessions up to now
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self::from_manifest_at(manifest, Utc::now())
    }

    /// Builds a report, measuring unfinished sessions up to `now`
    pub fn from_manifest_at(manifest: &Manifest, now: DateTime<Utc>) -> Self {
        let metadata = &manifest.metadata;
        let statistics = Statistics::from_pages(manifest.pages.values());

        let end = metadata.end_time.unwrap_or(now);
        let duration_seconds = ((end - metadata.start_time).num_milliseconds().max(0)) as f64 / 1000.0;

        let (pages_per_second, bytes_per_second) = if duration_seconds > 0.0 {
            (
                statistics.total_pages as f64 / duration_seconds,
                statistics.total_bytes as f64 / duration_seconds,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            session_id: metadata.session_id.clone(),
            base_url: metadata.base_url.clone(),
            status: metadata.status,
            start_time: metadata.start_time,
            end_time: metadata.end_time,
            duration_seconds,
            pages_queued: manifest.queue.len(),
            statistics,
            pages_per_second,
            bytes_per_second,
        }
    }

    pub fn total_megabytes(&self) -> f64 {
        self.statistics.total_bytes as f64 / BYTES_PER_MB
    }

    pub fn average_page_kilobytes(&self) -> f64 {
        self.statistics.average_page_size as f64 / BYTES_PER_KB
    }
}

/// Loads the manifest in `output_dir` and builds its report
///
/// # Returns
///
/// * `Ok(SessionReport)` - Report over the saved session
/// * `Err(OutputError::Manifest)` - The manifest is missing or invalid
pub fn generate_report(output_dir: &Path) -> OutputResult<SessionReport> {
    let store = ManifestStore::load(output_dir)?;
    Ok(SessionReport::from_manifest(&store.snapshot()))
}

/// Formats a duration in seconds as `1h 2m 3s`
pub(crate) fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{:.1}s", seconds)
    }
}

/// Renders the report as plain text
pub fn format_text_report(report: &SessionReport) -> String {
    let stats = &report.statistics;
    let mut out = String::new();

    out.push_str("=== Crawl Report ===\n");
    out.push_str(&format!("Session ID: {}\n", report.session_id));
    out.push_str(&format!("Base URL: {}\n", report.base_url));
    out.push_str(&format!("Status: {}\n", report.status));
    out.push_str(&format!("Started: {}\n", report.start_time.to_rfc3339()));
    if let Some(end) = report.end_time {
        out.push_str(&format!("Finished: {}\n", end.to_rfc3339()));
    }
    out.push_str(&format!("Duration: {}\n", format_duration(report.duration_seconds)));

    out.push_str("\n--- Statistics ---\n");
    out.push_str(&format!("Total Pages: {}\n", stats.total_pages));
    out.push_str(&format!(
        "Successful: {} ({:.1}%)\n",
        stats.successful_pages,
        stats.success_rate()
    ));
    out.push_str(&format!("Failed: {}\n", stats.failed_pages));
    out.push_str(&format!("Skipped: {}\n", stats.skipped_pages));
    out.push_str(&format!("Duplicates: {}\n", stats.duplicate_pages));
    out.push_str(&format!("Pending: {}\n", report.pages_queued));
    out.push_str(&format!("Total Size: {:.2} MB\n", report.total_megabytes()));
    out.push_str(&format!("Avg Page Size: {:.2} KB\n", report.average_page_kilobytes()));
    out.push_str(&format!("Pages/Second: {:.2}\n", report.pages_per_second));
    out.push_str(&format!("Bytes/Second: {:.0}\n", report.bytes_per_second));

    if stats.successful_pages > 0 {
        let times = &stats.processing_times;
        out.push_str(&format!(
            "Processing Time: min {}ms / avg {}ms / max {}ms\n",
            times.min_ms, times.average_ms, times.max_ms
        ));
    }

    if !stats.status_codes.is_empty() {
        out.push_str("\n--- Status Codes ---\n");
        for (code, count) in &stats.status_codes {
            out.push_str(&format!("{}: {}\n", code, count));
        }
    }

    if !stats.error_types.is_empty() {
        out.push_str("\n--- Error Summary ---\n");
        for (reason, count) in &stats.error_types {
            out.push_str(&format!("{}: {}\n", reason, count));
        }
    }

    if !stats.skip_reasons.is_empty() {
        out.push_str("\n--- Skip Reasons ---\n");
        for (reason, count) in &stats.skip_reasons {
            out.push_str(&format!("{}: {}\n", reason, count));
        }
    }

    if !stats.content_types.is_empty() {
        out.push_str("\n--- Content Types ---\n");
        for (content_type, count) in &stats.content_types {
            out.push_str(&format!("{}: {}\n", content_type, count));
        }
    }

    out
}

/// Prints the plain text report to stdout
pub fn print_report(report: &SessionReport) {
    println!();
    print!("{}", format_text_report(report));
    println!();
}
