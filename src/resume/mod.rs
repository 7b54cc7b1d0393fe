//! Resuming an interrupted session
//!
//! Resume runs once, before any page is processed. It loads the saved
//! manifest, refuses sessions that already completed, and rebuilds the
//! in-memory state the crawl depends on:
//! - every completed page's fingerprint is replayed into the fingerprint cache
//! - every recorded URL is marked visited
//! - the crawler settings come back from the session's snapshot unless overridden

use crate::config::{CrawlerConfig, DedupConfig};
use crate::fingerprint::{FingerprintCache, FingerprintError, ProbabilisticFilter};
use crate::manifest::{ConfigSnapshot, ManifestError, ManifestStore};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Errors that end the resume path
///
/// None of these are fatal to the program: the caller may start a fresh
/// session instead.
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("No manifest to resume in {0}")]
    NoManifest(PathBuf),

    #[error("Session {0} already completed, nothing to resume")]
    AlreadyCompleted(String),

    #[error("Manifest is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to read manifest: {0}")]
    Manifest(#[source] ManifestError),

    #[error("Invalid base URL in manifest: {0}")]
    InvalidBaseUrl(String),

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

impl From<ManifestError> for ResumeError {
    fn from(e: ManifestError) -> Self {
        match e {
            ManifestError::NotFound(path) => Self::NoManifest(path),
            ManifestError::Corrupt { path, reason } => {
                Self::Corrupt(format!("{}: {}", path.display(), reason))
            }
            ManifestError::SessionClosed(id) => Self::AlreadyCompleted(id),
            other => Self::Manifest(other),
        }
    }
}

/// Settings given on the command line take precedence over the snapshot
#[derive(Debug, Clone, Default)]
pub struct ResumeOverrides {
    pub max_pages: Option<u32>,
    pub parallelism: Option<u32>,
    pub rate_limit: Option<u32>,
    /// Hash of the configuration file used for this run, if any
    pub config_hash: Option<String>,
}

impl ResumeOverrides {
    fn apply(&self, mut config: CrawlerConfig) -> CrawlerConfig {
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(parallelism) = self.parallelism {
            config.parallelism = parallelism;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit = rate_limit;
        }
        config
    }
}

/// In-memory state rebuilt from a saved session
pub struct ResumedSession {
    pub store: ManifestStore,
    pub fingerprints: FingerprintCache,
    /// Every URL that already has an outcome
    pub visited: ProbabilisticFilter,
    /// Effective crawler settings for the resumed run
    pub crawler: CrawlerConfig,
    pub base_url: Url,
}

/// Rebuilds a session from the manifest in `output_dir`
///
/// # Arguments
///
/// * `output_dir` - Directory holding `crawl-manifest.json`
/// * `dedup` - Sizing for the rebuilt fingerprint cache and visited filter
/// * `overrides` - Settings that replace the saved snapshot
///
/// # Returns
///
/// * `Ok(ResumedSession)` - The session, reopened as `running`
/// * `Err(ResumeError::NoManifest)` - Nothing to resume
/// * `Err(ResumeError::AlreadyCompleted)` - The session finished normally
/// * `Err(ResumeError::Corrupt)` - The manifest could not be parsed or validated
pub fn resume(
    output_dir: &Path,
    dedup: &DedupConfig,
    overrides: &ResumeOverrides,
) -> Result<ResumedSession, ResumeError> {
    let store = ManifestStore::load(output_dir)?;
    let metadata = store.metadata();

    if metadata.status.is_terminal() {
        return Err(ResumeError::AlreadyCompleted(metadata.session_id));
    }

    let base_url = Url::parse(&metadata.base_url)
        .map_err(|e| ResumeError::InvalidBaseUrl(format!("{}: {}", metadata.base_url, e)))?;

    if let (Some(saved), Some(current)) = (&metadata.config_hash, &overrides.config_hash) {
        if saved != current {
            tracing::warn!(
                "Configuration changed since session {} started (hash {} -> {})",
                metadata.session_id,
                saved,
                current
            );
        }
    }

    let fingerprints = FingerprintCache::new(dedup)?;
    let completed = store.completed_fingerprints();
    for (hash, url) in &completed {
        fingerprints.record(hash, url);
    }

    let visited = ProbabilisticFilter::new(dedup.expected_items, dedup.false_positive_rate)?;
    let visited_urls = store.visited_urls();
    for url in &visited_urls {
        visited.insert(url);
    }

    let crawler = overrides.apply(store.config().to_crawler_config());
    store.update_config(ConfigSnapshot::from(&crawler));
    store.mark_running()?;

    tracing::info!(
        "Resuming session {}: {} pages recorded, {} fingerprints restored, {} URLs pending",
        metadata.session_id,
        visited_urls.len(),
        completed.len(),
        store.pending_queue().len()
    );

    Ok(ResumedSession {
        store,
        fingerprints,
        visited,
        crawler,
        base_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Manifest, PageRecord, QueueRecord};
    use crate::state::SessionStatus;
    use tempfile::TempDir;

    fn dedup_config() -> DedupConfig {
        DedupConfig {
            expected_items: 1_000,
            cache_capacity: 100,
            ..DedupConfig::default()
        }
    }

    fn save_session(dir: &Path, status: SessionStatus) -> ManifestStore {
        let crawler = CrawlerConfig {
            max_pages: 50,
            parallelism: 4,
            ..CrawlerConfig::default()
        };
        let store = ManifestStore::new(Manifest::new(
            "https://example.com/",
            "example.com",
            dir.display().to_string(),
            ConfigSnapshot::from(&crawler),
        ));
        store
            .add_page(PageRecord::completed("https://example.com/", "Home", "h-home", "index.md", 10))
            .unwrap();
        store
            .add_page(PageRecord::failed("https://example.com/gone", "404 Not Found"))
            .unwrap();
        store.add_to_queue(QueueRecord::new(
            "https://example.com/next",
            Some("https://example.com/".to_string()),
            1,
        ));
        match status {
            SessionStatus::Completed => store.mark_complete(),
            SessionStatus::Interrupted => store.mark_interrupted(),
            SessionStatus::Running => {}
        }
        store.save(dir).unwrap();
        store
    }

    #[test]
    fn test_resume_rebuilds_state() {
        let dir = TempDir::new().unwrap();
        save_session(dir.path(), SessionStatus::Interrupted);

        let resumed = resume(dir.path(), &dedup_config(), &ResumeOverrides::default()).unwrap();

        assert_eq!(resumed.store.status(), SessionStatus::Running);
        assert!(resumed.fingerprints.probably_seen("h-home"));
        assert_eq!(
            resumed.fingerprints.exact_lookup("h-home"),
            Some("https://example.com/".to_string())
        );
        assert_eq!(resumed.visited.contains("https://example.com/gone"), Some(true));
        assert_eq!(resumed.crawler.max_pages, 50);
        assert_eq!(resumed.crawler.parallelism, 4);
        assert_eq!(resumed.base_url.as_str(), "https://example.com/");
        let pending = resumed.store.pending_queue();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].url, "https://example.com/next");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let dir = TempDir::new().unwrap();
        save_session(dir.path(), SessionStatus::Interrupted);

        let overrides = ResumeOverrides {
            max_pages: Some(200),
            rate_limit: Some(2),
            ..ResumeOverrides::default()
        };
        let resumed = resume(dir.path(), &dedup_config(), &overrides).unwrap();

        assert_eq!(resumed.crawler.max_pages, 200);
        assert_eq!(resumed.crawler.rate_limit, 2);
        assert_eq!(resumed.crawler.parallelism, 4);
        assert_eq!(resumed.store.config().max_pages, 200);
    }

    #[test]
    fn test_running_session_can_be_resumed() {
        // A crash leaves the status as running
        let dir = TempDir::new().unwrap();
        save_session(dir.path(), SessionStatus::Running);
        assert!(resume(dir.path(), &dedup_config(), &ResumeOverrides::default()).is_ok());
    }

    #[test]
    fn test_completed_session_is_rejected() {
        let dir = TempDir::new().unwrap();
        save_session(dir.path(), SessionStatus::Completed);

        let result = resume(dir.path(), &dedup_config(), &ResumeOverrides::default());
        assert!(matches!(result, Err(ResumeError::AlreadyCompleted(_))));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let result = resume(dir.path(), &dedup_config(), &ResumeOverrides::default());
        assert!(matches!(result, Err(ResumeError::NoManifest(_))));
    }

    #[test]
    fn test_corrupt_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(crate::manifest::manifest_path(dir.path()), "not json").unwrap();

        let result = resume(dir.path(), &dedup_config(), &ResumeOverrides::default());
        assert!(matches!(result, Err(ResumeError::Corrupt(_))));
    }
}
