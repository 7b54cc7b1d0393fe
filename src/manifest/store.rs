//! Thread-safe manifest store
//!
//! The store is the single arbiter of session truth. Mutations take the
//! exclusive lock, queries take the shared lock, and `save` recomputes the
//! statistics under the exclusive lock right before serializing so every
//! persisted snapshot is internally consistent.

use crate::manifest::{
    Manifest, ManifestError, ManifestResult, PageRecord, QueueRecord, SessionMetadata, Statistics,
};
use crate::state::{PageStatus, SessionStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// File name of the manifest inside the output directory
pub const MANIFEST_FILE: &str = "crawl-manifest.json";

/// Temporary file the manifest is written to before the atomic rename
pub const MANIFEST_TEMP_FILE: &str = "crawl-manifest.json.tmp";

/// Returns the canonical manifest path for an output directory
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILE)
}

/// Crawl progress estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Pages with a recorded outcome
    pub completed: u64,
    /// The larger of the page limit and completed + pending
    pub total: u64,
    pub percent: f64,
}

struct StoreInner {
    manifest: Manifest,
    /// content hash -> URL of the completed page that first produced it
    by_hash: HashMap<String, String>,
}

fn index_into(by_hash: &mut HashMap<String, String>, record: &PageRecord) {
    if record.status == PageStatus::Completed && !record.content_hash.is_empty() {
        by_hash
            .entry(record.content_hash.clone())
            .or_insert_with(|| record.url.clone());
    }
}

impl StoreInner {
    fn index(&mut self, record: &PageRecord) {
        index_into(&mut self.by_hash, record);
    }

    fn unindex(&mut self, record: &PageRecord) {
        if self.by_hash.get(&record.content_hash) == Some(&record.url) {
            self.by_hash.remove(&record.content_hash);
        }
    }
}

pub struct ManifestStore {
    inner: RwLock<StoreInner>,
    save_lock: Mutex<()>,
    unsaved_changes: AtomicU64,
}

impl ManifestStore {
    /// Wraps a manifest, rebuilding its indexes and statistics
    pub fn new(mut manifest: Manifest) -> Self {
        manifest.statistics = Statistics::from_pages(manifest.pages.values());

        let mut inner = StoreInner {
            manifest,
            by_hash: HashMap::new(),
        };
        let StoreInner { manifest, by_hash } = &mut inner;
        for record in manifest.pages.values() {
            index_into(by_hash, record);
        }

        Self {
            inner: RwLock::new(inner),
            save_lock: Mutex::new(()),
            unsaved_changes: AtomicU64::new(0),
        }
    }

    // A poisoned lock is recovered: statistics are recomputed on every save.
    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a page outcome, replacing any earlier record for the same URL
    ///
    /// The URL leaves the pending queue and the statistics are updated in the
    /// same critical section.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The record was stored
    /// * `Err(ManifestError::SessionClosed)` - The session is already completed
    pub fn add_page(&self, record: PageRecord) -> ManifestResult<()> {
        let mut inner = self.write();

        if inner.manifest.metadata.status.is_terminal() {
            return Err(ManifestError::SessionClosed(
                inner.manifest.metadata.session_id.clone(),
            ));
        }

        inner.manifest.queue.retain(|q| q.url != record.url);

        if let Some(previous) = inner.manifest.pages.remove(&record.url) {
            inner.unindex(&previous);
            inner.index(&record);
            inner.manifest.pages.insert(record.url.clone(), record);
            // Overwrites can't be folded in incrementally (min/max), so recompute.
            let manifest = &mut inner.manifest;
            manifest.statistics = Statistics::from_pages(manifest.pages.values());
        } else {
            inner.index(&record);
            inner.manifest.statistics.apply(&record);
            inner.manifest.pages.insert(record.url.clone(), record);
        }

        self.unsaved_changes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Adds a discovered URL to the pending queue
    ///
    /// Returns false if the URL already has an outcome or is already queued.
    pub fn add_to_queue(&self, item: QueueRecord) -> bool {
        let mut inner = self.write();
        if inner.manifest.pages.contains_key(&item.url)
            || inner.manifest.queue.iter().any(|q| q.url == item.url)
        {
            return false;
        }
        inner.manifest.queue.push(item);
        true
    }

    /// Returns true if the URL already has a recorded outcome
    pub fn is_visited(&self, url: &str) -> bool {
        self.read().manifest.pages.contains_key(url)
    }

    /// Finds the completed page that first produced `content_hash`
    pub fn get_duplicate_original(&self, content_hash: &str) -> Option<PageRecord> {
        let inner = self.read();
        inner
            .by_hash
            .get(content_hash)
            .and_then(|url| inner.manifest.pages.get(url))
            .cloned()
    }

    /// Returns the record for a URL, if any
    pub fn page(&self, url: &str) -> Option<PageRecord> {
        self.read().manifest.pages.get(url).cloned()
    }

    pub fn page_count(&self) -> usize {
        self.read().manifest.pages.len()
    }

    /// Number of completed pages
    pub fn completed_count(&self) -> u64 {
        self.read().manifest.statistics.successful_pages
    }

    /// Estimates crawl progress
    pub fn progress(&self) -> Progress {
        let inner = self.read();
        let completed = inner.manifest.pages.len() as u64;
        let pending = inner.manifest.queue.len() as u64;
        let total = u64::from(inner.manifest.config.max_pages).max(completed + pending);
        let percent = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };

        Progress {
            completed,
            total,
            percent,
        }
    }

    /// Transitions the session to `completed` and freezes its end time
    pub fn mark_complete(&self) {
        self.finish_with(SessionStatus::Completed);
    }

    /// Transitions the session to `interrupted` and records its end time
    pub fn mark_interrupted(&self) {
        self.finish_with(SessionStatus::Interrupted);
    }

    fn finish_with(&self, status: SessionStatus) {
        let mut inner = self.write();
        let metadata = &mut inner.manifest.metadata;
        if metadata.status.is_terminal() {
            tracing::debug!("Session {} already completed", metadata.session_id);
            return;
        }
        metadata.status = status;
        metadata.end_time = Some(Utc::now());
        self.unsaved_changes.fetch_add(1, Ordering::Relaxed);
    }

    /// Reopens an interrupted session for a resumed run
    pub fn mark_running(&self) -> ManifestResult<()> {
        let mut inner = self.write();
        let metadata = &mut inner.manifest.metadata;
        if metadata.status.is_terminal() {
            return Err(ManifestError::SessionClosed(metadata.session_id.clone()));
        }
        metadata.status = SessionStatus::Running;
        metadata.end_time = None;
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        self.read().manifest.metadata.status
    }

    pub fn metadata(&self) -> SessionMetadata {
        self.read().manifest.metadata.clone()
    }

    pub fn statistics(&self) -> Statistics {
        self.read().manifest.statistics.clone()
    }

    pub fn config(&self) -> crate::manifest::ConfigSnapshot {
        self.read().manifest.config.clone()
    }

    /// Replaces the configuration snapshot (resumed runs with overrides)
    pub fn update_config(&self, config: crate::manifest::ConfigSnapshot) {
        let mut inner = self.write();
        if inner.manifest.config != config {
            inner.manifest.config = config;
            self.unsaved_changes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Pending queue entries, oldest first
    pub fn pending_queue(&self) -> Vec<QueueRecord> {
        self.read().manifest.queue.clone()
    }

    /// Independent copy of the whole session
    pub fn snapshot(&self) -> Manifest {
        self.read().manifest.clone()
    }

    /// (content hash, URL) of every completed page
    pub fn completed_fingerprints(&self) -> Vec<(String, String)> {
        self.read()
            .manifest
            .pages
            .values()
            .filter(|p| p.status == PageStatus::Completed && !p.content_hash.is_empty())
            .map(|p| (p.content_hash.clone(), p.url.clone()))
            .collect()
    }

    /// Every URL with a recorded outcome
    pub fn visited_urls(&self) -> Vec<String> {
        self.read().manifest.pages.keys().cloned().collect()
    }

    /// Document file names already claimed by completed pages
    pub fn file_names(&self) -> Vec<String> {
        self.read()
            .manifest
            .pages
            .values()
            .filter(|p| !p.file_name.is_empty())
            .map(|p| p.file_name.clone())
            .collect()
    }

    /// Returns true once at least `interval` changes are unsaved
    pub fn needs_flush(&self, interval: u64) -> bool {
        self.unsaved_changes.load(Ordering::Relaxed) >= interval.max(1)
    }

    /// Saves the session into `output_dir` using write-temp-then-rename
    ///
    /// The canonical file is only ever replaced by a fully written and synced
    /// temp file, so a crash mid-save leaves the previous version intact.
    /// On failure the unsaved-change counter is kept, so the next natural
    /// save point retries.
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Path of the canonical manifest file
    /// * `Err(ManifestError)` - Serialization or I/O failed
    pub fn save(&self, output_dir: &Path) -> ManifestResult<PathBuf> {
        let _saving = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (bytes, captured_changes) = {
            let mut inner = self.write();
            let manifest = &mut inner.manifest;
            manifest.statistics = Statistics::from_pages(manifest.pages.values());
            let bytes = serde_json::to_vec_pretty(&*manifest).map_err(ManifestError::Serialize)?;
            (bytes, self.unsaved_changes.load(Ordering::Relaxed))
        };

        let path = manifest_path(output_dir);
        write_atomically(output_dir, &path, &bytes)?;
        self.unsaved_changes
            .fetch_sub(captured_changes, Ordering::Relaxed);

        tracing::debug!("Saved manifest to {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Saves only if at least `interval` changes are pending
    pub fn flush_if_due(&self, output_dir: &Path, interval: u64) -> ManifestResult<bool> {
        if !self.needs_flush(interval) {
            return Ok(false);
        }
        self.save(output_dir)?;
        Ok(true)
    }

    /// Loads a saved session from `output_dir`
    ///
    /// # Returns
    ///
    /// * `Ok(ManifestStore)` - Store holding the saved session
    /// * `Err(ManifestError::NotFound)` - No manifest in that directory
    /// * `Err(ManifestError::Io)` - The file exists but could not be read
    /// * `Err(ManifestError::Corrupt)` - The file is not a valid manifest
    pub fn load(output_dir: &Path) -> ManifestResult<Self> {
        let path = manifest_path(output_dir);

        let bytes = fs::read(&path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ManifestError::NotFound(path.clone())
            } else {
                ManifestError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let manifest: Manifest =
            serde_json::from_slice(&bytes).map_err(|e| ManifestError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        validate(&manifest).map_err(|reason| ManifestError::Corrupt {
            path: path.clone(),
            reason,
        })?;

        tracing::info!(
            "Loaded manifest for session {} ({} pages, {} queued)",
            manifest.metadata.session_id,
            manifest.pages.len(),
            manifest.queue.len()
        );

        Ok(Self::new(manifest))
    }
}

/// Structural checks serde can't express
fn validate(manifest: &Manifest) -> Result<(), String> {
    if manifest.version.is_empty() {
        return Err("missing version".to_string());
    }
    if manifest.metadata.session_id.is_empty() {
        return Err("missing session id".to_string());
    }
    if let Some((key, record)) = manifest.pages.iter().find(|(key, record)| **key != record.url) {
        return Err(format!(
            "page key {} does not match record url {}",
            key, record.url
        ));
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> ManifestResult<()> {
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let temp_path = dir.join(MANIFEST_TEMP_FILE);
    {
        let mut file = File::create(&temp_path).map_err(|e| io_error(&temp_path, e))?;
        file.write_all(bytes).map_err(|e| io_error(&temp_path, e))?;
        file.sync_all().map_err(|e| io_error(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| io_error(path, e))?;
    sync_dir(dir)
}

/// Persists the rename itself; the directory entry lives in the parent
#[cfg(unix)]
fn sync_dir(dir: &Path) -> ManifestResult<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| io_error(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> ManifestResult<()> {
    Ok(())
}
