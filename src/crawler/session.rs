//! Per-session page handling
//!
//! [`CrawlSession`] is the boundary between the crawl engine and the
//! duplicate-detection and persistence core. The engine reports each fetched
//! page through [`CrawlSession::on_page`] and each discovered link through
//! [`CrawlSession::on_link_discovered`]; the session classifies the page,
//! rejects duplicates and hands novel documents to the persistence pipeline.
//!
//! Handlers take `&self` and may be called concurrently from many fetch tasks.

use crate::clean::validate_content;
use crate::config::{Config, CrawlerConfig, DedupConfig};
use crate::crawler::{is_html_content_type, CrawlOutcome, LinkEvent, PageEvent};
use crate::fingerprint::{compute_fingerprint, DuplicateCheck, FingerprintCache, ProbabilisticFilter};
use crate::manifest::{ConfigSnapshot, Manifest, ManifestStore, PageRecord, Progress, QueueRecord};
use crate::output::{format_page_document, FileNamer, SessionReport};
use crate::pipeline::{flush_manifest, PersistencePipeline, PipelineConfig, WriteTask};
use crate::resume::{self, ResumeOverrides};
use crate::url::{extract_domain, is_in_scope, normalize_url};
use crate::{CrawlDocsError, UrlError};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Log a progress line every this many recorded pages
const PROGRESS_LOG_INTERVAL: u64 = 10;

/// What the session did with a page event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Novel content, handed to the pipeline under `file_name`
    Saved { file_name: String },
    /// Rejected as a copy of an earlier page
    Duplicate { original: Option<String> },
    /// Recorded as skipped (redirect status, non-HTML, minimal content)
    Skipped { reason: String },
    /// Recorded as failed (error status)
    Failed { reason: String },
    /// The URL already has an outcome in this session
    AlreadyVisited,
    /// The page limit is exhausted; nothing was recorded
    LimitReached,
    /// The pipeline no longer accepts work; nothing was recorded
    Stopped,
}

impl PageOutcome {
    /// Returns true if the page got (or will get) a record in the manifest
    pub fn is_recorded(&self) -> bool {
        matches!(
            self,
            Self::Saved { .. } | Self::Duplicate { .. } | Self::Skipped { .. } | Self::Failed { .. }
        )
    }
}

fn status_reason(status_code: u16) -> String {
    let text = StatusCode::from_u16(status_code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status");
    format!("{} {}", status_code, text)
}

pub struct CrawlSession {
    store: Arc<ManifestStore>,
    fingerprints: FingerprintCache,
    /// URLs with an outcome, checked before the authoritative manifest lookup
    visited: ProbabilisticFilter,
    pipeline: PersistencePipeline,
    namer: FileNamer,
    output_dir: PathBuf,
    base_url: Url,
    domain: String,
    crawler: CrawlerConfig,
    dedup: DedupConfig,
    flush_interval: u64,
    /// Pages accepted for writing, including earlier runs of the session
    accepted_pages: AtomicU64,
    recorded_pages: AtomicU64,
    stop_requested: AtomicBool,
    limit_reached: AtomicBool,
}

impl CrawlSession {
    /// Starts a new session rooted at `base_url`
    ///
    /// Creates the output directory and writes an initial manifest. Must be
    /// called from within a tokio runtime (the pipeline workers are spawned).
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSession)` - A running session
    /// * `Err(CrawlDocsError)` - The URL, output directory or fingerprint cache is unusable
    pub fn start(
        base_url: &Url,
        output_dir: &Path,
        config: &Config,
        config_hash: Option<String>,
    ) -> crate::Result<Self> {
        let base_url = normalize_url(base_url.as_str())?;
        let domain = extract_domain(&base_url).ok_or(UrlError::MissingDomain)?;

        std::fs::create_dir_all(output_dir).map_err(|source| CrawlDocsError::OutputDir {
            path: output_dir.display().to_string(),
            source,
        })?;

        let manifest = Manifest::new(
            base_url.as_str(),
            domain.as_str(),
            output_dir.display().to_string(),
            ConfigSnapshot::from(&config.crawler),
        )
        .with_config_hash(config_hash);
        let session_id = manifest.metadata.session_id.clone();

        let store = ManifestStore::new(manifest);
        store.save(output_dir)?;

        let fingerprints = FingerprintCache::new(&config.dedup)?;
        let visited = ProbabilisticFilter::new(
            config.dedup.expected_items,
            config.dedup.false_positive_rate,
        )?;

        tracing::info!("Started session {} for {}", session_id, base_url);

        Ok(Self::assemble(
            store,
            fingerprints,
            visited,
            base_url,
            domain,
            config.crawler.clone(),
            config,
            output_dir,
        ))
    }

    /// Reopens the interrupted session saved in `output_dir`
    ///
    /// Settings come from the saved snapshot unless overridden. Must be
    /// called from within a tokio runtime.
    pub fn resume(output_dir: &Path, config: &Config, overrides: &ResumeOverrides) -> crate::Result<Self> {
        let resumed = resume::resume(output_dir, &config.dedup, overrides)?;
        let domain = resumed.store.metadata().domain;

        Ok(Self::assemble(
            resumed.store,
            resumed.fingerprints,
            resumed.visited,
            resumed.base_url,
            domain,
            resumed.crawler,
            config,
            output_dir,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        store: ManifestStore,
        fingerprints: FingerprintCache,
        visited: ProbabilisticFilter,
        base_url: Url,
        domain: String,
        crawler: CrawlerConfig,
        config: &Config,
        output_dir: &Path,
    ) -> Self {
        let store = Arc::new(store);

        let namer = FileNamer::new(output_dir, config.output.file_naming);
        namer.seed(store.file_names());

        let pipeline = PersistencePipeline::start(
            PipelineConfig::for_parallelism(crawler.parallelism, config.output.flush_interval),
            Arc::clone(&store),
            output_dir.to_path_buf(),
        );

        Self {
            accepted_pages: AtomicU64::new(store.completed_count()),
            store,
            fingerprints,
            visited,
            pipeline,
            namer,
            output_dir: output_dir.to_path_buf(),
            base_url,
            domain,
            crawler,
            dedup: config.dedup.clone(),
            flush_interval: config.output.flush_interval,
            recorded_pages: AtomicU64::new(0),
            stop_requested: AtomicBool::new(false),
            limit_reached: AtomicBool::new(false),
        }
    }

    /// Initial frontier: the pending queue, plus the base URL if it has no outcome yet
    pub fn seeds(&self) -> Vec<LinkEvent> {
        if !self.store.is_visited(self.base_url.as_str()) {
            self.store
                .add_to_queue(QueueRecord::new(self.base_url.as_str(), None, 0));
        }

        self.store
            .pending_queue()
            .into_iter()
            .filter_map(|item| match Url::parse(&item.url) {
                Ok(url) => Some(LinkEvent::new(url, item.parent_url, item.depth)),
                Err(e) => {
                    tracing::warn!("Dropping unparsable queued URL {}: {}", item.url, e);
                    None
                }
            })
            .collect()
    }

    /// Handles a discovered link
    ///
    /// # Returns
    ///
    /// `true` if the link is in scope, new to the session, and was added to
    /// the pending queue; the engine should then schedule it.
    pub fn on_link_discovered(&self, link: &LinkEvent) -> bool {
        if !is_in_scope(&link.url, &self.domain) || link.depth > self.crawler.max_depth {
            return false;
        }

        let url = match normalize_url(link.url.as_str()) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("Ignoring link {}: {}", link.url, e);
                return false;
            }
        };

        if self.is_visited(url.as_str()) {
            return false;
        }

        self.store
            .add_to_queue(QueueRecord::new(url.as_str(), link.parent_url.clone(), link.depth))
    }

    /// Classifies a fetched page and records or persists it
    pub async fn on_page(&self, event: PageEvent) -> PageOutcome {
        let url = event.url.clone();
        let outcome = self.handle_page(event).await;

        tracing::debug!("{} -> {:?}", url, outcome);
        if outcome.is_recorded() {
            self.note_recorded();
        }
        outcome
    }

    async fn handle_page(&self, event: PageEvent) -> PageOutcome {
        let started = Instant::now();

        let url = match normalize_url(event.url.as_str()) {
            Ok(url) => url,
            Err(e) => {
                let reason = format!("invalid URL: {}", e);
                self.record(PageRecord::skipped(event.url.as_str(), reason.clone()));
                return PageOutcome::Skipped { reason };
            }
        };
        let key = url.as_str();

        if self.is_visited(key) {
            return PageOutcome::AlreadyVisited;
        }
        if self.page_limit_hit() {
            self.stop_for_limit();
            return PageOutcome::LimitReached;
        }
        self.visited.insert(key);

        let elapsed_ms = || (event.elapsed + started.elapsed()).as_millis() as u64;
        let annotate = |record: PageRecord| {
            record
                .with_response(event.status_code, event.content_type.clone())
                .with_lineage(event.parent_url.clone(), event.depth)
                .with_processing_time(elapsed_ms())
        };

        if event.status_code != StatusCode::OK.as_u16() {
            let reason = status_reason(event.status_code);
            return if event.status_code >= 400 {
                self.record(annotate(PageRecord::failed(key, reason.clone())));
                PageOutcome::Failed { reason }
            } else {
                self.record(annotate(PageRecord::skipped(key, reason.clone())));
                PageOutcome::Skipped { reason }
            };
        }

        if let Some(content_type) = event.content_type.as_deref() {
            if !is_html_content_type(content_type) {
                let reason = format!("non-HTML content type: {}", content_type);
                self.record(annotate(PageRecord::skipped(key, reason.clone())));
                return PageOutcome::Skipped { reason };
            }
        }

        let raw = match event.description.as_deref() {
            Some(description) if !description.is_empty() => format!("{}\n\n{}", description, event.text),
            _ => event.text.clone(),
        };
        let validation = validate_content(&raw, self.dedup.min_content_length);
        if !validation.is_valid {
            let reason = "minimal content".to_string();
            self.record(annotate(PageRecord::skipped(key, reason.clone())));
            return PageOutcome::Skipped { reason };
        }

        let title = event
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled");

        let hash = compute_fingerprint(
            &validation.cleaned,
            url.path(),
            title,
            self.dedup.short_content_threshold,
        );

        if !self.reserve_page_slot() {
            self.stop_for_limit();
            return PageOutcome::LimitReached;
        }

        // Short pages are exempt: shared boilerplate is not duplication
        if validation.content_length >= self.dedup.short_content_threshold {
            if let DuplicateCheck::LikelyDuplicate { original } =
                self.fingerprints.check_and_record(&hash, key)
            {
                self.release_page_slot();
                let original = self
                    .store
                    .get_duplicate_original(&hash)
                    .map(|page| page.url)
                    .or(original);
                self.record(annotate(PageRecord::duplicate(key, hash, original.clone())));
                return PageOutcome::Duplicate { original };
            }
        } else {
            self.fingerprints.record(&hash, key);
        }

        let file_name = self.namer.allocate(&url);
        let document = format_page_document(title, key, &validation.cleaned);
        let mut record = annotate(PageRecord::completed(
            key,
            title,
            hash,
            file_name.as_str(),
            document.len() as u64,
        ))
        .with_links(event.links.iter().map(Url::to_string).collect());
        record.crawled_at = event.fetched_at;

        let task = WriteTask::new(self.namer.path_for(&file_name), document, Some(record));
        match self.pipeline.submit(task).await {
            Ok(()) => PageOutcome::Saved { file_name },
            Err(e) => {
                tracing::warn!("Dropping {}: {}", key, e);
                PageOutcome::Stopped
            }
        }
    }

    /// Records a page that could not be fetched at all
    pub fn record_failure(&self, link: &LinkEvent, reason: impl Into<String>) {
        let key = link.url.as_str();
        if self.is_visited(key) {
            return;
        }
        self.visited.insert(key);

        let record = PageRecord::failed(key, reason).with_lineage(link.parent_url.clone(), link.depth);
        tracing::debug!(
            "{} -> failed: {}",
            key,
            record.error_message.as_deref().unwrap_or_default()
        );
        self.record(record);
        self.note_recorded();
    }

    /// Asks the engine to stop scheduling new work
    pub fn request_stop(&self) {
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Stop requested, finishing in-flight pages");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Returns true if the session stopped because the page limit was reached
    pub fn limit_reached(&self) -> bool {
        self.limit_reached.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> Progress {
        self.store.progress()
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    pub fn crawler_config(&self) -> &CrawlerConfig {
        &self.crawler
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Drains the pipeline, closes the session and performs the final save
    ///
    /// `Interrupted` leaves the session resumable; the other outcomes mark it
    /// completed.
    ///
    /// # Returns
    ///
    /// * `Ok(SessionReport)` - Report over the final state
    /// * `Err(CrawlDocsError::Manifest)` - The final save failed
    /// * `Err(CrawlDocsError::Task)` - The save task was cancelled or panicked
    pub async fn finish(&self, outcome: CrawlOutcome) -> crate::Result<SessionReport> {
        let stats = self.pipeline.shutdown().await;
        tracing::info!(
            "Persistence pipeline drained: {} files, {} bytes, {} write failures",
            stats.files_written,
            stats.bytes_written,
            stats.write_failures
        );

        if self.fingerprints.is_degraded() {
            tracing::warn!("Duplicate detection ran degraded; some duplicates may have been saved");
        }

        match outcome {
            CrawlOutcome::Interrupted => self.store.mark_interrupted(),
            CrawlOutcome::Exhausted | CrawlOutcome::LimitReached => self.store.mark_complete(),
        }

        let store = Arc::clone(&self.store);
        let output_dir = self.output_dir.clone();
        let path = tokio::task::spawn_blocking(move || store.save(&output_dir)).await??;
        tracing::info!(
            "Session {} {}; manifest saved to {}",
            self.store.metadata().session_id,
            self.store.status(),
            path.display()
        );

        Ok(SessionReport::from_manifest(&self.store.snapshot()))
    }

    fn is_visited(&self, url: &str) -> bool {
        // A filter miss is authoritative; a hit is confirmed against the manifest
        self.visited.contains(url) == Some(true) && self.store.is_visited(url)
    }

    fn page_limit_hit(&self) -> bool {
        let max = u64::from(self.crawler.max_pages);
        max > 0 && self.accepted_pages.load(Ordering::SeqCst) >= max
    }

    fn reserve_page_slot(&self) -> bool {
        let max = u64::from(self.crawler.max_pages);
        if max == 0 {
            self.accepted_pages.fetch_add(1, Ordering::SeqCst);
            return true;
        }
        self.accepted_pages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .is_ok()
    }

    fn release_page_slot(&self) {
        self.accepted_pages.fetch_sub(1, Ordering::SeqCst);
    }

    fn stop_for_limit(&self) {
        if !self.limit_reached.swap(true, Ordering::SeqCst) {
            tracing::info!("Reached page limit of {}", self.crawler.max_pages);
        }
        self.request_stop();
    }

    fn record(&self, record: PageRecord) {
        let url = record.url.clone();
        if let Err(e) = self.store.add_page(record) {
            tracing::warn!("Could not record {}: {}", url, e);
            return;
        }
        if self.store.needs_flush(self.flush_interval) {
            tokio::spawn(flush_manifest(
                Arc::clone(&self.store),
                self.output_dir.clone(),
                self.flush_interval,
            ));
        }
    }

    fn note_recorded(&self) {
        let n = self.recorded_pages.fetch_add(1, Ordering::Relaxed) + 1;
        if n % PROGRESS_LOG_INTERVAL == 0 {
            let progress = self.progress();
            tracing::info!(
                "Progress: {}/{} pages ({:.1}%)",
                progress.completed,
                progress.total,
                progress.percent
            );
        }
    }
}
