//! Asynchronous persistence pipeline
//!
//! Page processing hands finished documents to a bounded queue; a fixed pool
//! of workers writes them to disk and then records the page outcome in the
//! manifest store. A full queue blocks the submitter, so a slow disk throttles
//! crawling instead of growing memory.
//!
//! `shutdown` is the synchronization point: once it returns, every accepted
//! task has been written (or recorded as failed) and its manifest update is
//! visible.

use crate::manifest::{ManifestStore, PageRecord};
use crate::state::PageStatus;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors returned to pipeline submitters
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Persistence pipeline is shut down")]
    Closed,
}

/// One document to write, optionally carrying the page outcome to record
#[derive(Debug)]
pub struct WriteTask {
    pub path: PathBuf,
    pub contents: Vec<u8>,
    pub page: Option<PageRecord>,
}

impl WriteTask {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>, page: Option<PageRecord>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            page,
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Save the manifest after this many recorded pages
    pub flush_interval: u64,
}

impl PipelineConfig {
    /// Half as many writers as fetchers, with room for two tasks per fetcher
    pub fn for_parallelism(parallelism: u32, flush_interval: u64) -> Self {
        let parallelism = parallelism.max(1) as usize;
        Self {
            workers: (parallelism / 2).max(1),
            queue_capacity: parallelism * 2,
            flush_interval,
        }
    }
}

/// Counters exposed after (or during) a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub files_written: u64,
    pub bytes_written: u64,
    pub write_failures: u64,
}

struct WorkerContext {
    store: Arc<ManifestStore>,
    output_dir: PathBuf,
    flush_interval: u64,
    files_written: AtomicU64,
    bytes_written: AtomicU64,
    write_failures: AtomicU64,
}

impl WorkerContext {
    async fn process(&self, task: WriteTask) {
        let WriteTask {
            path,
            contents,
            page,
        } = task;

        match tokio::fs::write(&path, &contents).await {
            Ok(()) => {
                if let Some(page) = page {
                    self.record(page).await;
                }
                self.files_written.fetch_add(1, Ordering::Relaxed);
                self.bytes_written
                    .fetch_add(contents.len() as u64, Ordering::Relaxed);
                tracing::debug!("Wrote {} ({} bytes)", path.display(), contents.len());
            }
            Err(e) => {
                tracing::error!("Failed to write {}: {}", path.display(), e);
                self.write_failures.fetch_add(1, Ordering::Relaxed);
                if let Some(page) = page {
                    self.record(PageRecord {
                        status: PageStatus::Failed,
                        error_message: Some(format!("write failed: {}", e)),
                        file_name: String::new(),
                        file_size: 0,
                        ..page
                    })
                    .await;
                }
            }
        }
    }

    async fn record(&self, page: PageRecord) {
        let url = page.url.clone();
        if let Err(e) = self.store.add_page(page) {
            tracing::warn!("Could not record {}: {}", url, e);
            return;
        }

        if self.store.needs_flush(self.flush_interval) {
            flush_manifest(
                Arc::clone(&self.store),
                self.output_dir.clone(),
                self.flush_interval,
            )
            .await;
        }
    }
}

/// Saves the manifest on the blocking thread pool if `interval` changes are unsaved
///
/// A failed flush is logged and retried at the next save point.
pub(crate) async fn flush_manifest(store: Arc<ManifestStore>, output_dir: PathBuf, interval: u64) -> bool {
    match tokio::task::spawn_blocking(move || store.flush_if_due(&output_dir, interval)).await {
        Ok(Ok(saved)) => saved,
        Ok(Err(e)) => {
            tracing::error!("Periodic manifest save failed: {}", e);
            false
        }
        Err(e) => {
            tracing::error!("Periodic manifest save task failed: {}", e);
            false
        }
    }
}

pub struct PersistencePipeline {
    sender: Mutex<Option<mpsc::Sender<WriteTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    context: Arc<WorkerContext>,
}

impl PersistencePipeline {
    /// Spawns the worker pool on the current tokio runtime
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count, queue capacity and flush interval
    /// * `store` - Manifest store that receives page outcomes
    /// * `output_dir` - Directory the manifest is flushed into
    pub fn start(config: PipelineConfig, store: Arc<ManifestStore>, output_dir: PathBuf) -> Self {
        let workers = config.workers.max(1);
        Self::with_workers(config, workers, store, output_dir)
    }

    fn with_workers(
        config: PipelineConfig,
        worker_count: usize,
        store: Arc<ManifestStore>,
        output_dir: PathBuf,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let context = Arc::new(WorkerContext {
            store,
            output_dir,
            flush_interval: config.flush_interval,
            files_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
        });

        let workers = (0..worker_count)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&receiver), Arc::clone(&context))))
            .collect();

        tracing::debug!(
            "Started {} persistence workers (queue capacity {})",
            worker_count,
            config.queue_capacity.max(1)
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            context,
        }
    }

    /// Enqueues a write task, waiting while the queue is full
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The task was accepted and will be processed before shutdown completes
    /// * `Err(PipelineError::Closed)` - The pipeline no longer accepts work
    pub async fn submit(&self, task: WriteTask) -> Result<(), PipelineError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(PipelineError::Closed)?;

        sender.send(task).await.map_err(|_| PipelineError::Closed)
    }

    /// Stops accepting work and waits until every accepted task is done
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn shutdown(&self) -> PipelineStats {
        // Dropping the last sender closes the channel once in-flight submits finish
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!("Persistence worker panicked: {}", e);
            }
        }

        self.stats()
    }

    /// Returns true once `shutdown` has been called
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            files_written: self.context.files_written.load(Ordering::Relaxed),
            bytes_written: self.context.bytes_written.load(Ordering::Relaxed),
            write_failures: self.context.write_failures.load(Ordering::Relaxed),
        }
    }
}

async fn run_worker(
    id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<WriteTask>>>,
    context: Arc<WorkerContext>,
) {
    loop {
        let task = receiver.lock().await.recv().await;
        match task {
            Some(task) => context.process(task).await,
            None => break,
        }
    }
    tracing::trace!("Persistence worker {} stopped", id);
}
