//! Integration tests for the manifest store
//!
//! These tests exercise the on-disk manifest through the public API:
//! statistics invariants, save/load round trips and crash safety.

use crawldocs::config::{CrawlerConfig, DedupConfig};
use crawldocs::fingerprint::FingerprintCache;
use crawldocs::manifest::{
    manifest_path, ConfigSnapshot, Manifest, ManifestStore, PageRecord, Statistics,
    MANIFEST_TEMP_FILE,
};
use crawldocs::state::PageStatus;
use proptest::prelude::*;
use std::collections::HashSet;
use tempfile::TempDir;

fn create_test_store(dir: &std::path::Path) -> ManifestStore {
    ManifestStore::new(Manifest::new(
        "https://example.com/",
        "example.com",
        dir.display().to_string(),
        ConfigSnapshot::from(&CrawlerConfig::default()),
    ))
}

/// Builds a record of the given kind (0 completed, 1 failed, 2 skipped, 3 duplicate)
fn record(kind: u8, path: u8, size: u64) -> PageRecord {
    let url = format!("https://example.com/{}", path);
    match kind % 4 {
        0 => PageRecord::completed(url, "Title", format!("hash-{}", path), format!("{}.md", path), size)
            .with_response(200, Some("text/html".to_string()))
            .with_processing_time(size % 500),
        1 => PageRecord::failed(url, "500 Internal Server Error").with_response(500, None),
        2 => PageRecord::skipped(url, "minimal content").with_response(200, None),
        _ => PageRecord::duplicate(url, "hash-0", Some("https://example.com/0".to_string())),
    }
}

proptest! {
    #[test]
    fn prop_statistics_match_distinct_urls(
        ops in prop::collection::vec((0u8..4, 0u8..20, 1u64..10_000), 0..60)
    ) {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(dir.path());

        let mut urls = HashSet::new();
        for (kind, path, size) in ops {
            let page = record(kind, path, size);
            urls.insert(page.url.clone());
            store.add_page(page).unwrap();
        }

        let stats = store.statistics();
        prop_assert_eq!(stats.total_pages, urls.len() as u64);
        prop_assert!(stats.is_consistent());

        // Incremental statistics agree with a full recomputation
        let snapshot = store.snapshot();
        prop_assert_eq!(stats, Statistics::from_pages(snapshot.pages.values()));
    }

    #[test]
    fn prop_recorded_fingerprints_are_always_seen(
        hashes in prop::collection::hash_set("[0-9a-f]{64}", 1..50)
    ) {
        let cache = FingerprintCache::new(&DedupConfig {
            expected_items: 1_000,
            cache_capacity: 10,
            ..DedupConfig::default()
        })
        .unwrap();

        for hash in &hashes {
            cache.record(hash, "https://example.com/");
        }
        for hash in &hashes {
            prop_assert!(cache.probably_seen(hash));
        }
    }
}

#[test]
fn test_save_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(dir.path());
    store
        .add_page(
            PageRecord::completed("https://example.com/", "Home", "abc", "index.md", 1200)
                .with_response(200, Some("text/html".to_string()))
                .with_links(vec!["https://example.com/guide".to_string()]),
        )
        .unwrap();
    store
        .add_page(PageRecord::failed("https://example.com/gone", "404 Not Found").with_response(404, None))
        .unwrap();
    store
        .add_page(PageRecord::duplicate(
            "https://example.com/copy",
            "abc",
            Some("https://example.com/".to_string()),
        ))
        .unwrap();
    store.save(dir.path()).unwrap();

    let loaded = ManifestStore::load(dir.path()).unwrap();
    let before = store.snapshot();
    let after = loaded.snapshot();

    assert_eq!(after.metadata, before.metadata);
    assert_eq!(after.pages, before.pages);
    assert_eq!(after.statistics, before.statistics);
    assert_eq!(after.queue, before.queue);
}

#[test]
fn test_truncated_temp_file_leaves_manifest_valid() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(dir.path());
    store
        .add_page(PageRecord::completed("https://example.com/", "Home", "abc", "index.md", 100))
        .unwrap();
    store.save(dir.path()).unwrap();

    // A save killed mid-write leaves a partial temp file behind
    let canonical = std::fs::read_to_string(manifest_path(dir.path())).unwrap();
    let partial = &canonical[..canonical.len() / 2];
    std::fs::write(dir.path().join(MANIFEST_TEMP_FILE), partial).unwrap();

    let loaded = ManifestStore::load(dir.path()).unwrap();
    assert_eq!(loaded.page_count(), 1);
    assert_eq!(loaded.statistics().successful_pages, 1);

    // The next save replaces the leftover
    loaded
        .add_page(PageRecord::skipped("https://example.com/empty", "minimal content"))
        .unwrap();
    loaded.save(dir.path()).unwrap();
    assert_eq!(ManifestStore::load(dir.path()).unwrap().page_count(), 2);
}

#[test]
fn test_not_found_page_is_failed() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(dir.path());
    store
        .add_page(
            PageRecord::failed("https://example.com/missing", "404 Not Found")
                .with_response(404, Some("text/html".to_string())),
        )
        .unwrap();

    let page = store.page("https://example.com/missing").unwrap();
    assert_eq!(page.status, PageStatus::Failed);
    assert!(page.error_message.unwrap().contains("404"));

    let stats = store.statistics();
    assert_eq!(stats.successful_pages, 0);
    assert_eq!(stats.failed_pages, 1);
    assert_eq!(stats.status_codes.get(&404), Some(&1));
}

#[test]
fn test_flush_interval() {
    let dir = TempDir::new().unwrap();
    let store = create_test_store(dir.path());

    for i in 0..2 {
        store
            .add_page(PageRecord::skipped(format!("https://example.com/{}", i), "minimal content"))
            .unwrap();
        assert!(!store.flush_if_due(dir.path(), 3).unwrap());
    }
    assert!(!manifest_path(dir.path()).exists());

    store
        .add_page(PageRecord::skipped("https://example.com/2", "minimal content"))
        .unwrap();
    assert!(store.flush_if_due(dir.path(), 3).unwrap());
    assert_eq!(ManifestStore::load(dir.path()).unwrap().page_count(), 3);
}
