//! Document file naming
//!
//! Names are allocated under a single lock so concurrent page handlers can
//! never be handed the same file. A name counts as taken when it was handed
//! out earlier in this process, recorded in a resumed manifest, or already
//! exists on disk.

use crate::config::FileNaming;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use url::Url;

/// Longest slug kept, in bytes
const MAX_SLUG_LEN: usize = 200;

/// Converts a URL path into a file-system-safe slug
///
/// `/docs/getting-started/` becomes `docs-getting-started`; the root path
/// becomes `index`.
pub fn slugify(url: &Url) -> String {
    let path = url.path().trim_matches('/');

    let mut slug = String::with_capacity(path.len());
    for c in path.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    let mut slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        return "index".to_string();
    }

    // Slug is pure ASCII at this point
    slug.truncate(MAX_SLUG_LEN);
    slug
}

/// Zero-padded sequential document name, e.g. `0007.md`
pub fn sequential_name(n: u64) -> String {
    format!("{:04}.md", n)
}

fn parse_sequential(name: &str) -> Option<u64> {
    name.strip_suffix(".md")?.parse().ok()
}

pub struct FileNamer {
    output_dir: PathBuf,
    strategy: FileNaming,
    taken: Mutex<HashSet<String>>,
    counter: AtomicU64,
}

impl FileNamer {
    pub fn new(output_dir: impl Into<PathBuf>, strategy: FileNaming) -> Self {
        Self {
            output_dir: output_dir.into(),
            strategy,
            taken: Mutex::new(HashSet::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Marks names from an earlier run as taken
    ///
    /// The sequential counter continues after the highest number seen.
    pub fn seed<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut taken = self.taken.lock().unwrap_or_else(PoisonError::into_inner);
        for name in names {
            let name = name.into();
            if let Some(n) = parse_sequential(&name) {
                self.counter.fetch_max(n, Ordering::Relaxed);
            }
            taken.insert(name);
        }
    }

    /// Allocates a unique file name for a page
    pub fn allocate(&self, url: &Url) -> String {
        let mut taken = self.taken.lock().unwrap_or_else(PoisonError::into_inner);

        let name = match self.strategy {
            FileNaming::Sequential => loop {
                let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
                let candidate = sequential_name(n);
                if !self.is_taken(&taken, &candidate) {
                    break candidate;
                }
            },
            FileNaming::Slug => {
                let slug = slugify(url);
                let mut candidate = format!("{}.md", slug);
                let mut suffix = 1;
                while self.is_taken(&taken, &candidate) {
                    candidate = format!("{}-{}.md", slug, suffix);
                    suffix += 1;
                }
                candidate
            }
        };

        taken.insert(name.clone());
        name
    }

    /// Full path of an allocated name
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn is_taken(&self, taken: &HashSet<String>, name: &str) -> bool {
        taken.contains(name) || self.output_dir.join(name).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify(&url("https://example.com/")), "index");
        assert_eq!(slugify(&url("https://example.com")), "index");
        assert_eq!(
            slugify(&url("https://example.com/docs/getting-started/")),
            "docs-getting-started"
        );
        assert_eq!(
            slugify(&url("https://example.com/api/v1.2/users?id=3")),
            "api-v1-2-users"
        );
        assert_eq!(slugify(&url("https://example.com/a//b__c")), "a-b__c");
        assert_eq!(slugify(&url("https://example.com/~/")), "index");
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "a".repeat(300);
        let slug = slugify(&url(&format!("https://example.com/{}", long)));
        assert_eq!(slug.len(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_sequential_name() {
        assert_eq!(sequential_name(1), "0001.md");
        assert_eq!(sequential_name(12345), "12345.md");
    }

    #[test]
    fn test_slug_collisions_get_suffixes() {
        let dir = TempDir::new().unwrap();
        let namer = FileNamer::new(dir.path(), FileNaming::Slug);

        assert_eq!(namer.allocate(&url("https://example.com/guide")), "guide.md");
        assert_eq!(namer.allocate(&url("https://example.com/guide/")), "guide-1.md");
        assert_eq!(namer.allocate(&url("https://example.com/guide?x=1")), "guide-2.md");
    }

    #[test]
    fn test_existing_file_on_disk_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.md"), "old").unwrap();
        let namer = FileNamer::new(dir.path(), FileNaming::Slug);

        assert_eq!(namer.allocate(&url("https://example.com/")), "index-1.md");
    }

    #[test]
    fn test_seed_continues_sequence() {
        let dir = TempDir::new().unwrap();
        let namer = FileNamer::new(dir.path(), FileNaming::Sequential);
        namer.seed(vec!["0001.md", "0004.md", "notes.md"]);

        assert_eq!(namer.allocate(&url("https://example.com/a")), "0005.md");
        assert_eq!(namer.allocate(&url("https://example.com/b")), "0006.md");
    }

    #[test]
    fn test_seed_reserves_slugs() {
        let dir = TempDir::new().unwrap();
        let namer = FileNamer::new(dir.path(), FileNaming::Slug);
        namer.seed(vec!["guide.md".to_string()]);

        assert_eq!(namer.allocate(&url("https://example.com/guide")), "guide-1.md");
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let dir = TempDir::new().unwrap();
        let namer = Arc::new(FileNamer::new(dir.path(), FileNaming::Slug));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let namer = Arc::clone(&namer);
                std::thread::spawn(move || {
                    (0..10)
                        .map(|_| namer.allocate(&url("https://example.com/same")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut names = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(names.insert(name));
            }
        }
        assert_eq!(names.len(), 80);
    }
}
