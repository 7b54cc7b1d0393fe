//! Scheduler for managing the crawl frontier and rate limiting
//!
//! This module handles:
//! - Depth-ordered priority queue of URLs to crawl
//! - At-most-once enqueue per URL
//! - Max-depth enforcement
//! - Spacing requests by `1s / rate-limit`

use crate::config::CrawlerConfig;
use crate::crawler::LinkEvent;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::{Duration, Instant};

/// A URL queued for fetching with priority information
#[derive(Debug, Clone)]
struct QueuedUrl {
    link: LinkEvent,
    /// Insertion order, so equal depths are fetched first-in first-out
    sequence: u64,
}

// Lower depth values have higher priority (are popped first from BinaryHeap)
impl Ord for QueuedUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .link
            .depth
            .cmp(&self.link.depth)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for QueuedUrl {}

/// Spaces requests evenly at a fixed rate
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Instant,
}

impl RateLimiter {
    /// `rate` requests per second; 0 disables limiting
    pub fn per_second(rate: u32) -> Self {
        Self {
            interval: (rate > 0).then(|| Duration::from_secs(1) / rate),
            next_slot: Instant::now(),
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Claims the next request slot and returns how long to wait for it
    pub fn reserve(&mut self, now: Instant) -> Duration {
        let Some(interval) = self.interval else {
            return Duration::ZERO;
        };

        let slot = self.next_slot.max(now);
        self.next_slot = slot + interval;
        slot - now
    }

    /// Waits until the next request may be sent
    pub async fn acquire(&mut self) {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Scheduler manages the frontier queue and rate limiting
pub struct Scheduler {
    /// Frontier priority queue (shallower pages first)
    frontier: BinaryHeap<QueuedUrl>,

    /// Every URL ever enqueued
    seen: HashSet<String>,

    max_depth: u32,
    limiter: RateLimiter,
    sequence: u64,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration (max depth and rate limit)
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            frontier: BinaryHeap::new(),
            seen: HashSet::new(),
            max_depth: config.max_depth,
            limiter: RateLimiter::per_second(config.rate_limit),
            sequence: 0,
        }
    }

    /// Adds a URL to the frontier
    ///
    /// # Returns
    ///
    /// `false` if the URL was enqueued before or is deeper than the max depth
    pub fn enqueue(&mut self, link: LinkEvent) -> bool {
        if link.depth > self.max_depth {
            tracing::trace!("Depth {} exceeds max for {}", link.depth, link.url);
            return false;
        }
        if !self.seen.insert(link.url.to_string()) {
            return false;
        }

        self.sequence += 1;
        self.frontier.push(QueuedUrl {
            link,
            sequence: self.sequence,
        });
        true
    }

    /// Takes the next URL to fetch without waiting
    pub fn next(&mut self) -> Option<LinkEvent> {
        self.frontier.pop().map(|queued| queued.link)
    }

    /// Waits for the rate limiter to allow the next request
    pub async fn wait_turn(&mut self) {
        self.limiter.acquire().await;
    }

    /// Returns the number of URLs in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Returns whether the frontier is empty
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn create_test_config() -> CrawlerConfig {
        CrawlerConfig {
            max_depth: 2,
            rate_limit: 0,
            ..CrawlerConfig::default()
        }
    }

    fn link(path: &str, depth: u32) -> LinkEvent {
        let url = Url::parse(&format!("https://example.com{}", path)).unwrap();
        LinkEvent::new(url, None, depth)
    }

    #[test]
    fn test_new_scheduler() {
        let scheduler = Scheduler::new(&create_test_config());
        assert_eq!(scheduler.frontier_size(), 0);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_enqueue_at_most_once() {
        let mut scheduler = Scheduler::new(&create_test_config());

        assert!(scheduler.enqueue(link("/page", 1)));
        assert!(!scheduler.enqueue(link("/page", 1)));
        assert_eq!(scheduler.frontier_size(), 1);

        // Still rejected after it has been taken
        scheduler.next();
        assert!(!scheduler.enqueue(link("/page", 2)));
    }

    #[test]
    fn test_max_depth() {
        let mut scheduler = Scheduler::new(&create_test_config());
        assert!(scheduler.enqueue(link("/deep", 2)));
        assert!(!scheduler.enqueue(link("/deeper", 3)));
    }

    #[test]
    fn test_shallow_pages_first_then_fifo() {
        let mut scheduler = Scheduler::new(&create_test_config());
        scheduler.enqueue(link("/b", 2));
        scheduler.enqueue(link("/a1", 1));
        scheduler.enqueue(link("/a2", 1));
        scheduler.enqueue(link("/", 0));

        let order: Vec<_> = std::iter::from_fn(|| scheduler.next())
            .map(|l| l.url.path().to_string())
            .collect();
        assert_eq!(order, vec!["/", "/a1", "/a2", "/b"]);
    }

    #[test]
    fn test_rate_limiter_spacing() {
        let mut limiter = RateLimiter::per_second(4);
        assert_eq!(limiter.interval(), Some(Duration::from_millis(250)));

        let now = Instant::now();
        limiter.next_slot = now;
        assert_eq!(limiter.reserve(now), Duration::ZERO);
        assert_eq!(limiter.reserve(now), Duration::from_millis(250));
        assert_eq!(limiter.reserve(now), Duration::from_millis(500));
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let mut limiter = RateLimiter::per_second(0);
        assert_eq!(limiter.interval(), None);
        assert_eq!(limiter.reserve(Instant::now()), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_wait_turn_without_limit_is_immediate() {
        let mut scheduler = Scheduler::new(&create_test_config());
        let start = Instant::now();
        scheduler.wait_turn().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
