//! Crawl frontier and traversal bookkeeping
//!
//! This module handles:
//! - The work-list of targets waiting to be dispatched
//! - Depth-first ordering with retries ahead of fresh work
//! - The set of keys that reached a final outcome
//! - Run-scoped budget limits

use crate::config::CrawlerConfig;
use crate::state::TargetState;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;
use url::Url;

/// A URL queued for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// URL as discovered, query and fragment included; this is what gets fetched
    pub url: Url,

    /// Normalized dedup key
    pub key: String,

    /// Link distance from the seed (seed is 0)
    pub depth: u32,

    /// URL of the page this link was found on
    pub parent: Option<String>,

    /// Frontier-level retries spent so far
    pub retry_count: u32,

    pub state: TargetState,
}

impl CrawlTarget {
    pub fn seed(url: Url, key: String) -> Self {
        Self {
            url,
            key,
            depth: 0,
            parent: None,
            retry_count: 0,
            state: TargetState::Pending,
        }
    }

    pub fn child(url: Url, key: String, parent: &CrawlTarget) -> Self {
        Self {
            url,
            key,
            depth: parent.depth + 1,
            parent: Some(parent.url.to_string()),
            retry_count: 0,
            state: TargetState::Pending,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.retry_count > 0
    }
}

/// A target with its position in the work-list
#[derive(Debug, Clone)]
struct QueuedTarget {
    target: CrawlTarget,

    /// Retries are served before any fresh target
    retry: bool,

    /// Insertion order; the most recent is served first
    sequence: u64,
}

// BinaryHeap pops the greatest element: retries first, then newest
impl Ord for QueuedTarget {
    fn cmp(&self, other: &Self) -> Ordering {
        self.retry
            .cmp(&other.retry)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for QueuedTarget {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedTarget {
    fn eq(&self, other: &Self) -> bool {
        self.retry == other.retry && self.sequence == other.sequence
    }
}

impl Eq for QueuedTarget {}

/// Work-list driving a depth-first traversal without recursion
#[derive(Debug, Default)]
pub struct Frontier {
    queue: BinaryHeap<QueuedTarget>,
    next_sequence: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fresh target; it is served before everything queued earlier
    pub fn push(&mut self, target: CrawlTarget) {
        self.enqueue(target, false);
    }

    /// Adds a page's children so the first one is served next
    ///
    /// Each child's subtree is exhausted before its next sibling is served.
    pub fn push_children(&mut self, children: Vec<CrawlTarget>) {
        for child in children.into_iter().rev() {
            self.enqueue(child, false);
        }
    }

    /// Re-adds a target that failed transiently, ahead of all fresh targets
    pub fn push_retry(&mut self, target: CrawlTarget) {
        self.enqueue(target, true);
    }

    pub fn pop(&mut self) -> Option<CrawlTarget> {
        self.queue.pop().map(|queued| queued.target)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn enqueue(&mut self, target: CrawlTarget, retry: bool) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(QueuedTarget {
            target,
            retry,
            sequence,
        });
    }
}

/// Keys that reached a final outcome (completed or failed) in this run
#[derive(Debug, Default)]
pub struct VisitedSet {
    keys: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the key was already present
    pub fn insert(&mut self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Run-scoped traversal limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlBudget {
    pub max_depth: u32,
    pub max_pages: u32,
    pub page_timeout: Duration,
    pub max_retries: u32,
    pub politeness_delay: Duration,
    pub retry_base_delay: Duration,
    pub max_children_per_page: u32,
}

impl CrawlBudget {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            page_timeout: Duration::from_millis(config.page_timeout_ms),
            max_retries: config.max_retries,
            politeness_delay: Duration::from_millis(config.politeness_delay_ms),
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_children_per_page: config.max_children_per_page,
        }
    }

    pub fn allows_depth(&self, depth: u32) -> bool {
        depth <= self.max_depth
    }

    /// Returns true once `dispatched` distinct pages use up the page budget
    pub fn pages_exhausted(&self, dispatched: u32) -> bool {
        dispatched >= self.max_pages
    }

    /// How many children of a page at `depth` may still be created
    pub fn child_allowance(&self, depth: u32, dispatched: u32) -> usize {
        if depth >= self.max_depth {
            return 0;
        }
        let remaining = self.max_pages.saturating_sub(dispatched);
        remaining.min(self.max_children_per_page) as usize
    }
}

impl Default for CrawlBudget {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}
