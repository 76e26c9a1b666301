use crate::output::report::{CrawlReport, PageOutcome};
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Collects page outcomes as the crawl proceeds
///
/// Purely additive: outcomes are never changed or removed once appended.
#[derive(Debug)]
pub struct ResultAggregator {
    pages: Vec<PageOutcome>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn append(&mut self, outcome: PageOutcome) {
        self.pages.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.pages.iter().filter(|p| p.success).count()
    }

    /// Builds the final report
    pub fn finalize(self, base_url: &str, seed_url: &str) -> CrawlReport {
        let total = self.pages.len();
        let successful = self.pages.iter().filter(|p| p.success).count();
        let failed = total - successful;

        let max_depth_reached = self.pages.iter().map(|p| p.depth).max().unwrap_or(0);

        let load_times: Vec<u64> = self
            .pages
            .iter()
            .filter(|p| p.success)
            .map(|p| p.duration_ms)
            .collect();
        let average_load_ms = if load_times.is_empty() {
            0.0
        } else {
            load_times.iter().sum::<u64>() as f64 / load_times.len() as f64
        };

        CrawlReport {
            seed_url: seed_url.to_string(),
            base_url: base_url.to_string(),
            started_at: self.started_at,
            total_duration_ms: u64::try_from(self.started.elapsed().as_millis())
                .unwrap_or(u64::MAX),
            pages: self.pages,
            total,
            successful,
            failed,
            max_depth_reached,
            average_load_ms,
        }
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}
