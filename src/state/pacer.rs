use std::time::{Duration, Instant};

/// Enforces minimum spacing between consecutive dispatch starts
///
/// The crawl is single-origin and sequential, so one pacer per run covers every
/// request, including the parent to first child hop and retries.
#[derive(Debug, Clone)]
pub struct Pacer {
    /// Minimum time between two dispatch starts
    politeness_delay: Duration,

    /// Base delay for frontier retry backoff
    retry_base_delay: Duration,

    /// When the previous dispatch started
    last_dispatch: Option<Instant>,
}

impl Pacer {
    pub fn new(politeness_delay: Duration, retry_base_delay: Duration) -> Self {
        Self {
            politeness_delay,
            retry_base_delay,
            last_dispatch: None,
        }
    }

    /// Backoff before the given retry attempt: `base * 2^(retry - 1)`
    ///
    /// Zero for a first attempt.
    pub fn backoff_for(&self, retry_count: u32) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        let exponent = (retry_count - 1).min(16);
        self.retry_base_delay.saturating_mul(1u32 << exponent)
    }

    /// Required gap between the previous dispatch start and this one
    pub fn required_gap(&self, retry_count: u32) -> Duration {
        self.politeness_delay.max(self.backoff_for(retry_count))
    }

    /// Calculates the time until a dispatch with `retry_count` may start
    ///
    /// Returns None if the dispatch can start now. The very first dispatch of a
    /// run never waits.
    pub fn time_until_next(&self, retry_count: u32, now: Instant) -> Option<Duration> {
        let last = self.last_dispatch?;
        let gap = self.required_gap(retry_count);
        let elapsed = now.saturating_duration_since(last);
        if elapsed < gap {
            Some(gap - elapsed)
        } else {
            None
        }
    }

    /// Records that a dispatch started at `now`
    pub fn record_dispatch(&mut self, now: Instant) {
        self.last_dispatch = Some(now);
    }
}
