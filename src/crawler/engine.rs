//! Crawl engine - the main traversal loop
//!
//! One run walks a single origin depth-first from the seed. Pages are dispatched
//! sequentially, spaced by the pacer, and every dispatched target ends in exactly
//! one recorded outcome.

use crate::config::{validate, Config};
use crate::crawler::dispatch::{FetchDispatcher, FetchedPage, PageFetcher};
use crate::crawler::error::FetchError;
use crate::crawler::frontier::{CrawlBudget, CrawlTarget, Frontier, VisitedSet};
use crate::output::{CrawlReport, PageOutcome, ResultAggregator};
use crate::state::{Pacer, TargetState};
use crate::url::{accept_link, SeedOrigin};
use crate::SitegroveError;
use std::collections::HashSet;
use std::time::Instant;

/// How often (in recorded outcomes) progress is logged
const PROGRESS_INTERVAL: usize = 10;

/// Mutable state of one crawl run
#[derive(Debug)]
pub struct CrawlSession {
    pub origin: SeedOrigin,
    pub frontier: Frontier,
    pub visited: VisitedSet,
    pub aggregator: ResultAggregator,
    pub pacer: Pacer,

    /// Distinct targets dispatched so far (retries not included)
    pub dispatched: u32,
}

impl CrawlSession {
    pub fn new(origin: SeedOrigin, budget: &CrawlBudget) -> Self {
        let mut frontier = Frontier::new();
        frontier.push(CrawlTarget::seed(
            origin.seed().clone(),
            origin.seed_key().to_string(),
        ));

        Self {
            origin,
            frontier,
            visited: VisitedSet::new(),
            aggregator: ResultAggregator::new(),
            pacer: Pacer::new(budget.politeness_delay, budget.retry_base_delay),
            dispatched: 0,
        }
    }

    /// Closes the session into the final report
    pub fn into_report(self, seed: &str) -> CrawlReport {
        let base_url = self.origin.base_url().to_string();
        self.aggregator.finalize(&base_url, seed)
    }
}

/// Drives a crawl through any page fetcher
pub struct CrawlEngine<F: PageFetcher> {
    fetcher: F,
    budget: CrawlBudget,
}

impl<F: PageFetcher> CrawlEngine<F> {
    pub fn new(fetcher: F, budget: CrawlBudget) -> Self {
        Self { fetcher, budget }
    }

    pub fn budget(&self) -> &CrawlBudget {
        &self.budget
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Crawls from `seed` until the frontier drains or the page budget is spent
    ///
    /// Only an unusable seed aborts the run; page failures are recorded in the
    /// report. Once traversal starts, the fetcher is shut down before returning.
    pub async fn run(&mut self, seed: &str) -> crate::Result<CrawlReport> {
        let report = self.traverse(seed).await?.into_report(seed);

        tracing::info!(
            "Crawl finished: {} pages ({} ok, {} failed) in {} ms",
            report.total,
            report.successful,
            report.failed,
            report.total_duration_ms
        );

        Ok(report)
    }

    /// Runs the traversal and hands back the drained session
    pub async fn traverse(&mut self, seed: &str) -> crate::Result<CrawlSession> {
        let origin = SeedOrigin::parse(seed).map_err(|e| SitegroveError::InvalidSeed {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(
            "Starting crawl of {} (max depth {}, max pages {})",
            origin.base_url(),
            self.budget.max_depth,
            self.budget.max_pages
        );

        let mut session = CrawlSession::new(origin, &self.budget);
        let result = self.drive(&mut session).await;
        self.fetcher.shutdown().await;
        result?;

        Ok(session)
    }

    async fn drive(&mut self, session: &mut CrawlSession) -> crate::Result<()> {
        while let Some(mut target) = session.frontier.pop() {
            if session.visited.contains(&target.key) {
                tracing::trace!("Skipping already visited {}", target.key);
                continue;
            }

            if !self.budget.allows_depth(target.depth) {
                tracing::debug!("Skipping {} beyond max depth", target.url);
                continue;
            }

            if !target.is_retry() && self.budget.pages_exhausted(session.dispatched) {
                tracing::debug!("Page budget spent, dropping {}", target.url);
                continue;
            }

            if let Some(wait) = session.pacer.time_until_next(target.retry_count, Instant::now()) {
                tracing::trace!("Pacing: waiting {:?} before {}", wait, target.url);
                tokio::time::sleep(wait).await;
            }
            session.pacer.record_dispatch(Instant::now());

            target.state = target.state.transition(&target.key, TargetState::Active)?;
            if !target.is_retry() {
                session.dispatched += 1;
            }

            tracing::debug!(
                "Fetching {} (depth {}, retry {})",
                target.url,
                target.depth,
                target.retry_count
            );

            let started = Instant::now();
            let result = match tokio::time::timeout(
                self.budget.page_timeout,
                self.fetcher.fetch_page(&target.url),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(format!(
                    "page exceeded {} ms",
                    self.budget.page_timeout.as_millis()
                ))),
            };

            match result {
                Ok(page) => self.complete(session, target, page)?,
                Err(err) if err.is_retryable() && target.retry_count < self.budget.max_retries => {
                    tracing::info!(
                        "Retrying {} after {} (attempt {} of {})",
                        target.url,
                        err.class(),
                        target.retry_count + 2,
                        self.budget.max_retries + 1
                    );
                    target.state = target.state.transition(&target.key, TargetState::RetryPending)?;
                    target.retry_count += 1;
                    session.frontier.push_retry(target);
                    continue;
                }
                Err(err) => {
                    tracing::warn!("Failed {}: {}", target.url, err);
                    target.state = target.state.transition(&target.key, TargetState::Failed)?;
                    session.visited.insert(&target.key);
                    session
                        .aggregator
                        .append(PageOutcome::failure(&target, &err, started.elapsed()));
                }
            }

            let recorded = session.aggregator.len();
            if recorded % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {} pages recorded, {} queued",
                    recorded,
                    session.frontier.len()
                );
            }
        }

        Ok(())
    }

    fn complete(
        &self,
        session: &mut CrawlSession,
        mut target: CrawlTarget,
        page: FetchedPage,
    ) -> crate::Result<()> {
        target.state = target.state.transition(&target.key, TargetState::Completed)?;
        session.visited.insert(&target.key);

        let children = self.select_children(session, &target, &page.links);
        tracing::debug!(
            "Fetched {} via {} ({} links, {} queued)",
            target.url,
            page.method,
            page.links.len(),
            children.len()
        );
        session.frontier.push_children(children);
        session.aggregator.append(PageOutcome::success(&target, page));
        Ok(())
    }

    /// Picks the same-origin, unvisited links of a page, in document order
    fn select_children(
        &self,
        session: &CrawlSession,
        parent: &CrawlTarget,
        links: &[String],
    ) -> Vec<CrawlTarget> {
        let allowance = self.budget.child_allowance(parent.depth, session.dispatched);
        if allowance == 0 {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        links
            .iter()
            .filter_map(|link| accept_link(link, &session.origin))
            .filter(|(_, key)| *key != parent.key && !session.visited.contains(key))
            .filter(|(_, key)| seen.insert(key.clone()))
            .take(allowance)
            .map(|(url, key)| CrawlTarget::child(url, key, parent))
            .collect()
    }
}

/// Runs a complete crawl of `seed` with the configured fetch stack
///
/// An invalid configuration is rejected before any request is made.
pub async fn crawl(seed: &str, config: &Config) -> crate::Result<CrawlReport> {
    validate(config)?;
    let dispatcher = FetchDispatcher::new(&config.fetch)?;
    tracing::debug!("Render mode: {:?}", dispatcher.mode());
    let mut engine = CrawlEngine::new(dispatcher, CrawlBudget::from_config(&config.crawler));
    engine.run(seed).await
}
