//! State of one scrape run.

use sitescribe_core::{ExtractedPage, ScribeError, ScrapeStats, SessionId, SessionStatus};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Pages, counters and lifecycle of a single run. Owned by the orchestrator.
#[derive(Debug)]
pub struct ScrapeSession {
    /// Identifies the run in logs
    pub id: SessionId,
    status: SessionStatus,
    stats: ScrapeStats,
    pages: Vec<ExtractedPage>,
    stop: CancellationToken,
    published: Arc<watch::Sender<SessionStatus>>,
}

impl ScrapeSession {
    /// Every status change is also published on `published`.
    #[must_use]
    pub fn new(stop: CancellationToken, published: Arc<watch::Sender<SessionStatus>>) -> Self {
        Self {
            id: SessionId::generate(),
            status: SessionStatus::Idle,
            stats: ScrapeStats::default(),
            pages: Vec::new(),
            stop,
            published,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Move to `next` if the transition is legal.
    pub fn advance(&mut self, next: SessionStatus) -> Result<(), ScribeError> {
        self.status.advance(next)?;
        self.published.send_replace(next);
        Ok(())
    }

    /// Mark the session failed, whatever state it is in.
    pub fn fail(&mut self) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Failed;
            self.published.send_replace(SessionStatus::Failed);
        }
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> ScrapeStats {
        self.stats
    }

    /// Controls opened during discovery.
    pub fn set_expanded_count(&mut self, count: u32) {
        self.stats.expanded_count = count;
    }

    /// Items discovery produced.
    pub fn set_found_links(&mut self, count: usize) {
        self.stats.found_links = u32::try_from(count).unwrap_or(u32::MAX);
    }

    /// Count a page that could not be reached or read.
    pub fn record_failure(&mut self) {
        self.stats.failed_count += 1;
    }

    /// Retained pages in visit order.
    #[must_use]
    pub fn pages(&self) -> &[ExtractedPage] {
        &self.pages
    }

    /// Keep a page. The only way pages enter a session, so `scraped_count`
    /// always equals the number of pages.
    pub fn retain(&mut self, page: ExtractedPage) {
        self.pages.push(page);
        self.stats.scraped_count = u32::try_from(self.pages.len()).unwrap_or(u32::MAX);
    }

    /// Whether the stop token was cancelled.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }
}
