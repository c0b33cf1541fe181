//! Scrape orchestrator for driving one session end to end.
//!
//! This module provides the `ScrapeOrchestrator`, which analyzes the site,
//! discovers pages, visits each one, and assembles the retained pages into a
//! single document. Per-page failures are counted and stop the loop once too
//! many happen in a row; anything else aborts the session.

use crate::analyzer::SiteAnalyzer;
use crate::dedup::Deduplicator;
use crate::discovery::{DiscoveryContext, DiscoveryStrategy, LegacyDiscovery, NavigableItem};
use crate::error::Result;
use crate::extractor::PageExtractor;
use crate::navigation::Navigator;
use crate::progress::ProgressSink;
use crate::session::ScrapeSession;
use crate::text::{analyze_content, word_count, ContentStats};
use chrono::{DateTime, Utc};
use sitescribe_browser::PageEnvironment;
use sitescribe_core::{
    ActionType, DetailedProgress, ExtractedPage, LimitsConfig, ScrapeDocument, ScrapeEvent,
    ScrapeOptions, ScrapeStats, ScrapingConfig, SessionStatus, TimingConfig, TRUNCATION_NOTICE,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Section heading of the page the scrape starts on.
pub const LANDING_SECTION_TITLE: &str = "Main Page Overview";

const DOCUMENT_TITLE_PREFIX: &str = "Complete Documentation - ";
const PARTIAL_PREFIX: &str = "PARTIAL - ";

/// Why the page loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every discovered page was visited
    Completed,
    /// A stop was requested
    Cancelled,
    /// Too many consecutive pages failed
    FailureLimit,
}

/// Outcome of a finished session, for in-process callers.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    /// Document delivered on the completion channel
    pub document: ScrapeDocument,
    /// Final counters
    pub stats: ScrapeStats,
    /// Whether the document was cut short by a stop request
    pub partial: bool,
    /// Why the page loop ended
    pub stop_reason: StopReason,
    /// Whether the output cap truncated the content
    pub truncated: bool,
    /// Reading statistics of the final content
    pub content_stats: ContentStats,
    /// When the document was assembled
    pub scraped_at: DateTime<Utc>,
}

/// Drives the analyzer, discovery, navigation and extraction for one page
/// environment.
pub struct ScrapeOrchestrator<'a> {
    env: &'a dyn PageEnvironment,
    sink: &'a dyn ProgressSink,
    config: &'a ScrapingConfig,
    stop: CancellationToken,
    status: Arc<watch::Sender<SessionStatus>>,
}

impl<'a> ScrapeOrchestrator<'a> {
    /// Create an orchestrator with its own stop token.
    #[must_use]
    pub fn new(
        env: &'a dyn PageEnvironment,
        sink: &'a dyn ProgressSink,
        config: &'a ScrapingConfig,
    ) -> Self {
        Self {
            env,
            sink,
            config,
            stop: CancellationToken::new(),
            status: Arc::new(watch::channel(SessionStatus::Idle).0),
        }
    }

    /// Use a stop token shared with a controller.
    #[must_use]
    pub fn with_stop_token(mut self, stop: CancellationToken) -> Self {
        self.stop = stop;
        self
    }

    /// Publish status changes on a channel owned by a controller.
    #[must_use]
    pub fn with_status_sender(mut self, status: watch::Sender<SessionStatus>) -> Self {
        self.status = Arc::new(status);
        self
    }

    /// Follows the status of the running session.
    #[must_use]
    pub fn status_watch(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Token that stops the running session when cancelled.
    #[must_use]
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    fn limits(&self) -> &'a LimitsConfig {
        &self.config.limits
    }

    fn timing(&self) -> &'a TimingConfig {
        &self.config.timing
    }

    async fn pause(&self, ms: u64) {
        tokio::time::sleep(TimingConfig::ms(ms)).await;
    }

    fn progress(&self, percent: f64, status: impl Into<String>) {
        self.sink.emit(ScrapeEvent::progress(percent, status));
    }

    /// Extract the displayed page only.
    pub async fn run_single_page(&self, options: &ScrapeOptions) -> Result<ScrapeReport> {
        let mut session = ScrapeSession::new(self.stop.clone(), Arc::clone(&self.status));
        tracing::info!("Starting single-page session {}", session.id);

        let result = self.single_page(&mut session, options).await;
        self.finish(&mut session, result)
    }

    /// Discover every documentation page reachable from the displayed page and
    /// extract each one.
    pub async fn run_comprehensive(&self, options: &ScrapeOptions) -> Result<ScrapeReport> {
        let mut session = ScrapeSession::new(self.stop.clone(), Arc::clone(&self.status));
        tracing::info!("Starting comprehensive session {}", session.id);

        let result = self.comprehensive(&mut session, options).await;
        self.finish(&mut session, result)
    }

    /// Deliver the outcome on the completion channel.
    fn finish(
        &self,
        session: &mut ScrapeSession,
        result: Result<ScrapeReport>,
    ) -> Result<ScrapeReport> {
        match result {
            Ok(report) => {
                tracing::info!(
                    "Session {} finished ({:?}): {} sections, {} words",
                    session.id,
                    report.stop_reason,
                    report.document.sections_count,
                    report.document.word_count
                );
                self.sink.emit(ScrapeEvent::Complete(report.document.clone()));
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Session {} failed: {}", session.id, e);
                session.fail();
                self.sink.emit(ScrapeEvent::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn single_page(
        &self,
        session: &mut ScrapeSession,
        options: &ScrapeOptions,
    ) -> Result<ScrapeReport> {
        self.progress(0.0, "Starting extraction...");
        session.advance(SessionStatus::ScrapingPages)?;
        let start_url = self.env.location().await?;

        if options.wait_for_dynamic {
            self.progress(10.0, "Waiting for dynamic content...");
            Navigator::new(self.env, self.limits(), self.timing())
                .settle_dynamic_content()
                .await?;
        }

        self.progress(20.0, "Analyzing page structure...");
        let extractor = PageExtractor::new(self.env, options, self.limits());
        let title = extractor.title().await?;
        if let Some(page) = extractor.extract_page().await? {
            self.sink
                .emit(ScrapeEvent::content_update(&page, self.limits().preview_chars));
            session.retain(page);
        } else {
            self.sink.detail(DetailedProgress::action(
                ActionType::Warning,
                "Page content was minimal or empty",
            ));
        }

        self.progress(80.0, "Processing extracted content...");
        let pages = session.pages();
        let (content, truncated) = match pages.first() {
            Some(page) => cap_output(page.content.clone(), self.limits()),
            None => (String::new(), false),
        };
        let document = ScrapeDocument {
            url: start_url,
            title,
            word_count: word_count(&content),
            sections_count: pages.first().map_or(0, |page| page.sections_count),
            content,
        };

        session.advance(SessionStatus::Completed)?;
        self.progress(100.0, "Complete");
        Ok(self.report(session, document, StopReason::Completed, truncated))
    }

    async fn comprehensive(
        &self,
        session: &mut ScrapeSession,
        options: &ScrapeOptions,
    ) -> Result<ScrapeReport> {
        self.progress(0.0, "Finding documentation sections...");
        session.advance(SessionStatus::Analyzing)?;

        let start_url = self.env.location().await?;
        let extractor = PageExtractor::new(self.env, options, self.limits());
        let start_title = extractor.title().await?;
        let mut dedup = Deduplicator::new(self.limits().fingerprint_chars);

        if self.config.capture_landing_page {
            self.capture_landing_page(session, &mut dedup, &extractor, &start_url)
                .await?;
        }

        self.progress(5.0, "Analyzing site structure...");
        let profile = SiteAnalyzer::new(self.env).analyze().await?;
        tracing::info!(
            "Site profile: {} / {} / {} (confidence {})",
            profile.site_type,
            profile.navigation_style,
            profile.content_pattern,
            profile.confidence
        );

        session.advance(SessionStatus::Discovering)?;
        let strategy = DiscoveryStrategy::select(&profile);
        self.progress(10.0, format!("Discovering pages ({strategy})..."));
        self.sink.detail(
            DetailedProgress::default().with_current("Discovering all unique pages..."),
        );

        let ctx = DiscoveryContext::new(self.env, self.sink, &profile, self.limits(), self.timing());
        let mut items = strategy.discover(&ctx).await?;
        if items.is_empty() {
            self.sink.detail(
                DetailedProgress::action(ActionType::Warning, "Falling back to legacy discovery")
                    .with_current("No pages found - trying legacy discovery..."),
            );
            items = LegacyDiscovery::discover(&ctx).await?;
        }

        session.set_expanded_count(ctx.expanded_count().await);
        session.set_found_links(items.len());
        self.sink.detail(
            DetailedProgress {
                action_type: if items.is_empty() {
                    ActionType::Warning
                } else {
                    ActionType::Success
                },
                action: Some(format!("Discovered {} unique pages", items.len())),
                ..DetailedProgress::default()
            }
            .with_stats(&session.stats())
            .with_current(format!("Found {} unique pages to scrape", items.len())),
        );
        drop(ctx);

        let stop_reason = if session.stop_requested() {
            StopReason::Cancelled
        } else {
            session.advance(SessionStatus::ScrapingPages)?;
            self.progress(20.0, format!("Scraping {} pages...", items.len()));
            self.scrape_pages(session, &mut dedup, items, options).await
        };

        if stop_reason == StopReason::Cancelled {
            tracing::info!("Stop requested; assembling partial results");
            session.advance(SessionStatus::Stopping)?;
        }

        self.progress(90.0, "Combining all documentation...");
        let (document, truncated) = combine_pages(
            session.pages(),
            &start_url,
            &start_title,
            stop_reason == StopReason::Cancelled,
            self.limits(),
        );

        self.progress(95.0, "Finalizing comprehensive documentation...");
        session.advance(SessionStatus::Completed)?;
        Ok(self.report(session, document, stop_reason, truncated))
    }

    async fn capture_landing_page(
        &self,
        session: &mut ScrapeSession,
        dedup: &mut Deduplicator,
        extractor: &PageExtractor<'_>,
        start_url: &str,
    ) -> Result<()> {
        self.sink.detail(
            DetailedProgress::default().with_current("Capturing main page content..."),
        );

        let Some(page) = extractor.extract_page().await? else {
            tracing::info!("Main page content was minimal or empty");
            return Ok(());
        };
        let page = page.with_section(LANDING_SECTION_TITLE, start_url);
        if dedup.admit(&page) {
            self.retain(session, page);
        }
        Ok(())
    }

    fn retain(&self, session: &mut ScrapeSession, page: ExtractedPage) {
        let action = format!("Scraped: {} ({} words)", page.heading(), page.word_count);
        self.sink
            .emit(ScrapeEvent::content_update(&page, self.limits().preview_chars));
        session.retain(page);
        self.sink.detail(
            DetailedProgress::action(ActionType::Success, action).with_stats(&session.stats()),
        );
    }

    async fn scrape_pages(
        &self,
        session: &mut ScrapeSession,
        dedup: &mut Deduplicator,
        items: Vec<NavigableItem>,
        options: &ScrapeOptions,
    ) -> StopReason {
        let total = items.len();
        let navigator = Navigator::new(self.env, self.limits(), self.timing());
        let extractor = PageExtractor::new(self.env, options, self.limits());
        let mut consecutive_failures = 0;

        for (i, item) in items.into_iter().enumerate() {
            if session.stop_requested() {
                return StopReason::Cancelled;
            }
            if dedup.should_skip(&item) {
                tracing::debug!("Skipping duplicate: {}", item.title);
                continue;
            }

            self.sink.detail(
                DetailedProgress::action(ActionType::Info, format!("Scraping: {}", item.title))
                    .with_current(format!("Page {}/{}: {}", i + 1, total, item.title)),
            );
            dedup.mark_visited(&item);

            match self.scrape_item(&navigator, &extractor, options, &item).await {
                Ok(Some(page)) => {
                    if dedup.admit(&page) {
                        self.retain(session, page);
                        consecutive_failures = 0;
                    } else {
                        tracing::debug!("Skipping duplicate content for: {}", item.title);
                    }
                }
                Ok(None) => tracing::debug!("No usable content at: {}", item.title),
                Err(e) => {
                    session.record_failure();
                    consecutive_failures += 1;
                    tracing::warn!(
                        "Failed to scrape {} ({} consecutive failures): {}",
                        item.title,
                        consecutive_failures,
                        e
                    );
                    self.sink.detail(
                        DetailedProgress::action(
                            ActionType::Error,
                            format!("Failed: {}", item.title),
                        )
                        .with_stats(&session.stats()),
                    );
                    if consecutive_failures >= self.limits().max_consecutive_failures {
                        tracing::warn!(
                            "Too many consecutive failures ({}), stopping",
                            consecutive_failures
                        );
                        return StopReason::FailureLimit;
                    }
                }
            }

            #[allow(clippy::cast_precision_loss)]
            let percent = 20.0 + ((i + 1) as f64 / total as f64) * 60.0;
            self.progress(percent, format!("Scraped page {}/{}", i + 1, total));

            if i + 1 < total {
                self.pause(self.timing().between_pages_ms).await;
            }
        }
        StopReason::Completed
    }

    async fn scrape_item(
        &self,
        navigator: &Navigator<'_>,
        extractor: &PageExtractor<'_>,
        options: &ScrapeOptions,
        item: &NavigableItem,
    ) -> Result<Option<ExtractedPage>> {
        navigator.navigate(item).await?;
        self.pause(self.timing().post_navigation_settle_ms).await;
        if options.wait_for_dynamic {
            navigator.settle_dynamic_content().await?;
        }

        Ok(extractor
            .extract_page()
            .await?
            .map(|page| page.with_section(item.title.clone(), item.url.clone())))
    }

    fn report(
        &self,
        session: &ScrapeSession,
        document: ScrapeDocument,
        stop_reason: StopReason,
        truncated: bool,
    ) -> ScrapeReport {
        ScrapeReport {
            content_stats: analyze_content(&document.content),
            document,
            stats: session.stats(),
            partial: stop_reason == StopReason::Cancelled,
            stop_reason,
            truncated,
            scraped_at: Utc::now(),
        }
    }
}

/// Cut `content` to fit the output cap, on a character boundary, and append
/// the truncation notice. Returns whether anything was cut.
#[must_use]
pub fn cap_output(mut content: String, limits: &LimitsConfig) -> (String, bool) {
    if content.len() <= limits.max_output_bytes {
        return (content, false);
    }

    let mut cut = limits
        .max_output_bytes
        .saturating_sub(limits.truncation_reserve_bytes);
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    tracing::warn!(
        "Document is {} bytes; truncating to {}",
        content.len(),
        cut
    );
    content.truncate(cut);
    content.push_str(TRUNCATION_NOTICE);
    (content, true)
}

/// Stitch retained pages into the completion document.
#[must_use]
pub fn combine_pages(
    pages: &[ExtractedPage],
    start_url: &str,
    start_title: &str,
    partial: bool,
    limits: &LimitsConfig,
) -> (ScrapeDocument, bool) {
    let mut content = String::new();
    for page in pages {
        content.push_str(&format!(
            "\n\n# {}\n\n**Section URL:** {}\n\n{}\n\n---\n",
            page.heading(),
            page.section_url.as_deref().unwrap_or(&page.url),
            page.content
        ));
    }
    let (content, truncated) = cap_output(content, limits);

    let mut title = format!("{DOCUMENT_TITLE_PREFIX}{start_title}");
    if partial {
        title.insert_str(0, PARTIAL_PREFIX);
    }

    let document = ScrapeDocument {
        url: start_url.to_string(),
        title,
        word_count: word_count(&content),
        sections_count: pages.len(),
        content,
    };
    (document, truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, content: &str) -> ExtractedPage {
        ExtractedPage {
            url: format!("https://docs.example.com/{}", title.to_lowercase()),
            title: title.to_string(),
            word_count: word_count(content),
            content: content.to_string(),
            sections_count: 1,
            section_title: None,
            section_url: None,
        }
        .with_section(title, format!("https://docs.example.com/{}", title.to_lowercase()))
    }

    #[test]
    fn test_combine_pages_layout() {
        let pages = vec![page("Intro", "Hello there."), page("Usage", "Call it.")];
        let (doc, truncated) = combine_pages(
            &pages,
            "https://docs.example.com/",
            "Docs",
            false,
            &LimitsConfig::default(),
        );

        assert!(!truncated);
        assert_eq!(doc.title, "Complete Documentation - Docs");
        assert_eq!(doc.sections_count, 2);
        assert_eq!(doc.word_count, word_count(&doc.content));
        assert!(doc.content.starts_with(
            "\n\n# Intro\n\n**Section URL:** https://docs.example.com/intro\n\nHello there.\n\n---\n"
        ));
        assert!(doc.content.contains("\n\n# Usage\n\n"));
    }

    #[test]
    fn test_partial_title() {
        let (doc, _) = combine_pages(&[], "https://d.example.com", "Docs", true, &LimitsConfig::default());
        assert_eq!(doc.title, "PARTIAL - Complete Documentation - Docs");
        assert_eq!(doc.sections_count, 0);
    }

    #[test]
    fn test_truncation_at_cap() {
        let limits = LimitsConfig::default();
        let big = "word ".repeat(60 * 1024 * 1024 / 5);
        let pages = vec![page("Huge", &big)];

        let (doc, truncated) = combine_pages(&pages, "https://d.example.com", "Docs", false, &limits);
        assert!(truncated);
        assert!(doc.content.len() <= limits.max_output_bytes);
        assert_eq!(doc.content.matches(TRUNCATION_NOTICE).count(), 1);
        assert!(doc.content.ends_with(TRUNCATION_NOTICE));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let limits = LimitsConfig {
            max_output_bytes: TRUNCATION_NOTICE.len() + 15,
            truncation_reserve_bytes: TRUNCATION_NOTICE.len(),
            ..LimitsConfig::default()
        };
        let (content, truncated) = cap_output("é".repeat(40), &limits);
        assert!(truncated);
        assert_eq!(content, format!("{}{TRUNCATION_NOTICE}", "é".repeat(7)));
        assert!(content.len() <= limits.max_output_bytes);
    }

    #[test]
    fn test_small_content_untouched() {
        let (content, truncated) = cap_output("short".to_string(), &LimitsConfig::default());
        assert_eq!(content, "short");
        assert!(!truncated);
    }
}
