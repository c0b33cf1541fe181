//! End-to-end sessions against an offline documentation site.

use sitescribe_browser::{PageEnvironment, StaticSite};
use sitescribe_core::{ScrapeEvent, ScrapeOptions, ScrapingConfig, SessionStatus, TimingConfig};
use sitescribe_scraper::{ProgressSink, ScrapeOrchestrator, StopReason};
use std::sync::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

const START: &str = "https://docs.example.com/docs";

/// Records every event; optionally cancels once enough pages are retained.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ScrapeEvent>>,
    stop_after: Option<(u32, CancellationToken)>,
}

impl RecordingSink {
    fn stopping_after(pages: u32, token: CancellationToken) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            stop_after: Some((pages, token)),
        }
    }

    fn events(&self) -> Vec<ScrapeEvent> {
        self.events.lock().unwrap().clone()
    }

    fn scraped_counts(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ScrapeEvent::DetailedProgress(detail) => detail.scraped_count,
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ScrapeEvent) {
        if let (Some((pages, token)), ScrapeEvent::DetailedProgress(detail)) =
            (&self.stop_after, &event)
        {
            if detail.scraped_count.is_some_and(|n| n >= *pages) {
                token.cancel();
            }
        }
        self.events.lock().unwrap().push(event);
    }
}

/// Notes the published session status whenever a page preview arrives.
struct StatusSink {
    status: watch::Receiver<SessionStatus>,
    seen: Mutex<Vec<SessionStatus>>,
}

impl ProgressSink for StatusSink {
    fn emit(&self, event: ScrapeEvent) {
        if matches!(event, ScrapeEvent::ContentUpdate { .. }) {
            let status = *self.status.borrow();
            self.seen.lock().unwrap().push(status);
        }
    }
}

fn body_text(topic: &str) -> String {
    format!(
        "{topic} explains how the platform handles this area in detail. It covers \
         configuration, limits, error handling and worked examples for {topic}."
    )
}

fn topic_page(title: &str) -> String {
    format!(
        "<html><head><title>{title}</title></head><body><main>\
         <h1>{title}</h1><p>{}</p></main></body></html>",
        body_text(title)
    )
}

fn landing(nav: &str) -> String {
    format!(
        "<html><head><title>Acme Docs</title></head><body>{nav}<main>\
         <h1>Acme Docs</h1><p>{}</p></main></body></html>",
        body_text("The landing page")
    )
}

fn nav_list(links: &[(&str, &str, &str)]) -> String {
    let items: String = links
        .iter()
        .map(|(title, href, attrs)| format!("<li><a href=\"{href}\"{attrs}>{title}</a></li>"))
        .collect();
    format!("<nav><ul>{items}</ul></nav>")
}

/// Landing page linking to `count` topics, each registered as a page.
fn topic_site(count: usize) -> StaticSite {
    let titles: Vec<String> = (1..=count).map(|n| format!("Topic {n}")).collect();
    let hrefs: Vec<String> = (1..=count).map(|n| format!("/docs/topic-{n}")).collect();
    let links: Vec<(&str, &str, &str)> = titles
        .iter()
        .zip(&hrefs)
        .map(|(title, href)| (title.as_str(), href.as_str(), ""))
        .collect();

    let mut site = StaticSite::new(START, &landing(&nav_list(&links))).unwrap();
    for (title, href) in titles.iter().zip(&hrefs) {
        site = site.with_page(&format!("https://docs.example.com{href}"), &topic_page(title));
    }
    site
}

fn config(capture_landing_page: bool) -> ScrapingConfig {
    ScrapingConfig {
        capture_landing_page,
        timing: TimingConfig::instant(),
        ..ScrapingConfig::default()
    }
}

#[tokio::test]
async fn test_comprehensive_visits_every_page() {
    let site = topic_site(5);
    let sink = RecordingSink::default();
    let config = config(true);

    let report = ScrapeOrchestrator::new(&site, &sink, &config)
        .run_comprehensive(&ScrapeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::Completed);
    assert!(!report.partial);
    assert_eq!(report.document.title, "Complete Documentation - Acme Docs");
    assert_eq!(report.document.sections_count, 6);
    assert_eq!(report.stats.scraped_count, 6);
    assert_eq!(report.stats.found_links, 5);
    assert_eq!(report.stats.failed_count, 0);

    let content = &report.document.content;
    assert!(content.contains("# Main Page Overview"));
    assert!(content.contains("**Section URL:** https://docs.example.com/docs/topic-1"));
    assert!(content.contains("Topic 5 explains how the platform"));
    let overview = content.find("# Main Page Overview").unwrap();
    let first_topic = content.find("**Section URL:** https://docs.example.com/docs/topic-1").unwrap();
    assert!(overview < first_topic);

    let events = sink.events();
    assert!(matches!(events.last(), Some(ScrapeEvent::Complete(doc)) if doc.sections_count == 6));
    let previews = events
        .iter()
        .filter(|event| matches!(event, ScrapeEvent::ContentUpdate { .. }))
        .count();
    assert_eq!(previews, 6);
}

#[tokio::test]
async fn test_status_is_published_while_running() {
    let site = topic_site(2);
    let (tx, rx) = watch::channel(SessionStatus::Idle);
    let sink = StatusSink {
        status: rx.clone(),
        seen: Mutex::new(Vec::new()),
    };
    let config = config(true);

    ScrapeOrchestrator::new(&site, &sink, &config)
        .with_status_sender(tx)
        .run_comprehensive(&ScrapeOptions::default())
        .await
        .unwrap();

    assert_eq!(
        *sink.seen.lock().unwrap(),
        [
            SessionStatus::Analyzing,
            SessionStatus::ScrapingPages,
            SessionStatus::ScrapingPages
        ]
    );
    assert_eq!(*rx.borrow(), SessionStatus::Completed);
}

#[tokio::test]
async fn test_scraped_count_never_decreases() {
    let site = topic_site(4);
    let sink = RecordingSink::default();
    let config = config(true);

    let report = ScrapeOrchestrator::new(&site, &sink, &config)
        .run_comprehensive(&ScrapeOptions::default())
        .await
        .unwrap();

    let counts = sink.scraped_counts();
    assert!(!counts.is_empty());
    assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(counts.last().copied(), Some(report.stats.scraped_count));
    assert_eq!(report.stats.scraped_count as usize, report.document.sections_count);
}

#[tokio::test]
async fn test_stop_request_yields_partial_document() {
    let site = topic_site(5);
    let token = CancellationToken::new();
    let sink = RecordingSink::stopping_after(2, token.clone());
    let config = config(false);

    let report = ScrapeOrchestrator::new(&site, &sink, &config)
        .with_stop_token(token)
        .run_comprehensive(&ScrapeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert!(report.partial);
    assert_eq!(report.document.title, "PARTIAL - Complete Documentation - Acme Docs");
    assert_eq!(report.document.sections_count, 2);
    assert!(!report.document.content.contains("Topic 3 explains"));
    assert!(matches!(sink.events().last(), Some(ScrapeEvent::Complete(_))));
}

#[tokio::test]
async fn test_stop_before_page_loop_delivers_empty_partial() {
    let site = topic_site(3);
    let sink = RecordingSink::default();
    let config = config(false);
    let orchestrator = ScrapeOrchestrator::new(&site, &sink, &config);
    orchestrator.stop_token().cancel();

    let report = orchestrator
        .run_comprehensive(&ScrapeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.document.sections_count, 0);
    assert!(report.document.title.starts_with("PARTIAL - "));
}

#[tokio::test]
async fn test_consecutive_failures_stop_the_loop() {
    let mut links: Vec<(String, String, &str)> = (1..=3)
        .map(|n| (format!("Topic {n}"), format!("/docs/topic-{n}"), ""))
        .collect();
    links.extend((1..=17).map(|n| {
        (
            format!("Missing {n}"),
            format!("/docs/missing-{n}"),
            " data-activation=\"none\"",
        )
    }));
    let borrowed: Vec<(&str, &str, &str)> = links
        .iter()
        .map(|(title, href, attrs)| (title.as_str(), href.as_str(), *attrs))
        .collect();

    let mut site = StaticSite::new(START, &landing(&nav_list(&borrowed))).unwrap();
    for n in 1..=3 {
        site = site.with_page(
            &format!("https://docs.example.com/docs/topic-{n}"),
            &topic_page(&format!("Topic {n}")),
        );
    }

    let sink = RecordingSink::default();
    let config = config(false);
    let report = ScrapeOrchestrator::new(&site, &sink, &config)
        .run_comprehensive(&ScrapeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::FailureLimit);
    assert_eq!(report.stats.failed_count, config.limits.max_consecutive_failures);
    assert_eq!(report.document.sections_count, 3);
    assert!(!report.partial);
    assert_eq!(report.document.title, "Complete Documentation - Acme Docs");
}

#[tokio::test]
async fn test_duplicate_content_is_retained_once() {
    let nav = nav_list(&[
        ("Topic 1", "/docs/topic-1", ""),
        ("Topic 1 Mirror", "/docs/topic-1-mirror", ""),
        ("Topic 2", "/docs/topic-2", ""),
    ]);
    let site = StaticSite::new(START, &landing(&nav))
        .unwrap()
        .with_page("https://docs.example.com/docs/topic-1", &topic_page("Topic 1"))
        .with_page("https://docs.example.com/docs/topic-1-mirror", &topic_page("Topic 1"))
        .with_page("https://docs.example.com/docs/topic-2", &topic_page("Topic 2"));

    let sink = RecordingSink::default();
    let config = config(false);
    let report = ScrapeOrchestrator::new(&site, &sink, &config)
        .run_comprehensive(&ScrapeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.document.sections_count, 2);
    assert_eq!(report.stats.failed_count, 0);
    assert_eq!(report.document.content.matches("**Section URL:**").count(), 2);
    assert!(!report.document.content.contains("topic-1-mirror"));
}

#[tokio::test]
async fn test_expandable_sidebar_is_opened_before_discovery() {
    let sections = [
        ("billing", "Billing", "/docs/billing/invoice-basics", "Invoice Basics"),
        ("accounts", "Accounts", "/docs/accounts/account-setup", "Account Setup"),
        ("reports", "Reports", "/docs/reports/report-builder", "Report Builder"),
        ("users", "Users", "/docs/users/user-roles", "User Roles"),
    ];
    let nav: String = sections
        .iter()
        .map(|(id, label, href, title)| {
            format!(
                "<li><button aria-expanded=\"false\" aria-controls=\"sec-{id}\">{label}</button>\
                 <div id=\"sec-{id}\" hidden><a href=\"{href}\">{title}</a></div></li>"
            )
        })
        .collect();

    let mut site = StaticSite::new(
        START,
        &landing(&format!("<nav class=\"sidebar\"><ul>{nav}</ul></nav>")),
    )
    .unwrap();
    for (_, _, href, title) in sections {
        site = site.with_page(&format!("https://docs.example.com{href}"), &topic_page(title));
    }

    let sink = RecordingSink::default();
    let config = config(true);
    let report = ScrapeOrchestrator::new(&site, &sink, &config)
        .run_comprehensive(&ScrapeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.stats.expanded_count, 4);
    assert_eq!(site.count("[aria-expanded=\"true\"]").await.unwrap(), 4);
    assert_eq!(report.stats.found_links, 4);
    assert_eq!(report.document.sections_count, 5);
    assert!(report.document.content.contains("User Roles explains"));
}

#[tokio::test]
async fn test_single_page_extracts_displayed_page() {
    let site = topic_site(2);
    let sink = RecordingSink::default();
    let config = config(true);

    let report = ScrapeOrchestrator::new(&site, &sink, &config)
        .run_single_page(&ScrapeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.document.title, "Acme Docs");
    assert_eq!(report.document.url, START);
    assert_eq!(report.document.sections_count, 1);
    assert!(report.document.content.contains("The landing page explains"));
    // Only the displayed page: nothing was navigated
    assert!(site.activations().is_empty());

    let percents: Vec<u8> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ScrapeEvent::Progress { percent, .. } => Some(percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, [0, 10, 20, 80, 100]);
}

#[tokio::test]
async fn test_single_page_with_minimal_content_is_empty() {
    let site = StaticSite::new(
        START,
        "<html><head><title>Stub</title></head><body><main><p>Coming soon.</p></main></body></html>",
    )
    .unwrap();
    let sink = RecordingSink::default();
    let config = config(true);

    let report = ScrapeOrchestrator::new(&site, &sink, &config)
        .run_single_page(&ScrapeOptions::default())
        .await
        .unwrap();

    assert_eq!(report.document.sections_count, 0);
    assert!(report.document.content.is_empty());
    assert_eq!(report.stats.scraped_count, 0);
}

#[test]
fn test_session_status_lifecycle() {
    let mut status = SessionStatus::Idle;
    for next in [
        SessionStatus::Analyzing,
        SessionStatus::Discovering,
        SessionStatus::ScrapingPages,
        SessionStatus::Stopping,
        SessionStatus::Completed,
    ] {
        status.advance(next).unwrap();
    }
    assert!(status.is_terminal());
}
