use sitescribe_browser::{PageEnvironment, StaticSite};
use sitescribe_core::{ScrapeEvent, ScrapeOptions, ScrapingConfig, SessionStatus, TimingConfig};
use sitescribe_scraper::{
    ControlRequest, ControlResponse, ProgressSink, ScrapeController, ScrapeError, StopReason,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tokio::sync::mpsc;

const START: &str = "https://docs.example.com/docs";

fn site() -> StaticSite {
    StaticSite::new(
        START,
        "<html><head><title>Acme Docs</title></head><body>\
         <nav><ul><li><a href=\"/docs/quickstart\">Quickstart</a></li></ul></nav>\
         <main><p>Acme Docs covers installation, authentication, pagination and error \
         handling for every public endpoint of the platform.</p></main></body></html>",
    )
    .unwrap()
    .with_page(
        "https://docs.example.com/docs/quickstart",
        "<html><head><title>Quickstart</title></head><body><main><p>Quickstart shows how to \
         create an API key, send the first authenticated request and read the paginated \
         response body.</p>\
         </main></body></html>",
    )
}

fn controller_with(sink: Arc<dyn ProgressSink>) -> ScrapeController {
    let env: Arc<dyn PageEnvironment> = Arc::new(site());
    let config = ScrapingConfig {
        timing: TimingConfig::instant(),
        ..ScrapingConfig::default()
    };
    ScrapeController::new(env, sink, config)
}

fn controller(events: mpsc::UnboundedSender<ScrapeEvent>) -> ScrapeController {
    controller_with(Arc::new(events))
}

/// Panics on the first event it receives, then discards the rest.
#[derive(Default)]
struct PanicOnceSink {
    fired: AtomicBool,
}

impl ProgressSink for PanicOnceSink {
    fn emit(&self, _event: ScrapeEvent) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            panic!("sink failure");
        }
    }
}

/// Sends another start request every time a page preview arrives.
#[derive(Default)]
struct RestartingSink {
    controller: OnceLock<Weak<ScrapeController>>,
    replies: Mutex<Vec<ControlResponse>>,
}

impl ProgressSink for RestartingSink {
    fn emit(&self, event: ScrapeEvent) {
        if !matches!(event, ScrapeEvent::ContentUpdate { .. }) {
            return;
        }
        if let Some(controller) = self.controller.get().and_then(Weak::upgrade) {
            let reply =
                controller.handle(ControlRequest::StartComprehensive(ScrapeOptions::default()));
            self.replies.lock().unwrap().push(reply);
        }
    }
}

#[test]
fn test_ping_and_idle_stop() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let controller = controller(tx);

    assert_eq!(controller.handle(ControlRequest::Ping), ControlResponse::Ready);
    assert_eq!(controller.handle(ControlRequest::Stop), ControlResponse::NotRunning);
    assert_eq!(controller.status(), None);
    assert!(tokio_test::block_on(controller.join()).is_none());
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = controller(tx);

    assert_eq!(
        controller.handle(ControlRequest::StartComprehensive(ScrapeOptions::default())),
        ControlResponse::Accepted
    );
    assert_eq!(
        controller.handle(ControlRequest::Start(ScrapeOptions::default())),
        ControlResponse::AlreadyActive {
            status: SessionStatus::Analyzing
        }
    );

    let report = controller.join().await.unwrap().unwrap();
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_eq!(report.document.sections_count, 2);
    assert_eq!(controller.status(), None);

    let mut completions = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, ScrapeEvent::Complete(_)) {
            completions += 1;
        }
    }
    assert_eq!(completions, 1);

    // The slot is free again
    assert_eq!(
        controller.handle(ControlRequest::Start(ScrapeOptions::default())),
        ControlResponse::Accepted
    );
    let report = controller.join().await.unwrap().unwrap();
    assert_eq!(report.document.title, "Quickstart");
}

#[tokio::test]
async fn test_stop_delivers_partial_document() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = controller(tx);

    controller.handle(ControlRequest::StartComprehensive(ScrapeOptions::default()));
    assert_eq!(controller.handle(ControlRequest::Stop), ControlResponse::StopRequested);
    assert_eq!(controller.status(), Some(SessionStatus::Stopping));
    assert_eq!(
        controller.handle(ControlRequest::StartComprehensive(ScrapeOptions::default())),
        ControlResponse::AlreadyActive {
            status: SessionStatus::Stopping
        }
    );

    let report = controller.join().await.unwrap().unwrap();
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert!(report.partial);
    assert!(report.document.title.starts_with("PARTIAL - "));

    let mut completed = None;
    while let Ok(event) = rx.try_recv() {
        if let ScrapeEvent::Complete(document) = event {
            completed = Some(document);
        }
    }
    assert_eq!(completed, Some(report.document));
}

#[tokio::test]
async fn test_rejected_start_reports_live_status() {
    let sink = Arc::new(RestartingSink::default());
    let controller = Arc::new(controller_with(sink.clone()));
    sink.controller.set(Arc::downgrade(&controller)).unwrap();

    assert_eq!(
        controller.handle(ControlRequest::StartComprehensive(ScrapeOptions::default())),
        ControlResponse::Accepted
    );
    let report = controller.join().await.unwrap().unwrap();
    assert_eq!(report.document.sections_count, 2);

    // Landing page during analysis, then the quickstart page
    assert_eq!(
        *sink.replies.lock().unwrap(),
        [
            ControlResponse::AlreadyActive {
                status: SessionStatus::Analyzing
            },
            ControlResponse::AlreadyActive {
                status: SessionStatus::ScrapingPages
            },
        ]
    );
    assert_eq!(controller.status(), None);
}

#[tokio::test]
async fn test_panicking_session_releases_guard() {
    let controller = controller_with(Arc::new(PanicOnceSink::default()));

    assert_eq!(
        controller.handle(ControlRequest::Start(ScrapeOptions::default())),
        ControlResponse::Accepted
    );
    let err = controller.join().await.unwrap().unwrap_err();
    assert!(matches!(err, ScrapeError::Task(_)));
    assert_eq!(controller.status(), None);

    assert_eq!(
        controller.handle(ControlRequest::Start(ScrapeOptions::default())),
        ControlResponse::Accepted
    );
    let report = controller.join().await.unwrap().unwrap();
    assert_eq!(report.document.title, "Acme Docs");
}
