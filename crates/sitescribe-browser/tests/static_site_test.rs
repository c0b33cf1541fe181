use sitescribe_browser::{
    BrowserError, DomNode, FrameContent, InputEvent, LocationNotice, PageEnvironment, Routing,
    StaticSite,
};

const START: &str = "https://docs.example.com/docs";

fn sidebar_page(body: &str) -> String {
    format!(
        "<html><head><title>Docs</title></head><body>\
         <nav class=\"sidebar\"><ul>\
         <li><a href=\"/docs/intro\">Introduction</a></li>\
         <li><a href=\"/docs/setup\" data-activation=\"keydown\">Setup Guide</a></li>\
         </ul></nav><main>{body}</main></body></html>"
    )
}

fn page(title: &str, body: &str) -> String {
    format!("<html><head><title>{title}</title></head><body><main>{body}</main></body></html>")
}

#[tokio::test]
async fn test_client_side_routing_swaps_main() {
    let site = StaticSite::new(START, &sidebar_page("<p>Landing</p>"))
        .unwrap()
        .with_page("https://docs.example.com/docs/intro", &page("Intro", "<p>Welcome text</p>"));

    let nav_link = site.query_all("nav a").await.unwrap()[0];
    let main = site.first("main").await.unwrap().unwrap();

    site.activate(nav_link).await.unwrap();

    assert_eq!(
        site.location().await.unwrap(),
        "https://docs.example.com/docs/intro"
    );
    assert_eq!(site.text_of(main).await.unwrap(), "Welcome text");
    // Sidebar handles survive a client-side route
    assert_eq!(site.text_of(nav_link).await.unwrap(), "Introduction");
}

#[tokio::test]
async fn test_full_reload_invalidates_handles() {
    let site = StaticSite::new(START, &sidebar_page("<p>Landing</p>"))
        .unwrap()
        .with_page("https://docs.example.com/docs/intro", &page("Intro", "<p>Welcome</p>"))
        .with_routing(Routing::FullReload);

    let nav_link = site.query_all("nav a").await.unwrap()[0];
    site.activate(nav_link).await.unwrap();

    let err = site.describe(nav_link).await.unwrap_err();
    assert!(matches!(err, BrowserError::StaleElement(_)));
    assert!(err.is_transient());
    assert_eq!(site.count("nav").await.unwrap(), 0);
}

#[tokio::test]
async fn test_activation_trigger_respected() {
    let site = StaticSite::new(START, &sidebar_page("<p>Landing</p>"))
        .unwrap()
        .with_page("https://docs.example.com/docs/setup", &page("Setup", "<p>Install it</p>"));

    let setup = site.query_all("nav a").await.unwrap()[1];

    site.activate(setup).await.unwrap();
    assert_eq!(site.location().await.unwrap(), START);

    for event in InputEvent::POINTER_SEQUENCE {
        site.dispatch_input(setup, event).await.unwrap();
    }
    assert_eq!(site.location().await.unwrap(), START);

    site.dispatch_input(setup, InputEvent::EnterKey).await.unwrap();
    assert_eq!(
        site.location().await.unwrap(),
        "https://docs.example.com/docs/setup"
    );

    let events: Vec<String> = site.activations().into_iter().map(|a| a.event).collect();
    assert_eq!(events.first().map(String::as_str), Some("click"));
    assert_eq!(events.last().map(String::as_str), Some("keydown"));
}

#[tokio::test]
async fn test_disclosure_toggle_reveals_target() {
    let html = "<html><body><nav>\
        <button aria-expanded=\"false\" aria-controls=\"billing\">Billing</button>\
        <ul id=\"billing\" hidden><li><a href=\"/docs/invoices\">List Invoices</a></li></ul>\
        <details><summary>More</summary><a href=\"/docs/more\">Extra</a></details>\
        </nav><main></main></body></html>";
    let site = StaticSite::new(START, html).unwrap();

    let link = site.first("#billing a").await.unwrap().unwrap();
    assert!(!site.is_visible(link).await.unwrap());

    let button = site.first("button").await.unwrap().unwrap();
    site.activate(button).await.unwrap();
    assert!(site.is_visible(link).await.unwrap());
    assert_eq!(
        site.describe(button).await.unwrap().attr("aria-expanded"),
        Some("true")
    );

    assert_eq!(site.count("details:not([open])").await.unwrap(), 1);
    let summary = site.first("summary").await.unwrap().unwrap();
    site.activate(summary).await.unwrap();
    assert_eq!(site.count("details[open]").await.unwrap(), 1);
}

#[tokio::test]
async fn test_popstate_routes_registered_page() {
    let site = StaticSite::new(START, &sidebar_page("<p>Landing</p>"))
        .unwrap()
        .with_page("https://docs.example.com/docs/intro", &page("Intro", "<p>Routed</p>"));

    site.set_location("/docs/intro", LocationNotice::PopState)
        .await
        .unwrap();
    let main = site.first("main").await.unwrap().unwrap();
    assert_eq!(site.text_of(main).await.unwrap(), "Routed");

    site.set_location("/docs/unknown", LocationNotice::Silent)
        .await
        .unwrap();
    assert_eq!(site.text_of(main).await.unwrap(), "Routed");
    assert_eq!(
        site.location().await.unwrap(),
        "https://docs.example.com/docs/unknown"
    );
}

#[tokio::test]
async fn test_queries_and_snapshot() {
    let html = "<html><body><main><h1>Title</h1><ul><li><a href=\"#x\">Deep</a></li></ul>\
        <p style=\"display:none\">Hidden</p></main></body></html>";
    let site = StaticSite::new(START, html).unwrap();

    let main = site.first("main").await.unwrap().unwrap();
    let anchor = site.first("a").await.unwrap().unwrap();

    assert_eq!(site.query_within(main, "li").await.unwrap().len(), 1);
    assert!(site.contains(main, anchor).await.unwrap());
    let tags = site.ancestor_tags(anchor).await.unwrap();
    assert_eq!(&tags[..3], ["li", "ul", "main"]);
    assert!(site.closest(anchor, "ul").await.unwrap().is_some());
    assert!(matches!(
        site.query_all("a[[").await,
        Err(BrowserError::InvalidSelector(_))
    ));

    let DomNode::Element(snapshot) = site.snapshot(main).await.unwrap() else {
        panic!("expected element snapshot");
    };
    assert_eq!(snapshot.tag, "main");
    let hidden = snapshot
        .children
        .iter()
        .find_map(|c| match c {
            DomNode::Element(e) if e.tag == "p" => Some(e.visible),
            _ => None,
        })
        .unwrap();
    assert!(!hidden);
}

#[tokio::test]
async fn test_frames_accessible_and_restricted() {
    let html = "<html><body><main>\
        <iframe srcdoc=\"<p>Inline frame</p>\"></iframe>\
        <iframe src=\"https://other.example.org/widget\"></iframe>\
        </main></body></html>";
    let site = StaticSite::new(START, html).unwrap();

    let frames = site.frames().await.unwrap();
    assert_eq!(frames.len(), 2);
    match &frames[0] {
        FrameContent::Accessible { body, .. } => {
            assert_eq!(body.text_content().trim(), "Inline frame");
        }
        other => panic!("expected accessible frame, got {other:?}"),
    }
    assert!(matches!(
        &frames[1],
        FrameContent::Restricted { src } if src == "https://other.example.org/widget"
    ));
}

#[tokio::test]
async fn test_scrolling() {
    let site = StaticSite::new(START, &sidebar_page("<p>Landing</p>")).unwrap();
    let metrics = site.scroll_metrics().await.unwrap();
    assert!(metrics.scroll_height > 0);

    site.scroll_to(300).await.unwrap();
    assert_eq!(site.scroll_position(), 300);
}
