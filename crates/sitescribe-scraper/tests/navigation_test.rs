use sitescribe_browser::{PageEnvironment, Routing, StaticSite};
use sitescribe_core::{LimitsConfig, SiteProfile, TimingConfig};
use sitescribe_scraper::{
    discovery::ranked_documentation_links, DiscoveryContext, LegacyDiscovery, NavigableItem,
    NavigationOutcome, Navigator, NullSink, ScrapeError,
};

const START: &str = "https://docs.example.com/docs";

fn filler(topic: &str) -> String {
    format!(
        "{topic} walks through every field of the object, the validation rules and the \
         errors returned when a request is rejected."
    )
}

fn page(title: &str) -> String {
    format!(
        "<html><head><title>{title}</title></head><body><main><h1>{title}</h1><p>{}</p>\
         </main></body></html>",
        filler(title)
    )
}

fn landing(nav: &str) -> String {
    format!(
        "<html><head><title>Docs</title></head><body>{nav}<main><p>{}</p></main></body></html>",
        filler("The overview")
    )
}

async fn item_for(site: &StaticSite, index: usize) -> NavigableItem {
    let link = site.query_all("nav a").await.unwrap()[index];
    let info = site.describe(link).await.unwrap();
    let href = info.attr("href").unwrap().to_string();
    NavigableItem::new(info.text, format!("https://docs.example.com{href}"), href)
        .with_element(link)
}

#[tokio::test]
async fn test_keyboard_fallback_navigates() {
    let site = StaticSite::new(
        START,
        &landing(
            "<nav><ul><li><a href=\"/docs/setup\" data-activation=\"keydown\">Setup Guide</a>\
             </li></ul></nav>",
        ),
    )
    .unwrap()
    .with_page("https://docs.example.com/docs/setup", &page("Setup Guide"));
    let limits = LimitsConfig::default();
    let timing = TimingConfig::instant();

    let item = item_for(&site, 0).await;
    let outcome = Navigator::new(&site, &limits, &timing)
        .navigate(&item)
        .await
        .unwrap();

    assert_eq!(outcome, NavigationOutcome::Navigated);
    assert_eq!(
        site.location().await.unwrap(),
        "https://docs.example.com/docs/setup"
    );
    let events: Vec<String> = site.activations().into_iter().map(|a| a.event).collect();
    assert_eq!(events.first().map(String::as_str), Some("click"));
    assert!(events.iter().any(|event| event == "keydown"));
}

#[tokio::test]
async fn test_stale_control_uses_location() {
    let site = StaticSite::new(
        START,
        &landing(
            "<nav><ul><li><a href=\"/docs/intro\">Introduction</a></li>\
             <li><a href=\"/docs/limits\">Rate Limits</a></li></ul></nav>",
        ),
    )
    .unwrap()
    .with_page("https://docs.example.com/docs/intro", &page("Introduction"))
    .with_page("https://docs.example.com/docs/limits", &page("Rate Limits"))
    .with_routing(Routing::FullReload);
    let limits = LimitsConfig::default();
    let timing = TimingConfig::instant();
    let navigator = Navigator::new(&site, &limits, &timing);

    let first = item_for(&site, 0).await;
    let second = item_for(&site, 1).await;

    assert_eq!(navigator.navigate(&first).await.unwrap(), NavigationOutcome::Navigated);
    // The reload invalidated the second handle
    assert_eq!(navigator.navigate(&second).await.unwrap(), NavigationOutcome::Navigated);
    assert_eq!(
        site.location().await.unwrap(),
        "https://docs.example.com/docs/limits"
    );
    assert!(site
        .activations()
        .iter()
        .all(|activation| activation.text != "Rate Limits"));
}

#[tokio::test]
async fn test_unresponsive_item_times_out() {
    let site = StaticSite::new(
        START,
        &landing(
            "<nav><ul><li><a href=\"/docs/beta\" data-activation=\"none\">Beta Features</a>\
             </li></ul></nav>",
        ),
    )
    .unwrap();
    let limits = LimitsConfig::default();
    let timing = TimingConfig::instant();

    let item = item_for(&site, 0).await;
    let err = Navigator::new(&site, &limits, &timing)
        .navigate(&item)
        .await
        .unwrap_err();

    match err {
        ScrapeError::NavigationTimeout { title, attempts } => {
            assert_eq!(title, "Beta Features");
            assert_eq!(
                attempts,
                limits.navigation_poll_attempts + limits.fallback_poll_attempts * 5
            );
        }
        other => panic!("expected a navigation timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_current_page_is_already_present() {
    let site = StaticSite::new(START, &landing("<nav></nav>")).unwrap();
    let limits = LimitsConfig::default();
    let timing = TimingConfig::instant();

    let item = NavigableItem::new("Docs", START, "/docs");
    let outcome = Navigator::new(&site, &limits, &timing)
        .navigate(&item)
        .await
        .unwrap();
    assert_eq!(outcome, NavigationOutcome::AlreadyPresent);
    assert!(site.activations().is_empty());
}

async fn ranked_titles(html: &str) -> Vec<(String, u8)> {
    let site = StaticSite::new(START, html).unwrap();
    let profile = SiteProfile::default();
    let limits = LimitsConfig::default();
    let timing = TimingConfig::instant();
    let ctx = DiscoveryContext::new(&site, &NullSink, &profile, &limits, &timing);

    ranked_documentation_links(&ctx)
        .await
        .unwrap()
        .into_iter()
        .map(|link| (link.item.title, link.nesting_level))
        .collect()
}

#[tokio::test]
async fn test_deep_links_ranked_before_sections() {
    // The endpoint matches three selectors: aside, ul ul and li li
    let html = landing(
        "<aside><ul>\
         <li><a href=\"/docs/overview-page\">Overview Page</a>\
         <ul><li><a href=\"/reference/get-invoice\">Get Invoice</a></li></ul></li>\
         </ul></aside>",
    );
    let site = StaticSite::new(START, &html).unwrap();
    let profile = SiteProfile::default();
    let limits = LimitsConfig::default();
    let timing = TimingConfig::instant();
    let ctx = DiscoveryContext::new(&site, &NullSink, &profile, &limits, &timing);

    let links = ranked_documentation_links(&ctx).await.unwrap();
    let titles: Vec<&str> = links.iter().map(|link| link.item.title.as_str()).collect();
    assert_eq!(titles, ["Get Invoice", "Overview Page"]);
    assert_eq!(links[0].nesting_level, 2);
    assert_eq!(links[1].nesting_level, 1);
    assert_eq!(links[0].item.url, "https://docs.example.com/reference/get-invoice");
}

#[tokio::test]
async fn test_deep_link_matches_count_before_dedup() {
    // Inside .sidebar the endpoint matches five selectors, enough to drop
    // section links even though it is a single URL
    let html = landing(
        "<div class=\"sidebar\"><ul>\
         <li><a href=\"/docs/overview-page\">Overview Page</a>\
         <ul><li><a href=\"/reference/get-invoice\">Get Invoice</a></li></ul></li>\
         </ul></div>",
    );
    assert_eq!(ranked_titles(&html).await, [("Get Invoice".to_string(), 2)]);
}

#[tokio::test]
async fn test_text_items_when_no_links_qualify() {
    let html = landing("<div class=\"sidebar\"><div>Get Usage</div><div>Billing</div></div>");
    let site = StaticSite::new(START, &html).unwrap();
    let profile = SiteProfile::default();
    let limits = LimitsConfig::default();
    let timing = TimingConfig::instant();
    let ctx = DiscoveryContext::new(&site, &NullSink, &profile, &limits, &timing);

    let items = LegacyDiscovery::discover(&ctx).await.unwrap();
    let hrefs: Vec<&str> = items.iter().map(|item| item.href.as_str()).collect();
    assert_eq!(hrefs, ["#get-usage", "#billing"]);
    assert_eq!(items[0].title, "Get Usage");
    assert_eq!(items[0].url, "https://docs.example.com/docs#get-usage");
    assert!(items.iter().all(|item| item.element.is_some()));
}
