//! Driving the page from one navigation item to the next.
//!
//! Sites route in many ways: plain links, client-side routers that only
//! listen to pointer events, keyboard handlers, listeners on an enclosing list
//! item, or nothing but `popstate`. The [`Navigator`] activates an item and
//! then walks a fixed chain of fallbacks until either the location or the main
//! content changes.

use crate::discovery::NavigableItem;
use crate::error::{Result, ScrapeError};
use crate::text::collapse_whitespace;
use sitescribe_browser::{
    strip_fragment, BrowserError, ElementHandle, InputEvent, LocationNotice, PageEnvironment,
};
use sitescribe_core::{LimitsConfig, TimingConfig};

/// Regions whose text identifies the currently displayed page, in order.
const MAIN_CONTENT_SELECTORS: [&str; 6] = [
    "main",
    "[role=\"main\"]",
    ".main-content",
    ".content",
    ".docs-content",
    "#content",
];

/// Containers that sometimes own the click handler instead of the link.
const PARENT_ACTIVATION_SELECTOR: &str = "li, .nav-item, [role=\"menuitem\"]";

/// Elements that indicate content is still loading.
const LOADING_SELECTOR: &str = "[class*=\"loading\"], [class*=\"spinner\"], [id*=\"loading\"]";

/// Result of a successful navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The item points at the page already shown
    AlreadyPresent,
    /// The page changed in response to one of the tactics
    Navigated,
}

/// Element-level tactics tried after the primary activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    PointerSequence,
    Keyboard,
    ParentActivation,
}

impl Fallback {
    const CHAIN: [Self; 3] = [Self::PointerSequence, Self::Keyboard, Self::ParentActivation];
}

/// What the page looked like before the attempt.
#[derive(Debug, Clone)]
struct Baseline {
    location: String,
    content: String,
}

/// Which signals count as success while polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    LocationOrContent,
    ContentOnly,
}

/// Moves the page to a navigation item's target.
pub struct Navigator<'a> {
    env: &'a dyn PageEnvironment,
    limits: &'a LimitsConfig,
    timing: &'a TimingConfig,
}

impl<'a> Navigator<'a> {
    /// Navigator for `env` with the given poll counts and waits.
    pub fn new(
        env: &'a dyn PageEnvironment,
        limits: &'a LimitsConfig,
        timing: &'a TimingConfig,
    ) -> Self {
        Self { env, limits, timing }
    }

    /// Navigate to `item`, or fail with [`ScrapeError::NavigationTimeout`]
    /// once every tactic has been tried without a visible change.
    pub async fn navigate(&self, item: &NavigableItem) -> Result<NavigationOutcome> {
        let location = self.env.location().await?;
        if is_already_present(item, &location) {
            tracing::debug!("\"{}\" is already displayed", item.title);
            return Ok(NavigationOutcome::AlreadyPresent);
        }

        let baseline = Baseline {
            location,
            content: self.main_content().await?,
        };

        if let Some(element) = item.element {
            match self.activate_with_fallbacks(item, element, &baseline).await {
                Ok(true) => return Ok(NavigationOutcome::Navigated),
                Ok(false) => {}
                Err(e) if e.is_transient() => {
                    tracing::debug!(
                        "Control for \"{}\" is gone ({}); trying the location directly",
                        item.title,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if self.location_fallback(item, &baseline).await? {
            return Ok(NavigationOutcome::Navigated);
        }

        tracing::warn!("No navigation signal for \"{}\"", item.title);
        Err(ScrapeError::NavigationTimeout {
            title: item.title.clone(),
            attempts: self.total_attempts(),
        })
    }

    fn total_attempts(&self) -> u32 {
        // Primary activation, three element tactics, then the location tactics.
        self.limits.navigation_poll_attempts + self.limits.fallback_poll_attempts * 5
    }

    async fn activate_with_fallbacks(
        &self,
        item: &NavigableItem,
        element: ElementHandle,
        baseline: &Baseline,
    ) -> Result<bool> {
        self.env.scroll_into_view(element).await?;
        self.pause(self.timing.navigation_scroll_settle_ms).await;
        self.env.activate(element).await?;

        if self
            .poll(baseline, self.limits.navigation_poll_attempts, Signal::LocationOrContent)
            .await?
        {
            return Ok(true);
        }

        for fallback in Fallback::CHAIN {
            tracing::debug!("Trying {:?} for \"{}\"", fallback, item.title);
            self.apply(fallback, element).await?;
            if self
                .poll(baseline, self.limits.fallback_poll_attempts, Signal::LocationOrContent)
                .await?
            {
                tracing::debug!("{:?} navigated to \"{}\"", fallback, item.title);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn apply(&self, fallback: Fallback, element: ElementHandle) -> Result<()> {
        match fallback {
            Fallback::PointerSequence => {
                for event in InputEvent::POINTER_SEQUENCE {
                    self.env.dispatch_input(element, event).await?;
                    self.pause(self.timing.fallback_event_ms).await;
                }
            }
            Fallback::Keyboard => {
                self.env.dispatch_input(element, InputEvent::EnterKey).await?;
                self.pause(self.timing.fallback_event_ms).await;
                self.env.dispatch_input(element, InputEvent::SpaceKey).await?;
                self.pause(self.timing.fallback_pause_ms).await;
            }
            Fallback::ParentActivation => {
                if let Some(parent) = self.env.closest(element, PARENT_ACTIVATION_SELECTOR).await? {
                    if parent != element {
                        self.env.activate(parent).await?;
                        self.pause(self.timing.fallback_pause_ms).await;
                    }
                }
            }
        }
        Ok(())
    }

    /// Mutate the location directly. The change is self-inflicted, so only a
    /// content change counts.
    async fn location_fallback(&self, item: &NavigableItem, baseline: &Baseline) -> Result<bool> {
        for notice in location_notices(&item.href) {
            tracing::debug!("Setting location to {} with {:?}", item.url, notice);
            self.env.set_location(&item.url, notice).await?;
            self.pause(self.timing.location_settle_ms).await;
            if self
                .poll(baseline, self.limits.fallback_poll_attempts, Signal::ContentOnly)
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn poll(&self, baseline: &Baseline, attempts: u32, signal: Signal) -> Result<bool> {
        for attempt in 1..=attempts {
            self.pause(self.timing.navigation_poll_interval_ms).await;

            if signal == Signal::LocationOrContent && self.env.location().await? != baseline.location
            {
                tracing::debug!("Location changed after {} checks", attempt);
                return Ok(true);
            }

            let content = self.main_content().await?;
            if content_changed(&baseline.content, &content, self.limits.min_changed_content_chars) {
                tracing::debug!("Content changed after {} checks", attempt);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Normalized text of the main content region, or of the body.
    async fn main_content(&self) -> Result<String> {
        for selector in MAIN_CONTENT_SELECTORS.into_iter().chain(["body"]) {
            let Some(region) = self.env.first(selector).await? else {
                continue;
            };
            match self.env.snapshot(region).await {
                Ok(node) => return Ok(collapse_whitespace(&node.text_content())),
                Err(BrowserError::StaleElement(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(String::new())
    }

    async fn pause(&self, ms: u64) {
        tokio::time::sleep(TimingConfig::ms(ms)).await;
    }

    /// Wait for late content and trigger lazy loading before extraction.
    pub async fn settle_dynamic_content(&self) -> Result<()> {
        let initial = self.env.scroll_metrics().await?.scroll_height;
        let mut waited = 0;

        while waited < self.timing.dynamic_max_wait_ms {
            self.pause(self.timing.dynamic_check_interval_ms).await;
            waited += self.timing.dynamic_check_interval_ms.max(1);

            if self.env.scroll_metrics().await?.scroll_height > initial {
                tracing::debug!("Document grew while waiting for dynamic content");
                self.pause(self.timing.dynamic_growth_settle_ms).await;
                break;
            }
            if self.env.count(LOADING_SELECTOR).await? == 0 {
                break;
            }
        }

        self.trigger_lazy_loading().await
    }

    async fn trigger_lazy_loading(&self) -> Result<()> {
        let metrics = self.env.scroll_metrics().await?;
        let step = (metrics.viewport_height / 2).max(1);

        let mut position = 0;
        while position < metrics.scroll_height {
            self.env.scroll_to(position).await?;
            self.pause(self.timing.lazy_scroll_step_ms).await;
            position += step;
        }

        self.env.scroll_to(0).await?;
        self.pause(self.timing.lazy_scroll_return_ms).await;
        Ok(())
    }
}

/// The item's target is the page being shown.
#[must_use]
pub fn is_already_present(item: &NavigableItem, location: &str) -> bool {
    let href = item.href.trim();
    if href.is_empty() || href == "#" {
        return true;
    }
    if strip_fragment(&item.url) == strip_fragment(location) && !href.starts_with('#') {
        return true;
    }
    url::Url::parse(location).is_ok_and(|current| current.path() == href)
}

/// Direct location tactics for an `href`: a routed change, then a full load
/// for anything that is not a bare fragment.
fn location_notices(href: &str) -> Vec<LocationNotice> {
    let href = href.trim();
    if href.starts_with('#') {
        vec![LocationNotice::HashChange]
    } else if href.starts_with('/') || href.starts_with("http") {
        vec![LocationNotice::PopState, LocationNotice::Load]
    } else {
        Vec::new()
    }
}

fn content_changed(before: &str, after: &str, min_chars: usize) -> bool {
    after.chars().count() > min_chars && after != before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, href: &str) -> NavigableItem {
        NavigableItem::new("Item", url, href)
    }

    #[test]
    fn test_already_present() {
        let here = "https://docs.example.com/guide#intro";
        assert!(is_already_present(&item("https://docs.example.com/guide", "/guide"), here));
        assert!(is_already_present(&item("https://docs.example.com/x", ""), here));
        assert!(is_already_present(&item("https://docs.example.com/x", "#"), here));
        assert!(!is_already_present(
            &item("https://docs.example.com/api", "/api"),
            here
        ));
    }

    #[test]
    fn test_fragment_items_are_not_present() {
        let here = "https://docs.example.com/guide";
        assert!(!is_already_present(
            &item("https://docs.example.com/guide#get-usage", "#get-usage"),
            here
        ));
    }

    #[test]
    fn test_location_notices() {
        assert_eq!(location_notices("#billing"), [LocationNotice::HashChange]);
        assert_eq!(
            location_notices("/reference/get-invoice"),
            [LocationNotice::PopState, LocationNotice::Load]
        );
        assert!(location_notices("javascript:void(0)").is_empty());
    }

    #[test]
    fn test_content_change_requires_substance() {
        let long = "x".repeat(101);
        assert!(content_changed("before", &long, 100));
        assert!(!content_changed(&long, &long, 100));
        assert!(!content_changed("before", &"x".repeat(100), 100));
        assert!(content_changed("before", "after", 3));
    }
}
