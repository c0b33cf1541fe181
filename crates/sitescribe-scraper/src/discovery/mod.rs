//! Page discovery strategies.
//!
//! A [`DiscoveryStrategy`] is chosen once from the site profile and produces
//! the ordered list of pages to visit. Every strategy opens collapsed
//! navigation first and filters candidates through the link classifier.
//! [`LegacyDiscovery`] is the strategy-agnostic fallback when the chosen
//! strategy finds nothing.

mod api_reference;
mod comprehensive;
mod legacy;
mod sidebar;
mod site_specific;
mod spa;

pub use legacy::{ranked_documentation_links, LegacyDiscovery};

use crate::classifier::{importance_score, LinkContext};
use crate::dedup::normalize_url;
use crate::error::Result;
use crate::expansion::{DisclosureSignatures, ExpansionEngine, ExpansionSummary};
use crate::progress::ProgressSink;
use sitescribe_browser::{resolve_url, ElementHandle, PageEnvironment};
use sitescribe_core::{
    ContentPattern, ExpandableSummary, LimitsConfig, NavigationStyle, SiteProfile, TimingConfig,
};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use tokio::sync::Mutex;

/// A page to visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigableItem {
    /// Visible label of the navigation control
    pub title: String,
    /// Absolute target location
    pub url: String,
    /// Raw `href` as written in the page
    pub href: String,
    /// Control that leads to the page; valid only until the page changes
    pub element: Option<ElementHandle>,
}

impl NavigableItem {
    /// Item with no element; navigation goes through the location.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            href: href.into(),
            element: None,
        }
    }

    /// Attach the control that leads to the page.
    #[must_use]
    pub fn with_element(mut self, element: ElementHandle) -> Self {
        self.element = Some(element);
        self
    }
}

/// A navigable item with where it was found and how deep it sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// The page to visit
    pub item: NavigableItem,
    /// Selector that matched the link
    pub selector: String,
    /// 0 for top-level links up to 3 for deep endpoints
    pub nesting_level: u8,
}

/// Everything a strategy needs: the page, the profile and a shared expansion
/// engine so repeated passes only open what is new.
pub struct DiscoveryContext<'a> {
    /// Page being discovered
    pub env: &'a dyn PageEnvironment,
    /// Receives expansion and discovery progress
    pub sink: &'a dyn ProgressSink,
    /// Analyzer output for the start page
    pub profile: &'a SiteProfile,
    /// Settle and activation waits
    pub timing: &'a TimingConfig,
    expansion: Mutex<ExpansionEngine<'a>>,
}

impl<'a> DiscoveryContext<'a> {
    /// Context whose expansion engine starts with nothing activated.
    pub fn new(
        env: &'a dyn PageEnvironment,
        sink: &'a dyn ProgressSink,
        profile: &'a SiteProfile,
        limits: &LimitsConfig,
        timing: &'a TimingConfig,
    ) -> Self {
        Self {
            env,
            sink,
            profile,
            timing,
            expansion: Mutex::new(ExpansionEngine::new(env, sink, limits, timing)),
        }
    }

    /// Run one expansion pass with `signatures`.
    pub async fn expand(&self, signatures: &DisclosureSignatures) -> Result<ExpansionSummary> {
        self.expansion.lock().await.expand(signatures).await
    }

    /// Re-activate controls the analyzer recorded.
    pub async fn expand_recorded(&self, recorded: &[ExpandableSummary]) -> Result<u32> {
        self.expansion.lock().await.expand_recorded(recorded).await
    }

    /// Controls opened by every pass so far.
    pub async fn expanded_count(&self) -> u32 {
        self.expansion.lock().await.total_activated()
    }

    /// Link context for the current location.
    pub async fn link_context(&self) -> Result<LinkContext> {
        Ok(LinkContext::from_location(&self.env.location().await?))
    }

    /// Give revealed content time to render.
    pub async fn settle(&self) {
        tokio::time::sleep(TimingConfig::ms(self.timing.discovery_settle_ms)).await;
    }
}

/// A link's element, label and raw `href`.
#[derive(Debug, Clone)]
pub(crate) struct RawLink {
    pub element: ElementHandle,
    pub text: String,
    pub href: String,
}

impl RawLink {
    fn into_item(self, location: &str) -> NavigableItem {
        let url = resolve_url(location, &self.href);
        NavigableItem::new(self.text, url, self.href).with_element(self.element)
    }
}

/// Links matching `selector`, globally or inside `scope`. Elements that vanish
/// while being read are skipped.
pub(crate) async fn raw_links(
    env: &dyn PageEnvironment,
    selector: &str,
    scope: Option<ElementHandle>,
) -> Result<Vec<RawLink>> {
    let elements = match scope {
        Some(scope) => env.query_within(scope, selector).await?,
        None => env.query_all(selector).await?,
    };

    let mut links = Vec::with_capacity(elements.len());
    for element in elements {
        match env.describe(element).await {
            Ok(info) => links.push(RawLink {
                element,
                href: info.attr("href").unwrap_or_default().trim().to_string(),
                text: info.text,
            }),
            Err(e) if e.is_transient() => {
                tracing::debug!("Link {} vanished while reading: {}", element, e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(links)
}

/// Drop repeated locations, then order by importance. Ties keep page order.
#[must_use]
pub fn finalize(items: Vec<NavigableItem>) -> Vec<NavigableItem> {
    let mut seen = HashSet::new();
    let mut unique: Vec<NavigableItem> = items
        .into_iter()
        .filter(|item| seen.insert(normalize_url(&item.url)))
        .collect();
    unique.sort_by_key(|item| Reverse(importance_score(&item.title, &item.href)));
    unique
}

/// How pages are found on a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    /// Open the sidebar's disclosure controls and take its links
    ExpandableSidebar,
    /// Collect API and reference links
    ApiReference,
    /// Level-ranked links from a client-routed app
    SinglePageApp,
    /// Every valid documentation link on the page
    Comprehensive,
    /// Endpoint links on a known API reference site
    SiteSpecific,
}

impl DiscoveryStrategy {
    /// First matching rule wins.
    #[must_use]
    pub fn select(profile: &SiteProfile) -> Self {
        if profile.site_type.is_known_site() {
            Self::SiteSpecific
        } else if profile.navigation_style == NavigationStyle::SidebarExpandable {
            Self::ExpandableSidebar
        } else if profile.content_pattern == ContentPattern::ApiReference {
            Self::ApiReference
        } else if profile.content_pattern == ContentPattern::SinglePageApp {
            Self::SinglePageApp
        } else {
            Self::Comprehensive
        }
    }

    /// Name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ExpandableSidebar => "expandable-sidebar",
            Self::ApiReference => "api-reference",
            Self::SinglePageApp => "single-page-app",
            Self::Comprehensive => "comprehensive",
            Self::SiteSpecific => "site-specific",
        }
    }

    /// Expand and collect the pages this strategy finds.
    pub async fn discover(self, ctx: &DiscoveryContext<'_>) -> Result<Vec<NavigableItem>> {
        tracing::info!("Discovering pages with the {} strategy", self.name());
        let items = match self {
            Self::ExpandableSidebar => sidebar::discover(ctx).await?,
            Self::ApiReference => api_reference::discover(ctx).await?,
            Self::SinglePageApp => spa::discover(ctx).await?,
            Self::Comprehensive => comprehensive::discover(ctx).await?,
            Self::SiteSpecific => site_specific::discover(ctx).await?,
        };
        let items = finalize(items);
        tracing::info!("{} strategy found {} pages", self.name(), items.len());
        Ok(items)
    }
}

impl fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
