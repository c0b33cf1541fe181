use super::{raw_links, DiscoveredLink, DiscoveryContext, NavigableItem, RawLink};
use crate::classifier::{
    is_documentation_link, is_meaningful_link, nesting_level, LinkContext, NestingSignals,
};
use crate::dedup::normalize_url;
use crate::error::Result;
use crate::expansion::DisclosureSignatures;
use once_cell::sync::Lazy;
use regex::Regex;
use sitescribe_browser::{strip_fragment, PageEnvironment};
use sitescribe_core::{ActionType, DetailedProgress};
use std::collections::HashSet;

const ENDPOINT_SELECTORS: [&str; 17] = [
    "nav a[href]",
    ".sidebar a[href]",
    "aside a[href]",
    "ul ul a[href]",
    "li li a[href]",
    ".sidebar ul li a[href]",
    "nav ul li a[href]",
    "[aria-expanded=\"true\"] + * a[href]",
    "[aria-expanded=\"true\"] ~ * a[href]",
    ".nav-item a[href]",
    ".docs-nav a[href]",
    ".menu-item a[href]",
    "[class*=\"sidebar\"] a[href]",
    "[class*=\"nav\"] a[href]",
    "[class*=\"endpoint\"] a[href]",
    "[class*=\"api\"] a[href]",
    "[class*=\"method\"] a[href]",
];

const TEXT_ITEM_SELECTORS: [&str; 6] = [
    "[class*=\"nav\"] [class*=\"item\"]",
    "[class*=\"menu\"] [class*=\"item\"]",
    "[class*=\"sidebar\"] div",
    "li",
    "[role=\"menuitem\"]",
    "[data-testid*=\"nav\"]",
];

/// Below this many deep links, section-level links are visited too.
const MIN_DEEP_LINKS: usize = 5;

const TEXT_ITEM_MARKERS: [&str; 6] = ["API", "Get ", "Create ", "Update ", "Delete ", "List "];

static CAPITALIZED_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z\s]+$").expect("valid label regex"));
static SLUG_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid slug regex"));

/// Fallback when the selected strategy finds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyDiscovery;

impl LegacyDiscovery {
    /// Aggressive expansion, level-ranked documentation links, and text-only
    /// navigation items when no links qualify.
    pub async fn discover(ctx: &DiscoveryContext<'_>) -> Result<Vec<NavigableItem>> {
        tracing::info!("Running legacy discovery");
        ctx.expand(&DisclosureSignatures::aggressive()).await?;
        ctx.settle().await;

        let mut items: Vec<NavigableItem> = ranked_documentation_links(ctx)
            .await?
            .into_iter()
            .map(|link| link.item)
            .collect();

        if items.is_empty() {
            items = text_navigation_items(ctx).await?;
            tracing::info!("Text-based discovery found {} items", items.len());
        }
        Ok(items)
    }
}

async fn nesting_signals(env: &dyn PageEnvironment, link: &RawLink) -> Result<NestingSignals> {
    let list_depth = env
        .ancestor_tags(link.element)
        .await?
        .iter()
        .filter(|tag| matches!(tag.as_str(), "ul" | "ol"))
        .count();

    Ok(NestingSignals {
        list_depth,
        in_expanded: env
            .closest(link.element, "[aria-expanded=\"true\"]")
            .await?
            .is_some(),
        in_nested_class: env
            .closest(
                link.element,
                "[class*=\"nested\"], [class*=\"sub\"], [class*=\"child\"]",
            )
            .await?
            .is_some(),
        in_deep_sidebar: env
            .closest(link.element, ".sidebar > div > div > div")
            .await?
            .is_some(),
    })
}

/// Documentation links ranked by nesting depth: endpoints (level 2 and 3)
/// first, section links (level 1) only when few endpoints were found, and
/// top-level links only when nothing else qualifies.
pub async fn ranked_documentation_links(ctx: &DiscoveryContext<'_>) -> Result<Vec<DiscoveredLink>> {
    let link_ctx: LinkContext = ctx.link_context().await?;
    let location = ctx.env.location().await?;

    let mut deep = Vec::new();
    let mut sections = Vec::new();
    let mut top = Vec::new();

    for selector in ENDPOINT_SELECTORS {
        for link in raw_links(ctx.env, selector, None).await? {
            if link.href.is_empty() || link.text.is_empty() {
                continue;
            }
            if !is_documentation_link(&link.href, &link_ctx.current_path)
                || !is_meaningful_link(&link.text, &link.href)
            {
                continue;
            }

            let signals = match nesting_signals(ctx.env, &link).await {
                Ok(signals) => signals,
                Err(e) if e.is_transient() => {
                    tracing::debug!("Link \"{}\" vanished: {}", link.text, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let level = nesting_level(&link.text, signals);
            let discovered = DiscoveredLink {
                item: link.into_item(&location),
                selector: selector.to_string(),
                nesting_level: level,
            };
            match level {
                2 | 3 => deep.push(discovered),
                1 => sections.push(discovered),
                _ => top.push(discovered),
            }
        }
    }

    tracing::debug!(
        "Link levels: {} deep, {} section, {} top",
        deep.len(),
        sections.len(),
        top.len()
    );

    let include_sections = deep.len() < MIN_DEEP_LINKS;
    let mut ranked = deep;
    if include_sections {
        ranked.extend(sections);
    }
    if ranked.is_empty() {
        ranked = top;
    }

    let mut seen = HashSet::new();
    ranked.retain(|link| seen.insert(normalize_url(&link.item.url)));

    ctx.sink.detail(
        DetailedProgress {
            found_links: u32::try_from(ranked.len()).ok(),
            ..DetailedProgress::action(
                if ranked.len() > 5 {
                    ActionType::Success
                } else {
                    ActionType::Warning
                },
                format!("Discovered {} documentation links", ranked.len()),
            )
        }
        .with_current(format!("Found {} documentation links", ranked.len())),
    );
    Ok(ranked)
}

/// Slug used for label-only navigation items.
#[must_use]
pub fn label_slug(text: &str) -> String {
    SLUG_SPACE.replace_all(&text.to_lowercase(), "-").into_owned()
}

fn is_text_item_label(text: &str) -> bool {
    let len = text.chars().count();
    len > 3
        && len < 50
        && (TEXT_ITEM_MARKERS.iter().any(|marker| text.contains(marker))
            || CAPITALIZED_LABEL.is_match(text))
}

/// Navigation entries rendered without an `href`, addressed as `#slug`.
async fn text_navigation_items(ctx: &DiscoveryContext<'_>) -> Result<Vec<NavigableItem>> {
    let location = ctx.env.location().await?;
    let base = strip_fragment(&location).to_string();
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for selector in TEXT_ITEM_SELECTORS {
        for element in ctx.env.query_all(selector).await? {
            let text = match ctx.env.text_of(element).await {
                Ok(text) => text,
                Err(e) if e.is_transient() => continue,
                Err(e) => return Err(e.into()),
            };
            if !is_text_item_label(&text) {
                continue;
            }
            let href = format!("#{}", label_slug(&text));
            if seen.insert(href.clone()) {
                items.push(
                    NavigableItem::new(text, format!("{base}{href}"), href).with_element(element),
                );
            }
        }
    }
    Ok(items)
}
