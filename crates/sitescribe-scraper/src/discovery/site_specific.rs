use super::{raw_links, DiscoveryContext, NavigableItem};
use crate::classifier::is_valid_endpoint;
use crate::dedup::{normalize_title, normalize_url};
use crate::error::Result;
use crate::expansion::DisclosureSignatures;
use sitescribe_core::{ActionType, DetailedProgress};
use std::collections::HashSet;

/// One expansion pass, then every reference link that names an endpoint.
pub(super) async fn discover(ctx: &DiscoveryContext<'_>) -> Result<Vec<NavigableItem>> {
    ctx.sink.detail(
        DetailedProgress::action(ActionType::Info, "Using the known-site strategy")
            .with_current("Known-site discovery starting"),
    );
    ctx.expand(&DisclosureSignatures::site_specific()).await?;
    ctx.settle().await;

    let location = ctx.env.location().await?;
    let mut seen_urls = HashSet::new();
    let mut seen_titles = HashSet::new();
    let mut items = Vec::new();

    for link in raw_links(ctx.env, "a[href*=\"/reference/\"]", None).await? {
        if link.href.is_empty() || link.text.is_empty() {
            continue;
        }
        if !is_valid_endpoint(&link.text, &link.href) {
            continue;
        }
        let item = link.into_item(&location);
        let url_key = normalize_url(&item.url);
        let title_key = normalize_title(&item.title);
        if seen_urls.contains(&url_key) || seen_titles.contains(&title_key) {
            continue;
        }
        seen_urls.insert(url_key);
        seen_titles.insert(title_key);
        items.push(item);
    }

    ctx.sink.detail(DetailedProgress::action(
        ActionType::Success,
        format!("Found {} endpoint pages", items.len()),
    ));
    Ok(items)
}
