use super::{raw_links, DiscoveryContext, NavigableItem};
use crate::classifier::is_valid_documentation_link;
use crate::error::Result;
use crate::expansion::DisclosureSignatures;
use std::collections::HashSet;

/// Expand everything, then sweep every link, starting with the profile's best
/// API endpoint selector. One item per title.
pub(super) async fn discover(ctx: &DiscoveryContext<'_>) -> Result<Vec<NavigableItem>> {
    ctx.expand(&DisclosureSignatures::standard()).await?;

    let mut selectors = Vec::new();
    if let Some(endpoints) = ctx.profile.special_selectors.get("api_endpoints") {
        selectors.push(endpoints.selector.as_str());
    }
    selectors.push("a");

    let link_ctx = ctx.link_context().await?;
    let location = ctx.env.location().await?;
    let mut seen_titles = HashSet::new();
    let mut items = Vec::new();

    for selector in selectors {
        for link in raw_links(ctx.env, selector, None).await? {
            if !is_valid_documentation_link(&link.href, &link.text, &link_ctx) {
                continue;
            }
            if seen_titles.insert(link.text.clone()) {
                items.push(link.into_item(&location));
            }
        }
    }
    Ok(items)
}
