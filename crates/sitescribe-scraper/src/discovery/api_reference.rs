use super::{raw_links, DiscoveryContext, NavigableItem};
use crate::classifier::LinkClassifier;
use crate::error::Result;
use crate::expansion::DisclosureSignatures;

const API_SELECTORS: [&str; 5] = [
    "a[href*=\"/api/\"]",
    "a[href*=\"/reference/\"]",
    "a[href*=\"/endpoint\"]",
    ".api-method a",
    ".endpoint a",
];

/// Expand everything, then collect API and reference links.
pub(super) async fn discover(ctx: &DiscoveryContext<'_>) -> Result<Vec<NavigableItem>> {
    ctx.expand(&DisclosureSignatures::standard()).await?;

    let classifier = LinkClassifier::new(ctx.link_context().await?);
    let location = ctx.env.location().await?;

    let mut items = Vec::new();
    for selector in API_SELECTORS {
        for link in raw_links(ctx.env, selector, None).await? {
            if link.href.is_empty() || link.text.is_empty() {
                continue;
            }
            if classifier.accepts(&link.text, &link.href) {
                items.push(link.into_item(&location));
            }
        }
    }
    Ok(items)
}
