use super::{ranked_documentation_links, DiscoveryContext, NavigableItem};
use crate::error::Result;
use crate::expansion::DisclosureSignatures;

/// Expand everything, then take level-ranked documentation links. Navigation
/// itself copes with client-side routing.
pub(super) async fn discover(ctx: &DiscoveryContext<'_>) -> Result<Vec<NavigableItem>> {
    ctx.expand(&DisclosureSignatures::standard()).await?;
    let links = ranked_documentation_links(ctx).await?;
    Ok(links.into_iter().map(|link| link.item).collect())
}
