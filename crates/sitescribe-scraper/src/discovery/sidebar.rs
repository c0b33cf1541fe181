use super::{comprehensive, raw_links, DiscoveryContext, NavigableItem};
use crate::classifier::is_valid_documentation_link;
use crate::error::Result;
use crate::expansion::DisclosureSignatures;

/// Open the controls recorded in the profile, then take the valid links of the
/// primary navigation area.
pub(super) async fn discover(ctx: &DiscoveryContext<'_>) -> Result<Vec<NavigableItem>> {
    let Some(area) = ctx.profile.primary_navigation() else {
        tracing::warn!("No primary navigation area; using the comprehensive strategy");
        return comprehensive::discover(ctx).await;
    };

    ctx.expand_recorded(&ctx.profile.expandable_elements).await?;
    ctx.expand(&DisclosureSignatures::standard()).await?;
    ctx.settle().await;

    let Some(nav) = ctx
        .env
        .query_all(&area.selector)
        .await?
        .get(area.index)
        .copied()
    else {
        tracing::warn!(
            "Navigation area {}[{}] is gone; using the comprehensive strategy",
            area.selector,
            area.index
        );
        return comprehensive::discover(ctx).await;
    };

    let link_ctx = ctx.link_context().await?;
    let location = ctx.env.location().await?;
    let items = raw_links(ctx.env, "a[href]", Some(nav))
        .await?
        .into_iter()
        .filter(|link| is_valid_documentation_link(&link.href, &link.text, &link_ctx))
        .map(|link| link.into_item(&location))
        .collect();
    Ok(items)
}
