use crate::dom::DomNode;
use crate::environment::{
    ElementHandle, ElementInfo, FrameContent, InputEvent, LocationNotice, PageEnvironment,
    RuntimeHints, ScrollMetrics,
};
use crate::error::{BrowserError, Result};
use crate::scripts;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Reply<T> {
    Ok { value: T },
    Stale,
    Invalid { message: String },
}

/// A browser tab driven through CDP.
#[derive(Debug, Clone)]
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Underlying chromiumoxide page.
    pub fn inner(&self) -> &Page {
        &self.page
    }

    async fn eval<T: DeserializeOwned>(&self, script: String, handle: Option<u64>) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        let reply: Reply<T> = result
            .into_value()
            .map_err(|e| BrowserError::Script(format!("unexpected script result: {e}")))?;

        match reply {
            Reply::Ok { value } => Ok(value),
            Reply::Stale => Err(BrowserError::StaleElement(handle.unwrap_or_default())),
            Reply::Invalid { message } => Err(BrowserError::InvalidSelector(message)),
        }
    }

    async fn handles(&self, script: String, handle: Option<u64>) -> Result<Vec<ElementHandle>> {
        let ids: Vec<u64> = self.eval(script, handle).await?;
        Ok(ids.into_iter().map(ElementHandle::new).collect())
    }
}

#[async_trait::async_trait]
impl PageEnvironment for ChromiumPage {
    async fn location(&self) -> Result<String> {
        self.eval(scripts::location(), None).await
    }

    async fn set_location(&self, url: &str, notice: LocationNotice) -> Result<()> {
        match notice {
            LocationNotice::Load => {
                self.page
                    .goto(url)
                    .await
                    .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
                self.page
                    .wait_for_navigation()
                    .await
                    .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
                Ok(())
            }
            LocationNotice::Silent => self.eval(scripts::push_location(url, None), None).await,
            LocationNotice::PopState => {
                self.eval(scripts::push_location(url, Some("popstate")), None)
                    .await
            }
            LocationNotice::HashChange => {
                self.eval(scripts::push_location(url, Some("hashchange")), None)
                    .await
            }
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        self.handles(scripts::query_all(selector), None).await
    }

    async fn query_within(
        &self,
        scope: ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>> {
        self.handles(scripts::query_within(scope.id(), selector), Some(scope.id()))
            .await
    }

    async fn closest(
        &self,
        element: ElementHandle,
        selector: &str,
    ) -> Result<Option<ElementHandle>> {
        let id: Option<u64> = self
            .eval(scripts::closest(element.id(), selector), Some(element.id()))
            .await?;
        Ok(id.map(ElementHandle::new))
    }

    async fn contains(&self, outer: ElementHandle, inner: ElementHandle) -> Result<bool> {
        self.eval(scripts::contains(outer.id(), inner.id()), Some(inner.id()))
            .await
    }

    async fn describe(&self, element: ElementHandle) -> Result<ElementInfo> {
        self.eval(scripts::describe(element.id()), Some(element.id()))
            .await
    }

    async fn inner_markup(&self, element: ElementHandle) -> Result<String> {
        self.eval(scripts::inner_markup(element.id()), Some(element.id()))
            .await
    }

    async fn ancestor_tags(&self, element: ElementHandle) -> Result<Vec<String>> {
        self.eval(scripts::ancestor_tags(element.id()), Some(element.id()))
            .await
    }

    async fn is_visible(&self, element: ElementHandle) -> Result<bool> {
        self.eval(scripts::is_visible(element.id()), Some(element.id()))
            .await
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<()> {
        self.eval(scripts::scroll_into_view(element.id()), Some(element.id()))
            .await
    }

    async fn activate(&self, element: ElementHandle) -> Result<()> {
        self.eval(scripts::activate(element.id()), Some(element.id()))
            .await
    }

    async fn dispatch_input(&self, element: ElementHandle, event: InputEvent) -> Result<()> {
        self.eval(
            scripts::dispatch_input(element.id(), event.event_type(), event.key()),
            Some(element.id()),
        )
        .await
    }

    async fn snapshot(&self, element: ElementHandle) -> Result<DomNode> {
        self.eval(scripts::snapshot(element.id()), Some(element.id()))
            .await
    }

    async fn frames(&self) -> Result<Vec<FrameContent>> {
        self.eval(scripts::frames(), None).await
    }

    async fn scroll_metrics(&self) -> Result<ScrollMetrics> {
        self.eval(scripts::scroll_metrics(), None).await
    }

    async fn scroll_to(&self, y: u64) -> Result<()> {
        self.eval(scripts::scroll_to(y), None).await
    }

    async fn runtime_hints(&self) -> Result<RuntimeHints> {
        self.eval(scripts::runtime_hints(), None).await
    }
}
