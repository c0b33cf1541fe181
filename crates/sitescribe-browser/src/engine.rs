use crate::error::{BrowserError, Result};
use crate::page::ChromiumPage;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use futures_util::stream::StreamExt;
use sitescribe_core::BrowserConfig;
use tokio::task::JoinHandle;

/// Browser automation engine
pub struct BrowserEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    config: BrowserConfig,
}

impl BrowserEngine {
    /// Launch a browser with default settings
    pub async fn new() -> Result<Self> {
        Self::launch(&BrowserConfig::default()).await
    }

    /// Launch a browser with the given settings
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = ChromiumConfig::builder()
            .no_sandbox()
            .window_size(config.window_width, config.window_height);
        if !config.headless {
            builder = builder.with_head();
        }
        let chromium_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler event error: {}", e);
                }
            }
        });

        tracing::info!(
            "Browser launched (headless: {}, {}x{})",
            config.headless,
            config.window_width,
            config.window_height
        );

        Ok(Self {
            browser,
            handler,
            config: config.clone(),
        })
    }

    /// Open `url` in a new tab and wait for it to load
    pub async fn open(&self, url: &str) -> Result<ChromiumPage> {
        let timeout = std::time::Duration::from_secs(self.config.navigation_timeout_secs);
        let page = tokio::time::timeout(timeout, async {
            let page = self
                .browser
                .new_page(url)
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            Ok::<_, BrowserError>(page)
        })
        .await
        .map_err(|_| BrowserError::Timeout(format!("loading {url}")))??;

        tracing::debug!("Opened {}", url);
        Ok(ChromiumPage::new(page))
    }

    /// Close the browser and stop the event handler
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        self.handler.abort();
        Ok(())
    }
}
