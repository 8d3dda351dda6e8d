use crate::driver::{Driver, ElementState, SelectBy};
use crate::error::{BrowserError, Result};
use crate::script::{self, Probe};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::stream::StreamExt;
use harvest_locator::Locator;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Driver backed by a Chromium instance over the DevTools protocol.
///
/// Element queries run as page scripts that resolve the locator on every
/// call; results are decoded into typed values before they leave the driver.
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch Chromium with the given settings and open a blank tab.
    pub async fn launch(settings: &harvest_core::BrowserConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height);

        if !settings.headless {
            builder = builder.with_head();
        }

        if settings.no_sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = settings.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "browser handler stopped");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        info!(
            headless = settings.headless,
            width = settings.window_width,
            height = settings.window_height,
            "chromium launched"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    /// Close the browser and stop the event handler.
    pub async fn close(self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "chromium did not exit cleanly");
        }
        self.handler.abort();
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| BrowserError::Script(format!("unexpected script result: {e}")))
    }

    /// Run an element script; absence of the element is an error.
    async fn probe<T: DeserializeOwned>(&self, locator: &Locator, script: String) -> Result<Option<T>> {
        let probe: Probe<T> = self.eval(script).await?;
        if probe.found {
            Ok(probe.value)
        } else {
            Err(BrowserError::NoSuchElement {
                locator: locator.to_string(),
            })
        }
    }

    async fn act(&self, locator: &Locator, script: String) -> Result<()> {
        self.probe::<bool>(locator, script).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.page
            .reload()
            .await
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.eval(script::count(locator)).await
    }

    async fn element_state(&self, locator: &Locator) -> Result<Option<ElementState>> {
        let probe: Probe<ElementState> = self.eval(script::state(locator)).await?;
        Ok(if probe.found { probe.value } else { None })
    }

    async fn text(&self, locator: &Locator) -> Result<String> {
        Ok(self
            .probe::<String>(locator, script::text(locator))
            .await?
            .unwrap_or_default())
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        self.probe(locator, script::attribute(locator, name)).await
    }

    async fn inner_html(&self, locator: &Locator) -> Result<String> {
        Ok(self
            .probe::<String>(locator, script::inner_html(locator))
            .await?
            .unwrap_or_default())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.act(locator, script::click(locator)).await
    }

    async fn double_click(&self, locator: &Locator) -> Result<()> {
        self.act(locator, script::double_click(locator)).await
    }

    async fn clear(&self, locator: &Locator) -> Result<()> {
        self.act(locator, script::clear(locator)).await
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        self.act(locator, script::type_text(locator, text)).await
    }

    async fn send_enter(&self, locator: &Locator) -> Result<()> {
        self.act(locator, script::send_enter(locator)).await
    }

    async fn select(&self, locator: &Locator, by: &SelectBy) -> Result<()> {
        let script = match by {
            SelectBy::Value(value) => script::select_by_value(locator, value),
            SelectBy::Text(text) => script::select_by_text(locator, text),
            SelectBy::Index(index) => script::select_by_index(locator, *index),
        };

        match self.probe::<bool>(locator, script).await? {
            Some(true) => Ok(()),
            _ => Err(BrowserError::Interaction {
                locator: locator.to_string(),
                reason: format!("no option matching {by:?}"),
            }),
        }
    }

    async fn option_texts(&self, locator: &Locator) -> Result<Vec<String>> {
        Ok(self
            .probe::<Vec<String>>(locator, script::option_texts(locator))
            .await?
            .unwrap_or_default())
    }

    async fn selected_option_text(&self, locator: &Locator) -> Result<Option<String>> {
        self.probe(locator, script::selected_option_text(locator)).await
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()> {
        self.act(locator, script::scroll_into_view(locator)).await
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn window_count(&self) -> Result<usize> {
        let browser = self.browser.lock().await;
        let pages = browser
            .pages()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(pages.len())
    }

    async fn close_secondary_windows(&self) -> Result<()> {
        let browser = self.browser.lock().await;
        let pages = browser
            .pages()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        for page in pages {
            if page.target_id() != self.page.target_id() {
                debug!(target = ?page.target_id(), "closing secondary tab");
                page.close()
                    .await
                    .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
            }
        }
        Ok(())
    }
}
