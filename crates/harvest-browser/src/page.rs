//! Page models bound eagerly against a locator catalog.
//!
//! A page declares its slots as `(name, capability)` pairs. [`PageModel::bind`]
//! resolves every slot up front, so a manifest that drifted from the page
//! model fails at construction time with the offending slot's name instead of
//! at first use.

use crate::driver::Driver;
use crate::element::ElementHandle;
use crate::error::{BrowserError, Result};
use crate::script;
use crate::wait::{poll_until, DEFAULT_POLL_INTERVAL};
use harvest_locator::{LocatorCatalog, LocatorDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What a slot is used for, which constrains its locator template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCapability {
    /// A single element; no placeholders
    Element,
    /// A multi-match locator used for counting; no placeholders
    Collection,
    /// Templated by row (`{0}`)
    RowTemplate,
    /// Templated by row and column (`{0}`, `{1}`)
    GridTemplate,
}

impl SlotCapability {
    fn required_placeholders(self) -> &'static [usize] {
        match self {
            Self::Element | Self::Collection => &[],
            Self::RowTemplate => &[0],
            Self::GridTemplate => &[0, 1],
        }
    }
}

/// Declaration of one slot on a page model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: &'static str,
    pub capability: SlotCapability,
}

impl SlotSpec {
    pub const fn element(name: &'static str) -> Self {
        Self {
            name,
            capability: SlotCapability::Element,
        }
    }

    pub const fn collection(name: &'static str) -> Self {
        Self {
            name,
            capability: SlotCapability::Collection,
        }
    }

    pub const fn row(name: &'static str) -> Self {
        Self {
            name,
            capability: SlotCapability::RowTemplate,
        }
    }

    pub const fn grid(name: &'static str) -> Self {
        Self {
            name,
            capability: SlotCapability::GridTemplate,
        }
    }

    fn check(&self, definition: &LocatorDefinition) -> Result<()> {
        let found = definition.placeholders();
        let required = self.capability.required_placeholders();

        if let Some(missing) = required.iter().find(|i| !found.contains(i)) {
            return Err(BrowserError::Binding {
                slot: self.name.to_string(),
                reason: format!(
                    "{:?} slot needs placeholder {{{missing}}} in '{}'",
                    self.capability,
                    definition.value()
                ),
            });
        }

        if required.is_empty() && !found.is_empty() {
            return Err(BrowserError::Binding {
                slot: self.name.to_string(),
                reason: format!(
                    "{:?} slot must not be templated, got '{}'",
                    self.capability,
                    definition.value()
                ),
            });
        }

        Ok(())
    }
}

/// Handles produced by a successful bind, keyed by slot name.
#[derive(Debug)]
pub struct BoundSlots {
    handles: HashMap<&'static str, ElementHandle>,
}

impl BoundSlots {
    /// Move a handle out; each slot can be taken once.
    pub fn take(&mut self, name: &'static str) -> Result<ElementHandle> {
        self.handles.remove(name).ok_or_else(|| BrowserError::Binding {
            slot: name.to_string(),
            reason: "slot was not declared or already taken".to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Session-level operations shared by every page, plus slot binding.
#[derive(Clone)]
pub struct PageModel {
    driver: Arc<dyn Driver>,
    catalog: Arc<LocatorCatalog>,
    default_timeout: Duration,
    poll_interval: Duration,
}

impl PageModel {
    pub fn new(driver: Arc<dyn Driver>, catalog: Arc<LocatorCatalog>, default_timeout: Duration) -> Self {
        Self {
            driver,
            catalog,
            default_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn catalog(&self) -> &LocatorCatalog {
        &self.catalog
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Resolve every declared slot against the catalog.
    ///
    /// Fails on the first slot that is missing from the manifest, declared
    /// twice, or whose template does not fit its capability.
    pub fn bind(&self, slots: &[SlotSpec]) -> Result<BoundSlots> {
        let mut handles = HashMap::with_capacity(slots.len());

        for slot in slots {
            let definition = self.catalog.get(slot.name).map_err(|e| BrowserError::Binding {
                slot: slot.name.to_string(),
                reason: e.to_string(),
            })?;
            slot.check(definition)?;

            let handle = self.handle_for(definition);
            if handles.insert(slot.name, handle).is_some() {
                return Err(BrowserError::Binding {
                    slot: slot.name.to_string(),
                    reason: "declared more than once".to_string(),
                });
            }
        }

        info!(
            catalog = %self.catalog.name(),
            slots = handles.len(),
            "page model bound"
        );

        Ok(BoundSlots { handles })
    }

    fn handle_for(&self, definition: &LocatorDefinition) -> ElementHandle {
        ElementHandle::new(
            definition.name(),
            definition.locator(),
            Arc::clone(&self.driver),
            self.default_timeout,
        )
        .with_poll_interval(self.poll_interval)
    }

    /// Navigate to `url` and wait for the document to settle.
    pub async fn open(&self, url: &str) -> Result<()> {
        url::Url::parse(url).map_err(|e| BrowserError::NavigationError(format!("invalid URL {url}: {e}")))?;
        info!(url, "opening page");
        self.driver.navigate(url).await?;
        self.wait_for_ready(self.default_timeout).await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.driver.refresh().await?;
        self.wait_for_ready(self.default_timeout).await
    }

    pub async fn url(&self) -> Result<String> {
        self.driver.current_url().await
    }

    /// Scroll the window by a pixel offset.
    pub async fn scroll_window(&self, x: i64, y: i64) -> Result<()> {
        self.driver
            .execute_script(&format!("window.scrollBy({x}, {y}); true"))
            .await?;
        Ok(())
    }

    /// Wait for `document.readyState == "complete"` and no pending jQuery requests.
    pub async fn wait_for_ready(&self, timeout: Duration) -> Result<()> {
        debug!(?timeout, "waiting for document ready");
        self.wait_for_condition(script::DOCUMENT_READY, "document ready", timeout)
            .await?;
        self.wait_for_ajax(timeout).await
    }

    /// Wait until no jQuery requests are in flight.
    pub async fn wait_for_ajax(&self, timeout: Duration) -> Result<()> {
        self.wait_for_condition(script::AJAX_IDLE, "ajax idle", timeout)
            .await
    }

    async fn wait_for_condition(&self, condition: &str, label: &'static str, timeout: Duration) -> Result<()> {
        let met = poll_until(timeout, self.poll_interval, || async {
            let value = self.driver.execute_script(condition).await?;
            let met: bool = serde_json::from_value(value)
                .map_err(|e| BrowserError::Script(format!("{label} check returned non-boolean: {e}")))?;
            Ok::<_, BrowserError>(met.then_some(()))
        })
        .await?;

        met.ok_or_else(|| BrowserError::Timeout {
            locator: "document".to_string(),
            condition: label,
            waited: timeout,
        })
    }

    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.driver.screenshot().await
    }

    pub async fn window_count(&self) -> Result<usize> {
        self.driver.window_count().await
    }

    /// Close every tab except the one the page model drives.
    pub async fn close_secondary_windows(&self) -> Result<()> {
        self.driver.close_secondary_windows().await
    }
}
