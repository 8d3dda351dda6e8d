//! Explicit-wait element handles.
//!
//! An [`ElementHandle`] pairs one locator with a shared driver and a default
//! timeout. Handles are cheap values: every query resolves the locator
//! against the live page, so a handle survives re-renders of its element.
//!
//! Existence and visibility probes (`exists`, `is_visible`, `is_clickable`)
//! report `false` when their timeout runs out. Operations that state a
//! precondition (`wait_for_visible`, `wait_for_clickable`, `wait_and_click`,
//! `wait_for_disappear`) fail with [`BrowserError::Timeout`] instead. All
//! actions first wait for the element to be present.

use crate::driver::{Driver, ElementState, SelectBy};
use crate::error::{BrowserError, Result};
use crate::wait::{poll_until, DEFAULT_POLL_INTERVAL};
use harvest_locator::Locator;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One locator bound to a live browser session.
#[derive(Clone)]
pub struct ElementHandle {
    name: String,
    locator: Locator,
    driver: Arc<dyn Driver>,
    timeout: Duration,
    poll_interval: Duration,
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHandle")
            .field("name", &self.name)
            .field("locator", &self.locator)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ElementHandle {
    /// Bind a locator to a driver with a default timeout.
    pub fn new(
        name: impl Into<String>,
        locator: Locator,
        driver: Arc<dyn Driver>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            locator,
            driver,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Same element with a different default timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Same element with a different poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Handle for one row of a templated locator (`{0}` = `row`).
    #[must_use]
    pub fn specialize(&self, row: usize) -> Self {
        self.specialize_with(&[row])
    }

    /// Handle for one cell of a templated locator (`{0}` = `row`, `{1}` = `col`).
    #[must_use]
    pub fn specialize_cell(&self, row: usize, col: usize) -> Self {
        self.specialize_with(&[row, col])
    }

    /// Handle with every `{i}` placeholder replaced by `args[i]`.
    ///
    /// The receiver keeps its template.
    #[must_use]
    pub fn specialize_with(&self, args: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            locator: self.locator.specialize(args),
            driver: Arc::clone(&self.driver),
            timeout: self.timeout,
            poll_interval: self.poll_interval,
        }
    }

    /// One handle per element currently matching the locator, in document
    /// order. Re-resolved on every call.
    pub async fn get_elements(&self) -> Result<Vec<Self>> {
        let count = self.driver.count(&self.locator).await?;
        Ok((1..=count)
            .map(|position| Self {
                name: format!("{}[{position}]", self.name),
                locator: self.locator.nth(position),
                driver: Arc::clone(&self.driver),
                timeout: self.timeout,
                poll_interval: self.poll_interval,
            })
            .collect())
    }

    async fn poll_state<F>(&self, timeout: Duration, accept: F) -> Result<Option<ElementState>>
    where
        F: Fn(&ElementState) -> bool,
    {
        poll_until(timeout, self.poll_interval, || async {
            Ok::<_, BrowserError>(
                self.driver
                    .element_state(&self.locator)
                    .await?
                    .filter(|s| accept(s)),
            )
        })
        .await
    }

    fn timeout_error(&self, condition: &'static str, waited: Duration) -> BrowserError {
        BrowserError::Timeout {
            locator: format!("{} ({})", self.name, self.locator),
            condition,
            waited,
        }
    }

    async fn require_present(&self) -> Result<ElementState> {
        self.poll_state(self.timeout, |_| true)
            .await?
            .ok_or_else(|| self.timeout_error("present", self.timeout))
    }

    /// Whether the element appears in the DOM within `timeout`.
    pub async fn exists(&self, timeout: Duration) -> Result<bool> {
        Ok(self.poll_state(timeout, |_| true).await?.is_some())
    }

    /// Whether the element is displayed within `timeout`.
    pub async fn is_visible(&self, timeout: Duration) -> Result<bool> {
        Ok(self.poll_state(timeout, |s| s.displayed).await?.is_some())
    }

    /// Whether the element is displayed and enabled within `timeout`.
    pub async fn is_clickable(&self, timeout: Duration) -> Result<bool> {
        Ok(self.poll_state(timeout, ElementState::clickable).await?.is_some())
    }

    pub async fn is_enabled(&self) -> Result<bool> {
        Ok(self.require_present().await?.enabled)
    }

    pub async fn is_selected(&self) -> Result<bool> {
        Ok(self.require_present().await?.selected)
    }

    pub async fn get_text(&self) -> Result<String> {
        self.require_present().await?;
        self.driver.text(&self.locator).await
    }

    pub async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        self.require_present().await?;
        self.driver.attribute(&self.locator, name).await
    }

    pub async fn inner_html(&self) -> Result<String> {
        self.require_present().await?;
        self.driver.inner_html(&self.locator).await
    }

    /// Number of elements matching the locator.
    ///
    /// Waits up to the handle's timeout for the first match and returns 0 if
    /// none appears.
    pub async fn get_size(&self) -> Result<usize> {
        if !self.exists(self.timeout).await? {
            debug!(element = %self.name, "no matches, size 0");
            return Ok(0);
        }
        self.driver.count(&self.locator).await
    }

    /// Wait until displayed, failing after `timeout`.
    pub async fn wait_for_visible(&self, timeout: Duration) -> Result<()> {
        debug!(element = %self.name, ?timeout, "waiting for visible");
        self.poll_state(timeout, |s| s.displayed)
            .await?
            .map(|_| ())
            .ok_or_else(|| self.timeout_error("visible", timeout))
    }

    /// Wait until displayed and enabled, failing after `timeout`.
    pub async fn wait_for_clickable(&self, timeout: Duration) -> Result<()> {
        debug!(element = %self.name, ?timeout, "waiting for clickable");
        self.poll_state(timeout, ElementState::clickable)
            .await?
            .map(|_| ())
            .ok_or_else(|| self.timeout_error("clickable", timeout))
    }

    /// Wait until clickable, then click.
    pub async fn wait_and_click(&self, timeout: Duration) -> Result<()> {
        self.wait_for_clickable(timeout).await?;
        debug!(element = %self.name, "click");
        self.driver.click(&self.locator).await
    }

    /// Wait until the element is gone or hidden, failing after `timeout`.
    pub async fn wait_for_disappear(&self, timeout: Duration) -> Result<()> {
        debug!(element = %self.name, ?timeout, "waiting for disappear");
        let gone = poll_until(timeout, self.poll_interval, || async {
            let state = self.driver.element_state(&self.locator).await?;
            Ok::<_, BrowserError>(match state {
                Some(s) if s.displayed => None,
                _ => Some(()),
            })
        })
        .await?;
        gone.ok_or_else(|| self.timeout_error("gone", timeout))
    }

    pub async fn click(&self) -> Result<()> {
        self.require_present().await?;
        debug!(element = %self.name, "click");
        self.driver.click(&self.locator).await
    }

    /// Click through a page script, bypassing overlays.
    pub async fn js_click(&self) -> Result<()> {
        self.require_present().await?;
        debug!(element = %self.name, "script click");
        self.driver.js_click(&self.locator).await
    }

    pub async fn double_click(&self) -> Result<()> {
        self.require_present().await?;
        debug!(element = %self.name, "double click");
        self.driver.double_click(&self.locator).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.require_present().await?;
        self.driver.clear(&self.locator).await
    }

    /// Replace the input's value.
    pub async fn set_text(&self, text: &str) -> Result<()> {
        self.require_present().await?;
        debug!(element = %self.name, "set text");
        self.driver.clear(&self.locator).await?;
        self.driver.type_text(&self.locator, text).await
    }

    /// Append to the input's value.
    pub async fn set_text_without_clear(&self, text: &str) -> Result<()> {
        self.require_present().await?;
        self.driver.type_text(&self.locator, text).await
    }

    pub async fn send_enter(&self) -> Result<()> {
        self.require_present().await?;
        self.driver.send_enter(&self.locator).await
    }

    pub async fn select_by_value(&self, value: &str) -> Result<()> {
        self.select(SelectBy::Value(value.to_string())).await
    }

    pub async fn select_by_text(&self, text: &str) -> Result<()> {
        self.select(SelectBy::Text(text.to_string())).await
    }

    pub async fn select_by_index(&self, index: usize) -> Result<()> {
        self.select(SelectBy::Index(index)).await
    }

    async fn select(&self, by: SelectBy) -> Result<()> {
        self.require_present().await?;
        debug!(element = %self.name, option = ?by, "select");
        self.driver.select(&self.locator, &by).await
    }

    /// Text of the first selected option.
    pub async fn selected_option_text(&self) -> Result<Option<String>> {
        self.require_present().await?;
        self.driver.selected_option_text(&self.locator).await
    }

    /// Whether the `<select>` offers an option with this text.
    pub async fn has_option(&self, text: &str) -> Result<bool> {
        self.require_present().await?;
        let options = self.driver.option_texts(&self.locator).await?;
        Ok(options.iter().any(|o| o.trim() == text.trim()))
    }

    /// Click only if not already checked.
    pub async fn check(&self) -> Result<()> {
        self.set_checked(true).await
    }

    /// Click only if currently checked.
    pub async fn uncheck(&self) -> Result<()> {
        self.set_checked(false).await
    }

    async fn set_checked(&self, target: bool) -> Result<()> {
        let state = self.require_present().await?;
        if state.selected == target {
            debug!(element = %self.name, checked = target, "already in target state");
            return Ok(());
        }
        debug!(element = %self.name, checked = target, "toggle");
        self.driver.click(&self.locator).await
    }

    pub async fn scroll_into_view(&self) -> Result<()> {
        self.require_present().await?;
        self.driver.scroll_into_view(&self.locator).await
    }
}
