use crate::error::Result;
use harvest_locator::Locator;
use serde::{Deserialize, Serialize};

/// Snapshot of the first element a locator resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Rendered with a non-empty box and not hidden by CSS
    pub displayed: bool,
    /// Not disabled
    pub enabled: bool,
    /// Checked checkbox/radio or selected option
    pub selected: bool,
}

impl ElementState {
    /// Visible and enabled.
    pub fn clickable(&self) -> bool {
        self.displayed && self.enabled
    }
}

/// How to pick an option in a `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectBy {
    /// Option `value` attribute
    Value(String),
    /// Visible option text
    Text(String),
    /// 0-based option index
    Index(usize),
}

/// Browser session boundary.
///
/// Every element operation receives the [`Locator`] to resolve at call time;
/// implementations never cache element references across calls, so handles
/// stay valid across DOM re-renders.
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    /// Navigate the active tab to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Reload the active tab
    async fn refresh(&self) -> Result<()>;

    /// URL of the active tab
    async fn current_url(&self) -> Result<String>;

    /// Number of elements matching the locator (ignores any pinned position)
    async fn count(&self, locator: &Locator) -> Result<usize>;

    /// State of the element, or `None` if nothing matches
    async fn element_state(&self, locator: &Locator) -> Result<Option<ElementState>>;

    /// Rendered text of the element
    async fn text(&self, locator: &Locator) -> Result<String>;

    /// Attribute value, `None` if the attribute is absent
    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    /// Inner HTML of the element
    async fn inner_html(&self, locator: &Locator) -> Result<String>;

    /// Click the element
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Click through a script call instead of a pointer event
    async fn js_click(&self, locator: &Locator) -> Result<()> {
        self.click(locator).await
    }

    /// Double-click the element
    async fn double_click(&self, locator: &Locator) -> Result<()>;

    /// Clear an input's value
    async fn clear(&self, locator: &Locator) -> Result<()>;

    /// Append text to an input's value
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Press Enter on the element
    async fn send_enter(&self, locator: &Locator) -> Result<()>;

    /// Choose an option in a `<select>`
    async fn select(&self, locator: &Locator, by: &SelectBy) -> Result<()>;

    /// Texts of all options in a `<select>`
    async fn option_texts(&self, locator: &Locator) -> Result<Vec<String>>;

    /// Text of the first selected option, `None` if nothing is selected
    async fn selected_option_text(&self, locator: &Locator) -> Result<Option<String>>;

    /// Scroll the element into the viewport
    async fn scroll_into_view(&self, locator: &Locator) -> Result<()>;

    /// Evaluate a script in the page and return its JSON result
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value>;

    /// PNG screenshot of the active tab
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Number of open tabs
    async fn window_count(&self) -> Result<usize>;

    /// Close every tab except the active one
    async fn close_secondary_windows(&self) -> Result<()>;
}
