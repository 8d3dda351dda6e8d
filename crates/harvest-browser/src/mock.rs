//! Scriptable in-memory driver for tests.
//!
//! Elements are keyed by [`Locator::key`], so a test registers exactly the
//! specialized locator values the code under test will ask for. Clicks can
//! trigger reactions that mutate the DOM, which is how page transitions and
//! expanding panels are simulated.

use crate::driver::{Driver, ElementState, SelectBy};
use crate::error::{BrowserError, Result};
use harvest_locator::Locator;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// One fake element.
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Rendered text
    pub text: String,
    /// Input value
    pub value: String,
    /// Inner HTML; falls back to `text` when unset
    pub html: Option<String>,
    /// Visible
    pub displayed: bool,
    /// Not disabled
    pub enabled: bool,
    /// Checked/selected
    pub selected: bool,
    /// Clicking flips `selected`
    pub toggles: bool,
    /// Attribute values
    pub attributes: HashMap<String, String>,
    /// `<select>` options as (value, text)
    pub options: Vec<(String, String)>,
    /// Index of the selected option
    pub selected_option: Option<usize>,
}

impl MockElement {
    /// Visible, enabled element with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: String::new(),
            html: None,
            displayed: true,
            enabled: true,
            selected: false,
            toggles: false,
            attributes: HashMap::new(),
            options: Vec::new(),
            selected_option: None,
        }
    }

    /// Present in the DOM but not displayed.
    pub fn hidden() -> Self {
        Self {
            displayed: false,
            ..Self::new("")
        }
    }

    /// A checkbox in the given state.
    pub fn checkbox(checked: bool) -> Self {
        Self {
            selected: checked,
            toggles: true,
            ..Self::new("")
        }
    }

    /// A `<select>` with (value, text) options and nothing selected.
    pub fn select(options: &[(&str, &str)]) -> Self {
        Self {
            options: options
                .iter()
                .map(|(v, t)| ((*v).to_string(), (*t).to_string()))
                .collect(),
            ..Self::new("")
        }
    }

    /// Mark as disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set an attribute.
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

/// The fake document.
#[derive(Debug, Default)]
pub struct MockDom {
    elements: HashMap<String, MockElement>,
    counts: HashMap<String, usize>,
}

impl MockDom {
    /// Add or replace an element.
    pub fn insert(&mut self, key: impl Into<String>, element: MockElement) {
        self.elements.insert(key.into(), element);
    }

    /// Remove an element.
    pub fn remove(&mut self, key: &str) -> Option<MockElement> {
        self.elements.remove(key)
    }

    /// Mutable access to an existing element.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut MockElement> {
        self.elements.get_mut(key)
    }

    /// Replace an element's text, inserting a visible element if absent.
    pub fn set_text(&mut self, key: &str, text: &str) {
        self.elements
            .entry(key.to_string())
            .or_insert_with(|| MockElement::new(""))
            .text = text.to_string();
    }

    /// Fix the match count reported for a multi-match locator.
    pub fn set_count(&mut self, key: impl Into<String>, count: usize) {
        self.counts.insert(key.into(), count);
    }

    fn count(&self, key: &str) -> usize {
        match self.counts.get(key) {
            Some(count) => *count,
            None => usize::from(self.elements.contains_key(key)),
        }
    }
}

type Reaction = Box<dyn FnMut(&mut MockDom) + Send>;

#[derive(Default)]
struct MockState {
    dom: MockDom,
    reactions: HashMap<String, Vec<Reaction>>,
    failures: HashMap<String, usize>,
    clicks: Vec<String>,
    navigations: Vec<String>,
    scripts: Vec<String>,
    script_results: VecDeque<Value>,
    url: String,
    windows: usize,
}

/// In-memory [`Driver`].
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Empty document, one window.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                url: "about:blank".to_string(),
                windows: 1,
                ..MockState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread poisons the lock; the state is still usable
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add or replace an element.
    pub fn insert(&self, key: impl Into<String>, element: MockElement) {
        self.lock().dom.insert(key, element);
    }

    /// Fix the match count reported for a multi-match locator.
    pub fn set_count(&self, key: impl Into<String>, count: usize) {
        self.lock().dom.set_count(key, count);
    }

    /// Mutate the document directly.
    pub fn with_dom<R>(&self, f: impl FnOnce(&mut MockDom) -> R) -> R {
        f(&mut self.lock().dom)
    }

    /// Run `reaction` every time the element at `key` is clicked.
    pub fn on_click(&self, key: impl Into<String>, reaction: impl FnMut(&mut MockDom) + Send + 'static) {
        self.lock()
            .reactions
            .entry(key.into())
            .or_default()
            .push(Box::new(reaction));
    }

    /// Make the next `times` reads or clicks of `key` fail.
    pub fn fail_next(&self, key: impl Into<String>, times: usize) {
        self.lock().failures.insert(key.into(), times);
    }

    /// Queue a value for the next `execute_script` call.
    pub fn push_script_result(&self, value: Value) {
        self.lock().script_results.push_back(value);
    }

    /// Set the number of open windows.
    pub fn set_window_count(&self, windows: usize) {
        self.lock().windows = windows;
    }

    /// Keys of every clicked element, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    /// How many times `key` was clicked.
    pub fn click_count(&self, key: &str) -> usize {
        self.lock().clicks.iter().filter(|k| *k == key).count()
    }

    /// URLs navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Scripts passed to `execute_script`, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.lock().scripts.clone()
    }

    /// Current input value of `key`.
    pub fn value_of(&self, key: &str) -> Option<String> {
        self.lock().dom.elements.get(key).map(|e| e.value.clone())
    }

    /// Text of the selected option of `key`.
    pub fn selected_option_of(&self, key: &str) -> Option<String> {
        let state = self.lock();
        let element = state.dom.elements.get(key)?;
        element
            .selected_option
            .and_then(|i| element.options.get(i))
            .map(|(_, text)| text.clone())
    }

    /// Whether `key` is currently selected/checked.
    pub fn is_checked(&self, key: &str) -> bool {
        self.lock().dom.elements.get(key).is_some_and(|e| e.selected)
    }

    fn take_failure(state: &mut MockState, key: &str) -> Result<()> {
        if let Some(remaining) = state.failures.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrowserError::ChromiumError(format!("injected failure for {key}")));
            }
        }
        Ok(())
    }

    fn with_element<R>(
        &self,
        locator: &Locator,
        f: impl FnOnce(&mut MockElement) -> Result<R>,
    ) -> Result<R> {
        let key = locator.key();
        let mut state = self.lock();
        Self::take_failure(&mut state, &key)?;
        match state.dom.elements.get_mut(&key) {
            Some(element) => f(element),
            None => Err(BrowserError::NoSuchElement {
                locator: locator.to_string(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.lock();
        state.navigations.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        let mut state = self.lock();
        let url = state.url.clone();
        state.navigations.push(url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.lock().url.clone())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let key = Locator::new(locator.kind(), locator.value()).key();
        Ok(self.lock().dom.count(&key))
    }

    async fn element_state(&self, locator: &Locator) -> Result<Option<ElementState>> {
        let state = self.lock();
        let key = locator.key();
        let element = state.dom.elements.get(&key).map(|e| ElementState {
            displayed: e.displayed,
            enabled: e.enabled,
            selected: e.selected,
        });
        // A locator registered only by its match count resolves to a plain element
        Ok(element.or_else(|| {
            (state.dom.count(&key) > 0).then_some(ElementState {
                displayed: true,
                enabled: true,
                selected: false,
            })
        }))
    }

    async fn text(&self, locator: &Locator) -> Result<String> {
        self.with_element(locator, |e| Ok(e.text.clone()))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        self.with_element(locator, |e| Ok(e.attributes.get(name).cloned()))
    }

    async fn inner_html(&self, locator: &Locator) -> Result<String> {
        self.with_element(locator, |e| Ok(e.html.clone().unwrap_or_else(|| e.text.clone())))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.with_element(locator, |e| {
            if e.toggles {
                e.selected = !e.selected;
            }
            Ok(())
        })?;

        let key = locator.key();
        let mut state = self.lock();
        state.clicks.push(key.clone());
        let MockState { dom, reactions, .. } = &mut *state;
        if let Some(reactions) = reactions.get_mut(&key) {
            for reaction in reactions.iter_mut() {
                reaction(dom);
            }
        }
        Ok(())
    }

    async fn double_click(&self, locator: &Locator) -> Result<()> {
        self.click(locator).await?;
        self.click(locator).await
    }

    async fn clear(&self, locator: &Locator) -> Result<()> {
        self.with_element(locator, |e| {
            e.value.clear();
            Ok(())
        })
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        self.with_element(locator, |e| {
            e.value.push_str(text);
            Ok(())
        })
    }

    async fn send_enter(&self, locator: &Locator) -> Result<()> {
        self.with_element(locator, |_| Ok(()))
    }

    async fn select(&self, locator: &Locator, by: &SelectBy) -> Result<()> {
        let display = locator.to_string();
        self.with_element(locator, |e| {
            let index = match by {
                SelectBy::Value(value) => e.options.iter().position(|(v, _)| v == value),
                SelectBy::Text(text) => e.options.iter().position(|(_, t)| t.trim() == text.trim()),
                SelectBy::Index(index) => (*index < e.options.len()).then_some(*index),
            };
            match index {
                Some(i) => {
                    e.selected_option = Some(i);
                    Ok(())
                }
                None => Err(BrowserError::Interaction {
                    locator: display,
                    reason: format!("no option matching {by:?}"),
                }),
            }
        })
    }

    async fn option_texts(&self, locator: &Locator) -> Result<Vec<String>> {
        self.with_element(locator, |e| Ok(e.options.iter().map(|(_, t)| t.clone()).collect()))
    }

    async fn selected_option_text(&self, locator: &Locator) -> Result<Option<String>> {
        self.with_element(locator, |e| {
            Ok(e.selected_option
                .and_then(|i| e.options.get(i))
                .map(|(_, t)| t.clone()))
        })
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<()> {
        self.with_element(locator, |_| Ok(()))
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        let mut state = self.lock();
        state.scripts.push(script.to_string());
        Ok(state.script_results.pop_front().unwrap_or(Value::Bool(true)))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    async fn window_count(&self) -> Result<usize> {
        Ok(self.lock().windows)
    }

    async fn close_secondary_windows(&self) -> Result<()> {
        self.lock().windows = 1;
        Ok(())
    }
}
