//! In-page scripts used by the Chromium driver.
//!
//! Every element script resolves its locator afresh and returns
//! `{ "found": bool, "value": ... }` so absence is distinguishable from a
//! `null` value.

use harvest_locator::{Locator, LocatorKind};
use serde::Deserialize;
use serde_json::Value;

/// Decoded result of an element script.
#[derive(Debug, Deserialize)]
pub(crate) struct Probe<T> {
    pub found: bool,
    pub value: Option<T>,
}

/// JS string literal for `s`.
fn literal(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Expression evaluating to the array of elements matching `locator`.
fn resolve_all(locator: &Locator) -> String {
    let value = literal(locator.value());
    match locator.kind() {
        LocatorKind::Id => format!(
            "(() => {{ const e = document.getElementById({value}); return e ? [e] : []; }})()"
        ),
        LocatorKind::XPath => format!(
            "(() => {{ const r = document.evaluate({value}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
             return out; }})()"
        ),
        LocatorKind::Css => format!("Array.from(document.querySelectorAll({value}))"),
        LocatorKind::Class => format!("Array.from(document.getElementsByClassName({value}))"),
        LocatorKind::TagName => format!("Array.from(document.getElementsByTagName({value}))"),
        LocatorKind::Name => format!("Array.from(document.getElementsByName({value}))"),
        LocatorKind::LinkText => format!(
            "Array.from(document.querySelectorAll('a')).filter(a => a.innerText.trim() === {value})"
        ),
        LocatorKind::PartialLinkText => format!(
            "Array.from(document.querySelectorAll('a')).filter(a => a.innerText.includes({value}))"
        ),
    }
}

/// Wrap `body` so it runs with `all` (every match) and `el` (the target
/// element, or `null`) in scope. `body` must evaluate to the probe value.
fn with_element(locator: &Locator, body: &str) -> String {
    let index = locator.position().map_or(0, |n| n.saturating_sub(1));
    format!(
        "(() => {{ const all = {all}; const el = all[{index}] || null; \
         if (!el) return {{ found: false }}; \
         return {{ found: true, value: (() => {{ {body} }})() }}; }})()",
        all = resolve_all(locator),
    )
}

pub(crate) fn count(locator: &Locator) -> String {
    format!("({}).length", resolve_all(locator))
}

pub(crate) fn state(locator: &Locator) -> String {
    with_element(
        locator,
        "const style = window.getComputedStyle(el); \
         const boxed = !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length); \
         return { displayed: boxed && style.visibility !== 'hidden' && style.display !== 'none', \
                  enabled: !el.disabled, selected: !!(el.checked || el.selected) };",
    )
}

pub(crate) fn text(locator: &Locator) -> String {
    with_element(locator, "return (el.innerText ?? el.textContent ?? '').trim();")
}

pub(crate) fn attribute(locator: &Locator, name: &str) -> String {
    with_element(locator, &format!("return el.getAttribute({});", literal(name)))
}

pub(crate) fn inner_html(locator: &Locator) -> String {
    with_element(locator, "return el.innerHTML;")
}

pub(crate) fn click(locator: &Locator) -> String {
    with_element(locator, "el.click(); return true;")
}

pub(crate) fn double_click(locator: &Locator) -> String {
    with_element(
        locator,
        "el.dispatchEvent(new MouseEvent('dblclick', { bubbles: true, cancelable: true })); \
         return true;",
    )
}

pub(crate) fn clear(locator: &Locator) -> String {
    with_element(
        locator,
        "el.value = ''; \
         el.dispatchEvent(new Event('input', { bubbles: true })); \
         el.dispatchEvent(new Event('change', { bubbles: true })); \
         return true;",
    )
}

pub(crate) fn type_text(locator: &Locator, text: &str) -> String {
    with_element(
        locator,
        &format!(
            "el.focus(); el.value = (el.value || '') + {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;",
            literal(text)
        ),
    )
}

pub(crate) fn send_enter(locator: &Locator) -> String {
    with_element(
        locator,
        "for (const type of ['keydown', 'keypress', 'keyup']) { \
           el.dispatchEvent(new KeyboardEvent(type, { key: 'Enter', code: 'Enter', keyCode: 13, \
             which: 13, bubbles: true })); \
         } \
         return true;",
    )
}

/// Select script; the probe value is `false` when no option matches.
pub(crate) fn select_by(locator: &Locator, predicate: &str) -> String {
    with_element(
        locator,
        &format!(
            "const options = Array.from(el.options || []); \
             const idx = options.findIndex((o, i) => {predicate}); \
             if (idx < 0) return false; \
             el.selectedIndex = idx; \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;"
        ),
    )
}

pub(crate) fn select_by_value(locator: &Locator, value: &str) -> String {
    select_by(locator, &format!("o.value === {}", literal(value)))
}

pub(crate) fn select_by_text(locator: &Locator, text: &str) -> String {
    select_by(locator, &format!("o.text.trim() === {}", literal(text.trim())))
}

pub(crate) fn select_by_index(locator: &Locator, index: usize) -> String {
    select_by(locator, &format!("i === {index}"))
}

pub(crate) fn option_texts(locator: &Locator) -> String {
    with_element(locator, "return Array.from(el.options || []).map(o => o.text.trim());")
}

pub(crate) fn selected_option_text(locator: &Locator) -> String {
    with_element(
        locator,
        "return el.selectedIndex >= 0 ? el.options[el.selectedIndex].text.trim() : null;",
    )
}

pub(crate) fn scroll_into_view(locator: &Locator) -> String {
    with_element(locator, "el.scrollIntoView(true); return true;")
}

pub(crate) const DOCUMENT_READY: &str = "document.readyState === 'complete'";

pub(crate) const AJAX_IDLE: &str = "typeof jQuery === 'undefined' || jQuery.active === 0";
