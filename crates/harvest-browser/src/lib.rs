//! Browser automation layer for the order portal.
//!
//! A [`Driver`] abstracts the live browser session. [`ElementHandle`] adds
//! explicit waits on top of it, and [`PageModel`] binds named locators from a
//! catalog into handles, failing fast on manifest drift.

pub mod driver;
pub mod element;
pub mod engine;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod page;
mod script;
pub mod wait;

pub use driver::{Driver, ElementState, SelectBy};
pub use element::ElementHandle;
pub use engine::ChromiumDriver;
pub use error::{BrowserError, Result};
pub use page::{BoundSlots, PageModel, SlotCapability, SlotSpec};
pub use wait::{poll_until, DEFAULT_POLL_INTERVAL};
