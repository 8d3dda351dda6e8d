//! Harvest Locator - named element locators loaded from JSON manifests.
//!
//! A page's elements are declared once in a manifest and looked up by name.
//! Values may carry `{0}`/`{1}` placeholders that are filled per row/column.
//!
//! # Architecture
//!
//! - **Definitions** ([`definition`]): locator strategies, manifest entries, concrete locators
//! - **Loader** ([`loader`]): JSON manifest parsing and validation
//! - **Catalog** ([`catalog`]): immutable name lookup
//! - **Errors** ([`error`]): manifest and lookup errors
//!
//! # Example
//!
//! ```rust
//! use harvest_locator::LocatorCatalog;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = LocatorCatalog::from_json(
//!     r#"{"Name":"Orders","Elements":[{"Name":"ROW","Type":"xpath","Value":"//tr[{0}]"}]}"#,
//!     "inline",
//! )?;
//!
//! let row = catalog.get("ROW")?.locator().specialize(&[3]);
//! assert_eq!(row.value(), "//tr[3]");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod catalog;
pub mod definition;
pub mod error;
pub mod loader;

// Re-export commonly used types
pub use catalog::LocatorCatalog;
pub use definition::{Locator, LocatorDefinition, LocatorKind};
pub use error::{LocatorError, Result};
pub use loader::LocatorManifest;
