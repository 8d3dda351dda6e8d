//! Error types for locator manifests and catalogs.

use thiserror::Error;

/// Errors that can occur while loading or querying locators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// Manifest missing, unreadable, malformed or structurally invalid
    #[error("invalid locator manifest {origin}: {reason}")]
    Resource {
        /// File path or embedded resource name
        origin: String,
        /// What was wrong with it
        reason: String,
    },

    /// Element declared a `Type` that is not a known locator strategy
    #[error("unknown locator type '{found}' for element {name}")]
    UnknownType {
        /// Element name
        name: String,
        /// The unrecognised type string
        found: String,
    },

    /// No element with this name in the catalog
    #[error("locator not found: {name}")]
    NotFound {
        /// Requested element name
        name: String,
    },
}

/// Result type for locator operations.
pub type Result<T> = std::result::Result<T, LocatorError>;
