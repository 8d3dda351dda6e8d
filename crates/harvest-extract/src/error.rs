use harvest_browser::BrowserError;
use harvest_core::{OrderType, RetryExhausted};
use harvest_locator::LocatorError;
use thiserror::Error;

/// Fatal extraction failures; any of these ends the run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Locator manifest error: {0}")]
    Manifest(#[from] LocatorError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Could not set {order_type} filters: {source}")]
    Filter {
        order_type: OrderType,
        #[source]
        source: RetryExhausted<BrowserError>,
    },

    #[error("Search for customer {customer} failed: {source}")]
    Search {
        customer: String,
        #[source]
        source: RetryExhausted<BrowserError>,
    },

    #[error("Row {row} on page {page} of {order_type} for customer {customer} failed: {source}")]
    Row {
        order_type: OrderType,
        customer: String,
        page: usize,
        row: usize,
        #[source]
        source: RetryExhausted<BrowserError>,
    },
}

impl ExtractError {
    /// Attempts made before giving up, for retried steps.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Filter { source, .. } | Self::Search { source, .. } | Self::Row { source, .. } => {
                Some(source.attempts)
            }
            Self::Manifest(_) | Self::Browser(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
