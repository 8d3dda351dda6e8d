use harvest_locator::LocatorError;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("no such element: {locator}")]
    NoSuchElement { locator: String },

    #[error("timed out after {waited:?} waiting for {locator} to be {condition}")]
    Timeout {
        locator: String,
        condition: &'static str,
        waited: Duration,
    },

    #[error("cannot interact with {locator}: {reason}")]
    Interaction { locator: String, reason: String },

    #[error("slot {slot} could not be bound: {reason}")]
    Binding { slot: String, reason: String },

    #[error("script error: {0}")]
    Script(String),

    #[error(transparent)]
    Locator(#[from] LocatorError),
}

impl BrowserError {
    /// Whether this error came from an explicit wait running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::NavigationError("page not found".to_string());
        assert_eq!(err.to_string(), "navigation failed: page not found");
    }

    #[test]
    fn test_timeout_display() {
        let err = BrowserError::Timeout {
            locator: "id=btnSearch".to_string(),
            condition: "clickable",
            waited: Duration::from_secs(10),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 10s waiting for id=btnSearch to be clickable"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_binding_names_slot() {
        let err = BrowserError::Binding {
            slot: "SEARCH_BUTTON".to_string(),
            reason: "locator not found: SEARCH_BUTTON".to_string(),
        };
        assert!(err.to_string().starts_with("slot SEARCH_BUTTON"));
    }
}
