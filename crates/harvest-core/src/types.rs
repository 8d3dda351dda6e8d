//! Shared types describing one extraction run.

use crate::error::RunConfigError;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

/// Date format used by the portal's filter inputs (`MM/dd/yyyy`).
pub const PORTAL_DATE_FORMAT: &str = "%m/%d/%Y";

/// Order listing to extract.
///
/// The two layouts differ in column schema, pager allowance and whether
/// shipping details are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Orders that have not shipped completely
    Open,
    /// Completed or cancelled orders
    Closed,
}

impl OrderType {
    /// Canonical display name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open Order",
            Self::Closed => "Closed Order",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = RunConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "open order" | "open orders" => Ok(Self::Open),
            "closed" | "close" | "closed order" | "closed orders" | "close order" => {
                Ok(Self::Closed)
            }
            _ => Err(RunConfigError::UnknownOrderType(s.to_string())),
        }
    }
}

/// Customer account id as listed in the portal's customer dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(String);

impl CustomerId {
    /// Create a new `CustomerId`, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns error if the id is empty or contains characters other than
    /// letters, digits, `-`, `_` and `.`.
    pub fn new(id: impl Into<String>) -> Result<Self, RunConfigError> {
        let id = id.into().trim().to_string();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), RunConfigError> {
        static CUSTOMER_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = CUSTOMER_REGEX
            .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").expect("valid regex"));

        if id.is_empty() {
            return Err(RunConfigError::InvalidCustomerId {
                id: id.to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(RunConfigError::InvalidCustomerId {
                id: id.to_string(),
                reason: "must be 1-64 letters, digits, '.', '-' or '_'".to_string(),
            })
        }
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CustomerId {
    type Err = RunConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Parse a `MM/dd/yyyy` date.
///
/// # Errors
/// Returns [`RunConfigError::InvalidDate`] for anything else.
pub fn parse_portal_date(s: &str) -> Result<NaiveDate, RunConfigError> {
    NaiveDate::parse_from_str(s.trim(), PORTAL_DATE_FORMAT)
        .map_err(|_| RunConfigError::InvalidDate(s.to_string()))
}

/// Format a date the way the portal's filter inputs expect.
#[must_use]
pub fn format_portal_date(date: NaiveDate) -> String {
    date.format(PORTAL_DATE_FORMAT).to_string()
}

/// What to extract and where to put it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    order_types: Vec<OrderType>,
    customer_ids: Vec<CustomerId>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    output_dir: PathBuf,
}

impl RunConfig {
    /// Build a validated run configuration.
    ///
    /// # Errors
    /// Returns error if either list is empty or `start_date > end_date`.
    pub fn new(
        order_types: Vec<OrderType>,
        customer_ids: Vec<CustomerId>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, RunConfigError> {
        if order_types.is_empty() {
            return Err(RunConfigError::NoOrderTypes);
        }
        if customer_ids.is_empty() {
            return Err(RunConfigError::NoCustomers);
        }
        if start_date > end_date {
            return Err(RunConfigError::DateRange {
                start: format_portal_date(start_date),
                end: format_portal_date(end_date),
            });
        }

        Ok(Self {
            order_types,
            customer_ids,
            start_date,
            end_date,
            output_dir: output_dir.into(),
        })
    }

    /// Order types, in processing order.
    #[must_use]
    pub fn order_types(&self) -> &[OrderType] {
        &self.order_types
    }

    /// Customer ids, in processing order.
    #[must_use]
    pub fn customer_ids(&self) -> &[CustomerId] {
        &self.customer_ids
    }

    /// First day of the date filter.
    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Last day of the date filter.
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Start date as typed into the portal.
    #[must_use]
    pub fn start_date_text(&self) -> String {
        format_portal_date(self.start_date)
    }

    /// End date as typed into the portal.
    #[must_use]
    pub fn end_date_text(&self) -> String {
        format_portal_date(self.end_date)
    }

    /// Destination directory for the record sets.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_order_type_parsing() {
        assert_eq!("Open Order".parse::<OrderType>(), Ok(OrderType::Open));
        assert_eq!("closed".parse::<OrderType>(), Ok(OrderType::Closed));
        assert!("pending".parse::<OrderType>().is_err());
        assert_eq!(OrderType::Closed.to_string(), "Closed Order");
    }

    #[test]
    fn test_customer_id_validation() {
        assert_eq!(CustomerId::new("  C10023 ").expect("valid id").as_str(), "C10023");
        assert!(CustomerId::new("").is_err());
        assert!(CustomerId::new("bad id").is_err());
        assert!(CustomerId::new("-leading").is_err());
    }

    #[test]
    fn test_portal_date_round_trip() {
        let parsed = parse_portal_date("03/07/2024").expect("valid date");
        assert_eq!(parsed, date(2024, 3, 7));
        assert_eq!(format_portal_date(parsed), "03/07/2024");
        assert!(parse_portal_date("2024-03-07").is_err());
    }

    #[test]
    fn test_run_config_validation() {
        let customers = vec![CustomerId::new("C1").expect("valid id")];

        let err = RunConfig::new(vec![], customers.clone(), date(2024, 1, 1), date(2024, 2, 1), "out")
            .expect_err("no order types");
        assert_eq!(err, RunConfigError::NoOrderTypes);

        let err = RunConfig::new(vec![OrderType::Open], vec![], date(2024, 1, 1), date(2024, 2, 1), "out")
            .expect_err("no customers");
        assert_eq!(err, RunConfigError::NoCustomers);

        let err = RunConfig::new(
            vec![OrderType::Open],
            customers.clone(),
            date(2024, 2, 1),
            date(2024, 1, 1),
            "out",
        )
        .expect_err("inverted range");
        assert!(err.to_string().contains("02/01/2024"));

        let run = RunConfig::new(
            vec![OrderType::Open, OrderType::Closed],
            customers,
            date(2024, 1, 1),
            date(2024, 1, 1),
            "out",
        )
        .expect("same-day range is valid");
        assert_eq!(run.start_date_text(), "01/01/2024");
        assert_eq!(run.order_types().len(), 2);
    }
}
