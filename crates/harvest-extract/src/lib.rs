//! Harvest Extract - order extraction for the customer portal.
//!
//! Drives the customer orders page through filter selection, result paging
//! and nested record extraction (order, items, shipping details), producing
//! three fixed-schema record sets.
//!
//! # Example
//!
//! ```rust,ignore
//! use harvest_extract::{spawn_extraction, ExtractionSettings};
//!
//! let handle = spawn_extraction(driver, ExtractionSettings::from_config(&config), run);
//! let output = handle.await??;
//! println!("{} open order lines", output.open_orders.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod machine;
pub mod order_page;
pub mod pagination;
#[allow(missing_docs)]
pub mod records;
pub mod runner;
#[allow(missing_docs)]
pub mod session;

// Re-export commonly used types
pub use error::{ExtractError, Result};
pub use machine::{ExtractionSettings, ExtractionStateMachine, MachineState};
pub use order_page::CustomerOrdersPage;
pub use pagination::{PageTraversal, PagerStep};
pub use records::{
    CloseOrderRecord, CloseOrderSummary, ItemColumns, OpenOrderRecord, OpenOrderSummary, Record, ShipmentLine,
    ShipmentSummary, ShippingDetailRecord, CLOSE_ORDER_WIDTH, ITEM_COLUMNS, OPEN_ORDER_WIDTH, SHIPPING_DETAIL_WIDTH,
};
pub use runner::spawn_extraction;
pub use session::{Checkpoint, Cursor, ExtractionOutput, ExtractionSession};
