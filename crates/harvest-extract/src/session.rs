//! In-memory accumulation of one extraction run.

use crate::records::{CloseOrderRecord, OpenOrderRecord, ShippingDetailRecord};
use harvest_core::{CustomerId, OrderType};

/// Where the run currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub order_type: Option<OrderType>,
    pub customer: Option<CustomerId>,
    /// 1-based result page; 0 before the first search
    pub page: usize,
}

/// Lengths of the three record sets at a point in time.
///
/// The sets only ever grow by appending, so truncating back to these lengths
/// restores them exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    open_orders: usize,
    close_orders: usize,
    shipping_details: usize,
}

/// The three ordered record sets plus the cursor.
#[derive(Debug, Default)]
pub struct ExtractionSession {
    open_orders: Vec<OpenOrderRecord>,
    close_orders: Vec<CloseOrderRecord>,
    shipping_details: Vec<ShippingDetailRecord>,
    cursor: Cursor,
}

impl ExtractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Start on a new order type; resets customer and page.
    pub fn begin_order_type(&mut self, order_type: OrderType) {
        self.cursor = Cursor {
            order_type: Some(order_type),
            customer: None,
            page: 0,
        };
    }

    /// Start on a new customer's results at page 1.
    pub fn begin_customer(&mut self, customer: CustomerId) {
        self.cursor.customer = Some(customer);
        self.cursor.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.cursor.page = page;
    }

    pub fn push_open(&mut self, record: OpenOrderRecord) {
        self.open_orders.push(record);
    }

    pub fn push_close(&mut self, record: CloseOrderRecord) {
        self.close_orders.push(record);
    }

    pub fn push_shipping(&mut self, record: ShippingDetailRecord) {
        self.shipping_details.push(record);
    }

    pub fn open_orders(&self) -> &[OpenOrderRecord] {
        &self.open_orders
    }

    pub fn close_orders(&self) -> &[CloseOrderRecord] {
        &self.close_orders
    }

    pub fn shipping_details(&self) -> &[ShippingDetailRecord] {
        &self.shipping_details
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            open_orders: self.open_orders.len(),
            close_orders: self.close_orders.len(),
            shipping_details: self.shipping_details.len(),
        }
    }

    /// Drop everything appended since `checkpoint` was taken.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.open_orders.truncate(checkpoint.open_orders);
        self.close_orders.truncate(checkpoint.close_orders);
        self.shipping_details.truncate(checkpoint.shipping_details);
    }

    pub fn into_output(self) -> ExtractionOutput {
        ExtractionOutput {
            open_orders: self.open_orders,
            close_orders: self.close_orders,
            shipping_details: self.shipping_details,
        }
    }
}

/// Finished record sets, handed to the writer.
#[derive(Debug, Default)]
pub struct ExtractionOutput {
    pub open_orders: Vec<OpenOrderRecord>,
    pub close_orders: Vec<CloseOrderRecord>,
    pub shipping_details: Vec<ShippingDetailRecord>,
}

impl ExtractionOutput {
    pub fn total_records(&self) -> usize {
        self.open_orders.len() + self.close_orders.len() + self.shipping_details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }
}
