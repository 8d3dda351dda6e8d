//! Fixed-schema output records.
//!
//! Every record type knows its header row and renders its cells in exactly
//! that order, so a writer never has to know which field goes where.

/// A row in one of the three output record sets, `WIDTH` columns wide.
pub trait Record<const WIDTH: usize> {
    /// Column names, in output order.
    const HEADERS: [&'static str; WIDTH];

    /// Cell values, in the order of [`Record::HEADERS`].
    fn cells(&self) -> [&str; WIDTH];
}

/// Columns of an open-order record.
pub const OPEN_ORDER_WIDTH: usize = 20;
/// Columns of a close-order record.
pub const CLOSE_ORDER_WIDTH: usize = 16;
/// Columns of a shipping-detail record.
pub const SHIPPING_DETAIL_WIDTH: usize = 17;

/// Item-table column names, looked up by header text on every render.
pub const ITEM_COLUMNS: [&str; 8] = [
    "Line No.",
    "Item Number",
    "Description",
    "QTY Ordered",
    "QTY Shipped",
    "B/O QTY",
    "Unit Price",
    "Extended Price",
];

/// One line of an order's items table, or all blanks when the order has
/// no item data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemColumns {
    pub line_no: String,
    pub item_number: String,
    pub description: String,
    pub qty_ordered: String,
    pub qty_shipped: String,
    pub backorder_qty: String,
    pub unit_price: String,
    pub extended_price: String,
}

impl ItemColumns {
    /// Build from values in [`ITEM_COLUMNS`] order.
    pub fn from_values(values: [String; 8]) -> Self {
        let [line_no, item_number, description, qty_ordered, qty_shipped, backorder_qty, unit_price, extended_price] =
            values;
        Self {
            line_no,
            item_number,
            description,
            qty_ordered,
            qty_shipped,
            backorder_qty,
            unit_price,
            extended_price,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.cells().iter().all(|c| c.is_empty())
    }

    fn cells(&self) -> [&str; 8] {
        [
            self.line_no.as_str(),
            self.item_number.as_str(),
            self.description.as_str(),
            self.qty_ordered.as_str(),
            self.qty_shipped.as_str(),
            self.backorder_qty.as_str(),
            self.unit_price.as_str(),
            self.extended_price.as_str(),
        ]
    }
}

/// Order-level fields of an open order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOrderSummary {
    pub sold_to_id: String,
    pub sales_order: String,
    pub customer_po: String,
    pub ship_to_party: String,
    pub ship_to_country: String,
    pub created_time: String,
    pub assembly_type: String,
    pub order_status: String,
    pub sold_to: String,
    pub ship_to: String,
    pub esd: String,
    pub message: String,
}

/// One open-order item line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrderRecord {
    pub summary: OpenOrderSummary,
    pub items: ItemColumns,
}

impl Record<OPEN_ORDER_WIDTH> for OpenOrderRecord {
    const HEADERS: [&'static str; OPEN_ORDER_WIDTH] = [
        "Sold To ID",
        "Sales Order",
        "Customer PO",
        "Ship To Party",
        "Ship To Country",
        "Created Time",
        "Assembly Type",
        "Order Status",
        "Sold-To",
        "Ship-To",
        "ESD",
        "Message",
        "Line No.",
        "Item Number",
        "Description",
        "QTY Ordered",
        "QTY Shipped",
        "B/O QTY",
        "Unit Price",
        "Extended Price",
    ];

    fn cells(&self) -> [&str; OPEN_ORDER_WIDTH] {
        let s = &self.summary;
        let [line_no, item_number, description, qty_ordered, qty_shipped, backorder_qty, unit_price, extended_price] =
            self.items.cells();
        [
            s.sold_to_id.as_str(),
            s.sales_order.as_str(),
            s.customer_po.as_str(),
            s.ship_to_party.as_str(),
            s.ship_to_country.as_str(),
            s.created_time.as_str(),
            s.assembly_type.as_str(),
            s.order_status.as_str(),
            s.sold_to.as_str(),
            s.ship_to.as_str(),
            s.esd.as_str(),
            s.message.as_str(),
            line_no,
            item_number,
            description,
            qty_ordered,
            qty_shipped,
            backorder_qty,
            unit_price,
            extended_price,
        ]
    }
}

/// Order-level fields of a closed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseOrderSummary {
    pub sold_to_id: String,
    pub sales_order: String,
    pub order_date: String,
    pub customer_po: String,
    pub assembly_type: String,
    pub order_status: String,
    pub sold_to: String,
    pub ship_to: String,
}

/// One closed-order item line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOrderRecord {
    pub summary: CloseOrderSummary,
    pub items: ItemColumns,
}

impl Record<CLOSE_ORDER_WIDTH> for CloseOrderRecord {
    const HEADERS: [&'static str; CLOSE_ORDER_WIDTH] = [
        "Sold To ID",
        "Sales Order",
        "Order Date",
        "Customer PO",
        "Assembly Type",
        "Order Status",
        "Sold-To",
        "Ship-To",
        "Line No.",
        "Item Number",
        "Description",
        "QTY Ordered",
        "QTY Shipped",
        "B/O QTY",
        "Unit Price",
        "Extended Price",
    ];

    fn cells(&self) -> [&str; CLOSE_ORDER_WIDTH] {
        let s = &self.summary;
        let [line_no, item_number, description, qty_ordered, qty_shipped, backorder_qty, unit_price, extended_price] =
            self.items.cells();
        [
            s.sold_to_id.as_str(),
            s.sales_order.as_str(),
            s.order_date.as_str(),
            s.customer_po.as_str(),
            s.assembly_type.as_str(),
            s.order_status.as_str(),
            s.sold_to.as_str(),
            s.ship_to.as_str(),
            line_no,
            item_number,
            description,
            qty_ordered,
            qty_shipped,
            backorder_qty,
            unit_price,
            extended_price,
        ]
    }
}

/// The shipment panel's summary fields, shared by every line of one order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentSummary {
    pub pick_uniq: String,
    pub ord_uniq: String,
    pub status: String,
    pub via_desc: String,
    pub comment: String,
    pub ship_date: String,
    pub invoice_number: String,
    pub tracking_number: String,
}

impl ShipmentSummary {
    /// Build from the panel's values in display order.
    pub fn from_values(values: [String; 8]) -> Self {
        let [pick_uniq, ord_uniq, status, via_desc, comment, ship_date, invoice_number, tracking_number] =
            values;
        Self {
            pick_uniq,
            ord_uniq,
            status,
            via_desc,
            comment,
            ship_date,
            invoice_number,
            tracking_number,
        }
    }
}

/// One row of the expanded shipment lines table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentLine {
    pub order_line: String,
    pub qty_ordered: String,
    pub qty_shipped: String,
    pub item: String,
    pub category: String,
    pub description: String,
    pub timestamps: String,
}

impl ShipmentLine {
    /// Build from the row's cells in column order.
    pub fn from_values(values: [String; 7]) -> Self {
        let [order_line, qty_ordered, qty_shipped, item, category, description, timestamps] = values;
        Self {
            order_line,
            qty_ordered,
            qty_shipped,
            item,
            category,
            description,
            timestamps,
        }
    }
}

/// One shipped line of an open order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingDetailRecord {
    pub sold_to_id: String,
    pub sales_order: String,
    pub shipment: ShipmentSummary,
    pub line: ShipmentLine,
}

impl Record<SHIPPING_DETAIL_WIDTH> for ShippingDetailRecord {
    const HEADERS: [&'static str; SHIPPING_DETAIL_WIDTH] = [
        "Sold To ID",
        "Sales Order",
        "PICKUNIQ",
        "ORDUNIQ",
        "Status",
        "VIADESC",
        "Comment",
        "SDATE",
        "Invoice Number",
        "Tracking Number",
        "Order Line",
        "QTY Ordered",
        "QTY Shipped",
        "Item",
        "Category",
        "Description",
        "Timestamps",
    ];

    fn cells(&self) -> [&str; SHIPPING_DETAIL_WIDTH] {
        let h = &self.shipment;
        let l = &self.line;
        [
            self.sold_to_id.as_str(),
            self.sales_order.as_str(),
            h.pick_uniq.as_str(),
            h.ord_uniq.as_str(),
            h.status.as_str(),
            h.via_desc.as_str(),
            h.comment.as_str(),
            h.ship_date.as_str(),
            h.invoice_number.as_str(),
            h.tracking_number.as_str(),
            l.order_line.as_str(),
            l.qty_ordered.as_str(),
            l.qty_shipped.as_str(),
            l.item.as_str(),
            l.category.as_str(),
            l.description.as_str(),
            l.timestamps.as_str(),
        ]
    }
}
