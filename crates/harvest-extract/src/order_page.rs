//! Page model for the portal's customer orders screen.
//!
//! Owns every bound slot and the site-specific reads: filter setup, result
//! row counts, order rows of both layouts, the items sub-table and the
//! shipment panel. Waits and their bounds are tuned to the live portal and
//! kept as observed.

use crate::records::{
    CloseOrderSummary, ItemColumns, OpenOrderSummary, ShipmentLine, ShipmentSummary, ShippingDetailRecord,
    ITEM_COLUMNS,
};
use harvest_browser::{ElementHandle, PageModel, Result, SlotSpec};
use harvest_core::{CustomerId, OrderType};
use harvest_locator::{LocatorCatalog, LocatorError};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Locator manifest compiled into the binary.
pub const MANIFEST: &str = include_str!("../locators/customer_orders.json");
const MANIFEST_ORIGIN: &str = "customer_orders.json";

const FILTER_TIMEOUT: Duration = Duration::from_secs(300);
const ITEMS_CLICK_TIMEOUT: Duration = Duration::from_secs(60);
const SHIPPING_CLICK_TIMEOUT: Duration = Duration::from_secs(10);
const DETAILS_BUTTON_PROBE: Duration = Duration::from_secs(2);
const NO_DATA_PROBE: Duration = Duration::from_secs(2);
const HEADERS_PROBE: Duration = Duration::from_secs(5);
const CHECKBOX_PROBE: Duration = Duration::from_secs(5);
const NO_SHIPPING_PROBE: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_secs(2);

/// Pager presence probe and the rows it occupies, per layout.
///
/// The closed-order grid renders the pager over two rows and shows it almost
/// immediately; the open-order grid uses one row but renders it late.
const OPEN_PAGER_PROBE: Duration = Duration::from_secs(10);
const OPEN_PAGER_ROWS: usize = 1;
const CLOSE_PAGER_PROBE: Duration = Duration::from_secs(1);
const CLOSE_PAGER_ROWS: usize = 2;

/// First data row of every grid; row 1 is the header.
pub const FIRST_DATA_ROW: usize = 2;

const SHIPMENT_SUMMARY_FIELDS: usize = 8;
const SHIPMENT_LINE_FIELDS: usize = 7;

pub(crate) const SLOTS: &[SlotSpec] = &[
    SlotSpec::element("ORDER_TYPE"),
    SlotSpec::element("FROM_DATE"),
    SlotSpec::element("TO_DATE"),
    SlotSpec::element("CUSTOMER_ID"),
    SlotSpec::element("SEARCH_BUTTON"),
    SlotSpec::collection("PAGE_COUNT"),
    SlotSpec::row("SELECT_PAGE"),
    SlotSpec::collection("OPEN_ORDER_TABLE_ROW_COUNT"),
    SlotSpec::row("OPEN_ORDER_SOLD_TO_ID"),
    SlotSpec::row("OPEN_ORDER_SALES_ORDER"),
    SlotSpec::row("OPEN_ORDER_CUSTOMER_PO"),
    SlotSpec::row("OPEN_ORDER_SHIP_TO_PARTY"),
    SlotSpec::row("OPEN_ORDER_SHIP_TO_COUNTRY"),
    SlotSpec::row("OPEN_ORDER_CREATED_TIME"),
    SlotSpec::row("OPEN_ORDER_DETAILS_BUTTON"),
    SlotSpec::element("OPEN_ORDER_ASSEMBLY_TYPE"),
    SlotSpec::element("OPEN_ORDER_STATUS"),
    SlotSpec::element("ESD"),
    SlotSpec::element("MESSAGE"),
    SlotSpec::collection("CLOSE_ORDER_TABLE_ROW_COUNT"),
    SlotSpec::row("CLOSE_ORDER_SALES_ORDER"),
    SlotSpec::row("CLOSE_ORDER_ORDER_DATE"),
    SlotSpec::row("CLOSE_ORDER_CUSTOMER_PO"),
    SlotSpec::row("CLOSE_ORDER_ASSEMBLY_TYPE"),
    SlotSpec::row("CLOSE_ORDER_DETAILS_BUTTON"),
    SlotSpec::element("CLOSE_ORDER_STATUS"),
    SlotSpec::row("SOLD_TO_ADDRESS"),
    SlotSpec::row("SHIP_TO_ADDRESS"),
    SlotSpec::element("ORDER_ITEM"),
    SlotSpec::element("ORDER_ITEM_TABLE"),
    SlotSpec::element("ORDER_ITEM_NO_DATA"),
    SlotSpec::collection("ORDER_ITEM_HEADERS"),
    SlotSpec::row("ORDER_ITEM_HEADER_VALUE"),
    SlotSpec::collection("ORDER_ITEM_ROWS"),
    SlotSpec::grid("ORDER_ITEM_ROW_VALUE"),
    SlotSpec::element("VIEW_DETAILS_OPEN_ORDER_CHECKBOX"),
    SlotSpec::element("VIEW_DETAILS_CLOSE_ORDER_CHECKBOX"),
    SlotSpec::element("SHIPPING_DETAILS_BUTTON"),
    SlotSpec::element("NO_SHIPPING_DETAILS"),
    SlotSpec::row("SHIPPING_DETAILS_VALUE"),
    SlotSpec::element("SHIPPING_DETAILS_MORE_BUTTON"),
    SlotSpec::collection("SHIPPING_DETAILS_ORDER_ROW"),
    SlotSpec::grid("SHIPPING_DETAILS_ORDER_VALUE"),
];

/// Order-row handles of one grid layout.
#[derive(Debug)]
struct OpenOrderGrid {
    rows: ElementHandle,
    sold_to_id: ElementHandle,
    sales_order: ElementHandle,
    customer_po: ElementHandle,
    ship_to_party: ElementHandle,
    ship_to_country: ElementHandle,
    created_time: ElementHandle,
    details_button: ElementHandle,
    assembly_type: ElementHandle,
    status: ElementHandle,
    esd: ElementHandle,
    message: ElementHandle,
}

#[derive(Debug)]
struct CloseOrderGrid {
    rows: ElementHandle,
    sales_order: ElementHandle,
    order_date: ElementHandle,
    customer_po: ElementHandle,
    assembly_type: ElementHandle,
    details_button: ElementHandle,
    status: ElementHandle,
}

#[derive(Debug)]
struct ItemsTable {
    expand: ElementHandle,
    table: ElementHandle,
    no_data: ElementHandle,
    headers: ElementHandle,
    header_value: ElementHandle,
    rows: ElementHandle,
    row_value: ElementHandle,
    view_details_open: ElementHandle,
    view_details_close: ElementHandle,
}

#[derive(Debug)]
struct ShipmentPanel {
    button: ElementHandle,
    not_available: ElementHandle,
    value: ElementHandle,
    more: ElementHandle,
    lines: ElementHandle,
    line_value: ElementHandle,
}

/// The customer orders screen with every slot bound.
pub struct CustomerOrdersPage {
    model: PageModel,
    cell_timeout: Duration,
    order_type: ElementHandle,
    from_date: ElementHandle,
    to_date: ElementHandle,
    customer_id: ElementHandle,
    search_button: ElementHandle,
    pager: ElementHandle,
    page_button: ElementHandle,
    sold_to_address: ElementHandle,
    ship_to_address: ElementHandle,
    open: OpenOrderGrid,
    close: CloseOrderGrid,
    items: ItemsTable,
    shipment: ShipmentPanel,
}

impl CustomerOrdersPage {
    /// Catalog parsed from the embedded manifest.
    pub fn catalog() -> std::result::Result<LocatorCatalog, LocatorError> {
        LocatorCatalog::from_json(MANIFEST, MANIFEST_ORIGIN)
    }

    /// Bind every slot, failing on the first one the catalog cannot satisfy.
    ///
    /// Row and cell handles derived from templates use `cell_timeout`.
    pub fn bind(model: PageModel, cell_timeout: Duration) -> Result<Self> {
        let mut slots = model.bind(SLOTS)?;

        let open = OpenOrderGrid {
            rows: slots.take("OPEN_ORDER_TABLE_ROW_COUNT")?,
            sold_to_id: slots.take("OPEN_ORDER_SOLD_TO_ID")?,
            sales_order: slots.take("OPEN_ORDER_SALES_ORDER")?,
            customer_po: slots.take("OPEN_ORDER_CUSTOMER_PO")?,
            ship_to_party: slots.take("OPEN_ORDER_SHIP_TO_PARTY")?,
            ship_to_country: slots.take("OPEN_ORDER_SHIP_TO_COUNTRY")?,
            created_time: slots.take("OPEN_ORDER_CREATED_TIME")?,
            details_button: slots.take("OPEN_ORDER_DETAILS_BUTTON")?,
            assembly_type: slots.take("OPEN_ORDER_ASSEMBLY_TYPE")?,
            status: slots.take("OPEN_ORDER_STATUS")?,
            esd: slots.take("ESD")?,
            message: slots.take("MESSAGE")?,
        };
        let close = CloseOrderGrid {
            rows: slots.take("CLOSE_ORDER_TABLE_ROW_COUNT")?,
            sales_order: slots.take("CLOSE_ORDER_SALES_ORDER")?,
            order_date: slots.take("CLOSE_ORDER_ORDER_DATE")?,
            customer_po: slots.take("CLOSE_ORDER_CUSTOMER_PO")?,
            assembly_type: slots.take("CLOSE_ORDER_ASSEMBLY_TYPE")?,
            details_button: slots.take("CLOSE_ORDER_DETAILS_BUTTON")?,
            status: slots.take("CLOSE_ORDER_STATUS")?,
        };
        let items = ItemsTable {
            expand: slots.take("ORDER_ITEM")?,
            table: slots.take("ORDER_ITEM_TABLE")?,
            no_data: slots.take("ORDER_ITEM_NO_DATA")?,
            headers: slots.take("ORDER_ITEM_HEADERS")?,
            header_value: slots.take("ORDER_ITEM_HEADER_VALUE")?,
            rows: slots.take("ORDER_ITEM_ROWS")?,
            row_value: slots.take("ORDER_ITEM_ROW_VALUE")?,
            view_details_open: slots.take("VIEW_DETAILS_OPEN_ORDER_CHECKBOX")?,
            view_details_close: slots.take("VIEW_DETAILS_CLOSE_ORDER_CHECKBOX")?,
        };
        let shipment = ShipmentPanel {
            button: slots.take("SHIPPING_DETAILS_BUTTON")?,
            not_available: slots.take("NO_SHIPPING_DETAILS")?,
            value: slots.take("SHIPPING_DETAILS_VALUE")?,
            more: slots.take("SHIPPING_DETAILS_MORE_BUTTON")?,
            lines: slots.take("SHIPPING_DETAILS_ORDER_ROW")?,
            line_value: slots.take("SHIPPING_DETAILS_ORDER_VALUE")?,
        };

        Ok(Self {
            cell_timeout,
            order_type: slots.take("ORDER_TYPE")?,
            from_date: slots.take("FROM_DATE")?,
            to_date: slots.take("TO_DATE")?,
            customer_id: slots.take("CUSTOMER_ID")?,
            search_button: slots.take("SEARCH_BUTTON")?,
            pager: slots.take("PAGE_COUNT")?,
            page_button: slots.take("SELECT_PAGE")?,
            sold_to_address: slots.take("SOLD_TO_ADDRESS")?,
            ship_to_address: slots.take("SHIP_TO_ADDRESS")?,
            open,
            close,
            items,
            shipment,
            model,
        })
    }

    /// The underlying page model.
    pub fn model(&self) -> &PageModel {
        &self.model
    }

    fn cell(&self, template: &ElementHandle, row: usize) -> ElementHandle {
        template.specialize(row).with_timeout(self.cell_timeout)
    }

    fn grid_cell(&self, template: &ElementHandle, row: usize, col: usize) -> ElementHandle {
        template.specialize_cell(row, col).with_timeout(self.cell_timeout)
    }

    /// Load the orders screen and set order type and date range.
    pub async fn set_filters(&self, url: &str, order_type_label: &str, from: &str, to: &str) -> Result<()> {
        self.model.open(url).await?;
        self.order_type.wait_for_visible(FILTER_TIMEOUT).await?;
        self.order_type.select_by_text(order_type_label).await?;
        self.from_date.set_text(from).await?;
        self.to_date.set_text(to).await
    }

    /// Pick the customer and run the search.
    pub async fn search(&self, customer: &CustomerId) -> Result<()> {
        self.customer_id.select_by_value(customer.as_str()).await?;
        self.search_button.click().await
    }

    /// Whether the result pager renders within `timeout`.
    pub async fn pager_visible(&self, timeout: Duration) -> Result<bool> {
        self.pager.is_visible(timeout).await
    }

    /// Number of buttons the pager currently renders.
    pub async fn pager_size(&self) -> Result<usize> {
        self.pager.get_size().await
    }

    /// Pager button at a 1-based position.
    pub fn pager_button(&self, position: usize) -> ElementHandle {
        self.cell(&self.page_button, position)
    }

    /// Last grid row holding an order on the current page.
    ///
    /// The grid's row count includes the pager rows when a pager renders.
    pub async fn last_order_row(&self, order_type: OrderType) -> Result<usize> {
        let (rows, probe, pager_rows) = match order_type {
            OrderType::Open => (&self.open.rows, OPEN_PAGER_PROBE, OPEN_PAGER_ROWS),
            OrderType::Closed => (&self.close.rows, CLOSE_PAGER_PROBE, CLOSE_PAGER_ROWS),
        };

        let mut count = rows.get_size().await?;
        if self.pager.is_visible(probe).await? {
            count = count.saturating_sub(pager_rows);
        }
        debug!(%order_type, last_row = count, "order rows on page");
        Ok(count)
    }

    /// Read one open order's summary and detail fields.
    ///
    /// `Sold To ID` is the customer the search ran for.
    pub async fn read_open_order(&self, row: usize, customer: &CustomerId) -> Result<OpenOrderSummary> {
        let grid = &self.open;
        self.cell(&grid.sold_to_id, row).scroll_into_view().await?;

        let sales_order = self.cell(&grid.sales_order, row).get_text().await?;
        let customer_po = self.cell(&grid.customer_po, row).get_text().await?;
        let ship_to_party = self.cell(&grid.ship_to_party, row).get_text().await?;
        let ship_to_country = self.cell(&grid.ship_to_country, row).get_text().await?;
        let created_time = self.cell(&grid.created_time, row).get_text().await?;

        let details = self.cell(&grid.details_button, row);
        if details.is_visible(DETAILS_BUTTON_PROBE).await? {
            details.click().await?;
        }
        grid.assembly_type.wait_for_visible(self.model.default_timeout()).await?;

        Ok(OpenOrderSummary {
            sold_to_id: customer.to_string(),
            sales_order,
            customer_po,
            ship_to_party,
            ship_to_country,
            created_time,
            assembly_type: grid.assembly_type.get_text().await?,
            order_status: grid.status.get_text().await?,
            sold_to: self.address(&self.sold_to_address).await?,
            ship_to: self.address(&self.ship_to_address).await?,
            esd: grid.esd.get_text().await?,
            message: grid.message.get_text().await?,
        })
    }

    /// Read one closed order's summary and detail fields.
    pub async fn read_close_order(&self, row: usize, customer: &CustomerId) -> Result<CloseOrderSummary> {
        let grid = &self.close;
        let sales_order = self.cell(&grid.sales_order, row);
        sales_order.scroll_into_view().await?;

        let sales_order = sales_order.get_text().await?;
        let order_date = self.cell(&grid.order_date, row).get_text().await?;
        let customer_po = self.cell(&grid.customer_po, row).get_text().await?;
        let assembly_type = self.cell(&grid.assembly_type, row).get_text().await?;

        self.cell(&grid.details_button, row).click().await?;
        grid.status.wait_for_visible(self.model.default_timeout()).await?;

        Ok(CloseOrderSummary {
            sold_to_id: customer.to_string(),
            sales_order,
            order_date,
            customer_po,
            assembly_type,
            order_status: grid.status.get_text().await?,
            sold_to: self.address(&self.sold_to_address).await?,
            ship_to: self.address(&self.ship_to_address).await?,
        })
    }

    /// Two address lines joined by a single space.
    async fn address(&self, template: &ElementHandle) -> Result<String> {
        let first = self.cell(template, 1).get_text().await?;
        let second = self.cell(template, 2).get_text().await?;
        Ok(format!("{first} {second}"))
    }

    async fn expand_items(&self) -> Result<()> {
        let items = &self.items;
        items.expand.scroll_into_view().await?;
        items.expand.wait_and_click(ITEMS_CLICK_TIMEOUT).await?;
        items.table.wait_for_visible(self.model.default_timeout()).await?;
        items.table.scroll_into_view().await
    }

    /// Expand the items table; `false` when it reports no data.
    ///
    /// A header row that does not render in time gets one more expand click
    /// before the wait becomes a hard failure.
    async fn open_items(&self) -> Result<bool> {
        let items = &self.items;
        self.expand_items().await?;

        if items.no_data.is_visible(NO_DATA_PROBE).await? {
            return Ok(false);
        }
        if items.headers.is_visible(HEADERS_PROBE).await? {
            return Ok(true);
        }

        warn!("item headers did not render, expanding again");
        self.expand_items().await?;
        if items.no_data.is_visible(NO_DATA_PROBE).await? {
            return Ok(false);
        }
        items.headers.wait_for_visible(HEADERS_PROBE).await?;
        Ok(true)
    }

    /// Read the current order's items table.
    ///
    /// Returns at least one entry: an order without item lines yields a
    /// single all-blank entry so its summary still lands in the output.
    pub async fn read_items(&self, order_type: OrderType) -> Result<Vec<ItemColumns>> {
        let items = &self.items;
        sleep(SETTLE).await;

        if !self.open_items().await? {
            debug!("order has no item data");
            return Ok(vec![ItemColumns::default()]);
        }

        let view_details = match order_type {
            OrderType::Open => &items.view_details_open,
            OrderType::Closed => &items.view_details_close,
        };
        if view_details.is_visible(CHECKBOX_PROBE).await? {
            view_details.check().await?;
        }

        sleep(SETTLE).await;
        if !items.table.is_visible(NO_DATA_PROBE).await? {
            self.expand_items().await?;
        }
        if items.no_data.is_visible(NO_DATA_PROBE).await? {
            return Ok(vec![ItemColumns::default()]);
        }

        let header_count = items.headers.get_size().await?;
        if header_count == 0 {
            return Ok(vec![ItemColumns::default()]);
        }

        // Column order varies between renders; first occurrence of a name wins
        let mut columns = HashMap::with_capacity(header_count);
        for position in 1..=header_count {
            let name = self.cell(&items.header_value, position).get_text().await?;
            columns.entry(name.trim().to_string()).or_insert(position);
        }

        let row_count = items.rows.get_size().await?;
        let mut lines = Vec::new();
        for row in FIRST_DATA_ROW..=row_count {
            let mut values: [String; 8] = Default::default();
            for (value, name) in values.iter_mut().zip(ITEM_COLUMNS) {
                if let Some(&col) = columns.get(name) {
                    *value = self.grid_cell(&items.row_value, row, col).get_text().await?;
                }
            }
            lines.push(ItemColumns::from_values(values));
        }

        if lines.is_empty() {
            lines.push(ItemColumns::default());
        }
        debug!(lines = lines.len(), headers = header_count, "read order items");
        Ok(lines)
    }

    /// Read the shipment panel of the current open order.
    ///
    /// Orders without shipments yield no records.
    pub async fn read_shipping(&self, customer: &CustomerId, sales_order: &str) -> Result<Vec<ShippingDetailRecord>> {
        let panel = &self.shipment;
        panel.button.scroll_into_view().await?;
        panel.button.wait_and_click(SHIPPING_CLICK_TIMEOUT).await?;

        if panel.not_available.is_visible(NO_SHIPPING_PROBE).await? {
            debug!(sales_order, "no shipping details");
            return Ok(Vec::new());
        }

        let mut summary: [String; SHIPMENT_SUMMARY_FIELDS] = Default::default();
        for (position, value) in (1..).zip(summary.iter_mut()) {
            *value = self.cell(&panel.value, position).get_text().await?;
        }
        let shipment = ShipmentSummary::from_values(summary);

        panel.more.scroll_into_view().await?;
        panel.more.click().await?;
        sleep(SETTLE).await;

        let line_count = panel.lines.get_size().await?;
        let mut records = Vec::new();
        for row in FIRST_DATA_ROW..=line_count {
            let mut line: [String; SHIPMENT_LINE_FIELDS] = Default::default();
            for (col, value) in (1..).zip(line.iter_mut()) {
                *value = self.grid_cell(&panel.line_value, row, col).get_text().await?;
            }
            records.push(ShippingDetailRecord {
                sold_to_id: customer.to_string(),
                sales_order: sales_order.to_string(),
                shipment: shipment.clone(),
                line: ShipmentLine::from_values(line),
            });
        }

        debug!(sales_order, lines = records.len(), "read shipping details");
        Ok(records)
    }
}
