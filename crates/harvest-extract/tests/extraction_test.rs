use chrono::NaiveDate;
use harvest_browser::mock::{MockDriver, MockElement};
use harvest_browser::{BrowserError, Driver};
use harvest_core::{CustomerId, OrderType, PortalConfig, RetryPolicy, RunConfig};
use harvest_extract::{
    spawn_extraction, CustomerOrdersPage, ExtractError, ExtractionSettings, ExtractionStateMachine, MachineState,
    Record,
};
use harvest_locator::LocatorCatalog;
use std::sync::Arc;
use std::time::Duration;

/// Mock portal keyed through the embedded manifest, so fixtures follow the
/// same locators the page model resolves.
struct Portal {
    driver: Arc<MockDriver>,
    catalog: LocatorCatalog,
}

impl Portal {
    fn new() -> Self {
        Self {
            driver: Arc::new(MockDriver::new()),
            catalog: CustomerOrdersPage::catalog().expect("embedded manifest"),
        }
    }

    fn key(&self, name: &str, args: &[usize]) -> String {
        self.catalog
            .get(name)
            .expect("slot in manifest")
            .locator()
            .specialize(args)
            .key()
    }

    fn put(&self, name: &str, args: &[usize], element: MockElement) {
        self.driver.insert(self.key(name, args), element);
    }

    fn text(&self, name: &str, args: &[usize], text: &str) {
        self.put(name, args, MockElement::new(text));
    }

    fn count(&self, name: &str, count: usize) {
        self.driver.set_count(self.key(name, &[]), count);
    }

    fn driver(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver) as Arc<dyn Driver>
    }

    fn filters(&self) {
        self.put(
            "ORDER_TYPE",
            &[],
            MockElement::select(&[("O", "Open Order"), ("C", "Closed Order")]),
        );
        self.text("FROM_DATE", &[], "");
        self.text("TO_DATE", &[], "");
        self.put("CUSTOMER_ID", &[], MockElement::select(&[("C100", "Acme Corp")]));
        self.text("SEARCH_BUTTON", &[], "Search");
    }

    fn addresses(&self) {
        self.text("SOLD_TO_ADDRESS", &[1], "100 Main St");
        self.text("SOLD_TO_ADDRESS", &[2], "San Jose CA");
        self.text("SHIP_TO_ADDRESS", &[1], "200 Dock Rd");
        self.text("SHIP_TO_ADDRESS", &[2], "Fremont CA");
    }

    fn open_order(&self, row: usize, sales_order: &str) {
        self.count("OPEN_ORDER_TABLE_ROW_COUNT", row);
        self.text("OPEN_ORDER_SOLD_TO_ID", &[row], "ACME-01");
        self.text("OPEN_ORDER_SALES_ORDER", &[row], sales_order);
        self.text("OPEN_ORDER_CUSTOMER_PO", &[row], "PO-77");
        self.text("OPEN_ORDER_SHIP_TO_PARTY", &[row], "Acme West");
        self.text("OPEN_ORDER_SHIP_TO_COUNTRY", &[row], "US");
        self.text("OPEN_ORDER_CREATED_TIME", &[row], "01/05/2024");
        self.text("OPEN_ORDER_DETAILS_BUTTON", &[row], "Details");
        self.text("OPEN_ORDER_ASSEMBLY_TYPE", &[], "Standard");
        self.text("OPEN_ORDER_STATUS", &[], "In Production");
        self.text("ESD", &[], "02/01/2024");
        self.text("MESSAGE", &[], "Awaiting parts");
        self.addresses();
    }

    fn items(&self, headers: &[&str], rows: &[&[&str]]) {
        self.text("ORDER_ITEM", &[], "Order Items");
        self.text("ORDER_ITEM_TABLE", &[], "");
        self.put("VIEW_DETAILS_OPEN_ORDER_CHECKBOX", &[], MockElement::checkbox(false));
        self.count("ORDER_ITEM_HEADERS", headers.len());
        for (i, header) in headers.iter().enumerate() {
            self.text("ORDER_ITEM_HEADER_VALUE", &[i + 1], header);
        }
        self.count("ORDER_ITEM_ROWS", rows.len() + 1);
        for (r, cells) in rows.iter().enumerate() {
            for (c, cell) in cells.iter().enumerate() {
                self.text("ORDER_ITEM_ROW_VALUE", &[r + 2, c + 1], cell);
            }
        }
    }

    fn no_items(&self) {
        self.text("ORDER_ITEM", &[], "Order Items");
        self.text("ORDER_ITEM_TABLE", &[], "");
        self.text("ORDER_ITEM_NO_DATA", &[], "No data available");
    }

    fn shipping(&self) {
        self.text("SHIPPING_DETAILS_BUTTON", &[], "Shipping Details");
        let summary = [
            "PK-1",
            "OR-1",
            "Shipped",
            "UPS Ground",
            "Leave at dock",
            "01/20/2024",
            "INV-9",
            "1Z999",
        ];
        for (i, value) in summary.iter().enumerate() {
            self.text("SHIPPING_DETAILS_VALUE", &[i + 1], value);
        }
        self.text("SHIPPING_DETAILS_MORE_BUTTON", &[], "More");
        self.count("SHIPPING_DETAILS_ORDER_ROW", 2);
        let line = ["1", "4", "2", "SYS-1029", "Server", "Server chassis", "01/20/2024 10:00"];
        for (i, value) in line.iter().enumerate() {
            self.text("SHIPPING_DETAILS_ORDER_VALUE", &[2, i + 1], value);
        }
    }
}

const ALL_HEADERS: [&str; 8] = [
    "Item Number",
    "Line No.",
    "Description",
    "QTY Ordered",
    "QTY Shipped",
    "B/O QTY",
    "Unit Price",
    "Extended Price",
];
const ITEM_ROW: [&str; 8] = [
    "SYS-1029",
    "1",
    "Server chassis",
    "4",
    "2",
    "2",
    "1,250.00",
    "5,000.00",
];

fn settings() -> ExtractionSettings {
    ExtractionSettings {
        portal: PortalConfig::default(),
        retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
    }
}

fn run_config(order_type: OrderType) -> RunConfig {
    let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date");
    RunConfig::new(
        vec![order_type],
        vec![CustomerId::new("C100").expect("valid id")],
        date(1),
        date(31),
        "output",
    )
    .expect("valid run")
}

/// One open order on a single result page, with a full items table and
/// one shipment line.
fn single_open_order() -> Portal {
    let portal = Portal::new();
    portal.filters();
    portal.open_order(2, "SO-1001");
    portal.items(&ALL_HEADERS, &[&ITEM_ROW]);
    portal.shipping();
    portal
}

#[tokio::test(start_paused = true)]
async fn test_single_page_open_order() {
    let portal = single_open_order();
    let mut machine = ExtractionStateMachine::new(portal.driver(), settings()).expect("binds");

    let output = machine.run(&run_config(OrderType::Open)).await.expect("run succeeds");

    assert_eq!(machine.state(), MachineState::Done);
    assert_eq!(output.open_orders.len(), 1);
    assert!(output.close_orders.is_empty());
    assert_eq!(
        output.open_orders[0].cells(),
        [
            "C100",
            "SO-1001",
            "PO-77",
            "Acme West",
            "US",
            "01/05/2024",
            "Standard",
            "In Production",
            "100 Main St San Jose CA",
            "200 Dock Rd Fremont CA",
            "02/01/2024",
            "Awaiting parts",
            "1",
            "SYS-1029",
            "Server chassis",
            "4",
            "2",
            "2",
            "1,250.00",
            "5,000.00",
        ]
    );

    assert_eq!(output.shipping_details.len(), 1);
    let shipping = &output.shipping_details[0];
    assert_eq!(shipping.sold_to_id, "C100");
    assert_eq!(shipping.sales_order, "SO-1001");
    assert_eq!(shipping.shipment.tracking_number, "1Z999");
    assert_eq!(shipping.line.timestamps, "01/20/2024 10:00");

    let driver = &portal.driver;
    assert_eq!(driver.navigations(), vec![PortalConfig::default().url]);
    assert_eq!(
        driver.selected_option_of(&portal.key("ORDER_TYPE", &[])).as_deref(),
        Some("Open Order")
    );
    assert_eq!(driver.value_of(&portal.key("FROM_DATE", &[])).as_deref(), Some("01/01/2024"));
    assert_eq!(driver.value_of(&portal.key("TO_DATE", &[])).as_deref(), Some("01/31/2024"));
    assert!(driver.is_checked(&portal.key("VIEW_DETAILS_OPEN_ORDER_CHECKBOX", &[])));
}

#[tokio::test(start_paused = true)]
async fn test_missing_item_column_is_blank() {
    let portal = Portal::new();
    portal.filters();
    portal.open_order(2, "SO-1001");
    let mut headers = ALL_HEADERS;
    headers[5] = "Notes";
    portal.items(&headers, &[&ITEM_ROW]);
    portal.shipping();

    let mut machine = ExtractionStateMachine::new(portal.driver(), settings()).expect("binds");
    let output = machine.run(&run_config(OrderType::Open)).await.expect("run succeeds");

    let items = &output.open_orders[0].items;
    assert_eq!(items.qty_shipped, "2");
    assert_eq!(items.backorder_qty, "");
    assert_eq!(items.unit_price, "1,250.00");
}

#[tokio::test(start_paused = true)]
async fn test_order_without_shipments_keeps_its_rows() {
    let portal = Portal::new();
    portal.filters();
    portal.open_order(2, "SO-1001");
    portal.items(&ALL_HEADERS, &[&ITEM_ROW]);
    portal.text("SHIPPING_DETAILS_BUTTON", &[], "Shipping Details");
    portal.text("NO_SHIPPING_DETAILS", &[], "Shipping details not available");

    let mut machine = ExtractionStateMachine::new(portal.driver(), settings()).expect("binds");
    let output = machine.run(&run_config(OrderType::Open)).await.expect("run succeeds");

    assert_eq!(output.open_orders.len(), 1);
    assert_eq!(output.open_orders[0].summary.sales_order, "SO-1001");
    assert_eq!(output.open_orders[0].items.item_number, "SYS-1029");
    assert!(output.shipping_details.is_empty());
    assert_eq!(machine.state(), MachineState::Done);
}

#[tokio::test(start_paused = true)]
async fn test_item_headers_render_after_second_expand() {
    let portal = Portal::new();
    portal.filters();
    portal.open_order(2, "SO-1001");
    portal.items(&ALL_HEADERS, &[&ITEM_ROW]);
    portal.shipping();
    portal.count("ORDER_ITEM_HEADERS", 0);

    let headers = portal.key("ORDER_ITEM_HEADERS", &[]);
    let mut expands = 0;
    portal.driver.on_click(portal.key("ORDER_ITEM", &[]), move |dom| {
        expands += 1;
        if expands == 2 {
            dom.set_count(headers.clone(), ALL_HEADERS.len());
        }
    });

    let mut machine = ExtractionStateMachine::new(portal.driver(), settings()).expect("binds");
    let output = machine.run(&run_config(OrderType::Open)).await.expect("run succeeds");

    assert_eq!(output.open_orders.len(), 1);
    let items = &output.open_orders[0].items;
    assert_eq!(items.line_no, "1");
    assert_eq!(items.item_number, "SYS-1029");
    assert_eq!(items.extended_price, "5,000.00");
    assert_eq!(portal.driver.click_count(&portal.key("ORDER_ITEM", &[])), 2);
}

#[tokio::test(start_paused = true)]
async fn test_item_headers_that_never_render_exhaust_the_row() {
    let portal = Portal::new();
    portal.filters();
    portal.open_order(2, "SO-1001");
    portal.items(&ALL_HEADERS, &[&ITEM_ROW]);
    portal.shipping();
    portal.count("ORDER_ITEM_HEADERS", 0);

    let settings = settings();
    let max_attempts = settings.retry.max_attempts();
    let mut machine = ExtractionStateMachine::new(portal.driver(), settings).expect("binds");
    let err = machine
        .run(&run_config(OrderType::Open))
        .await
        .expect_err("headers never render");

    assert!(matches!(err, ExtractError::Row { row: 2, .. }));
    assert_eq!(err.attempts(), Some(max_attempts));
    assert!(machine.session().open_orders().is_empty());
    assert!(machine.session().shipping_details().is_empty());
    // One expand plus one re-expand per attempt
    assert_eq!(
        portal.driver.click_count(&portal.key("ORDER_ITEM", &[])),
        2 * max_attempts as usize
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_row_attempt_is_rolled_back() {
    let portal = single_open_order();
    // The open record is already appended when the shipment panel fails
    portal.driver.fail_next(portal.key("SHIPPING_DETAILS_VALUE", &[1]), 1);

    let mut machine = ExtractionStateMachine::new(portal.driver(), settings()).expect("binds");
    let output = machine.run(&run_config(OrderType::Open)).await.expect("retry recovers");

    assert_eq!(output.open_orders.len(), 1);
    assert_eq!(output.shipping_details.len(), 1);
    assert_eq!(portal.driver.click_count(&portal.key("ORDER_ITEM", &[])), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_row_aborts_run() {
    let portal = single_open_order();
    portal.driver.fail_next(portal.key("SHIPPING_DETAILS_VALUE", &[1]), 10);

    let mut machine = ExtractionStateMachine::new(portal.driver(), settings()).expect("binds");
    let err = machine
        .run(&run_config(OrderType::Open))
        .await
        .expect_err("row never succeeds");

    assert_eq!(err.attempts(), Some(3));
    match err {
        ExtractError::Row {
            order_type,
            customer,
            page,
            row,
            ..
        } => {
            assert_eq!(order_type, OrderType::Open);
            assert_eq!(customer, "C100");
            assert_eq!(page, 1);
            assert_eq!(row, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_ne!(machine.state(), MachineState::Done);
}

#[tokio::test(start_paused = true)]
async fn test_closed_orders_across_expanded_pager() {
    let portal = Portal::new();
    portal.filters();
    portal.addresses();
    portal.no_items();

    // Header row, one order, two pager rows
    portal.count("CLOSE_ORDER_TABLE_ROW_COUNT", 4);
    portal.text("CLOSE_ORDER_SALES_ORDER", &[2], "SO-1");
    portal.text("CLOSE_ORDER_ORDER_DATE", &[2], "12/01/2023");
    portal.text("CLOSE_ORDER_CUSTOMER_PO", &[2], "PO-12");
    portal.text("CLOSE_ORDER_ASSEMBLY_TYPE", &[2], "Standard");
    portal.text("CLOSE_ORDER_DETAILS_BUTTON", &[2], "Details");
    portal.text("CLOSE_ORDER_STATUS", &[], "Closed");

    portal.count("PAGE_COUNT", 5);
    for (position, label) in (1..).zip(["1", "2", "3", "4", "..."]) {
        portal.text("SELECT_PAGE", &[position], label);
    }

    let sales_order = portal.key("CLOSE_ORDER_SALES_ORDER", &[2]);
    for page in 2..=4 {
        let sales_order = sales_order.clone();
        portal.driver.on_click(portal.key("SELECT_PAGE", &[page]), move |dom| {
            dom.set_text(&sales_order, &format!("SO-{page}"));
        });
    }

    // The expander lands on page 5 and redraws the pager as "... 5"
    let (first, second, pager) = (
        portal.key("SELECT_PAGE", &[1]),
        portal.key("SELECT_PAGE", &[2]),
        portal.key("PAGE_COUNT", &[]),
    );
    let expander = portal.key("SELECT_PAGE", &[5]);
    portal.driver.on_click(expander.clone(), move |dom| {
        dom.set_text(&first, "...");
        dom.set_text(&second, "5");
        dom.set_count(pager.clone(), 2);
        dom.set_text(&sales_order, "SO-5");
    });

    let mut machine = ExtractionStateMachine::new(portal.driver(), settings()).expect("binds");
    let output = machine.run(&run_config(OrderType::Closed)).await.expect("run succeeds");

    let orders: Vec<&str> = output
        .close_orders
        .iter()
        .map(|record| record.summary.sales_order.as_str())
        .collect();
    assert_eq!(orders, vec!["SO-1", "SO-2", "SO-3", "SO-4", "SO-5"]);
    assert!(output.close_orders.iter().all(|record| record.items.is_blank()));
    assert!(output.close_orders.iter().all(|record| record.cells().len() == 16));
    assert!(output.open_orders.is_empty());
    assert!(output.shipping_details.is_empty());

    assert_eq!(portal.driver.click_count(&expander), 1);
    // Page 5 is reached through the expander, not by clicking position 2 again
    assert_eq!(portal.driver.click_count(&portal.key("SELECT_PAGE", &[2])), 1);
}

#[test]
fn test_drifted_manifest_fails_binding() {
    let drifted = harvest_extract::order_page::MANIFEST.replace("\"ESD\"", "\"ESTIMATED_SHIP_DATE\"");
    let catalog = LocatorCatalog::from_json(&drifted, "drifted.json").expect("still valid json");
    let driver: Arc<dyn Driver> = Arc::new(MockDriver::new());

    match ExtractionStateMachine::with_catalog(driver, catalog, settings()) {
        Err(ExtractError::Browser(BrowserError::Binding { slot, .. })) => assert_eq!(slot, "ESD"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("bound a manifest without ESD"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_spawned_run_returns_output() {
    let portal = single_open_order();

    let output = spawn_extraction(portal.driver(), settings(), run_config(OrderType::Open))
        .await
        .expect("task joins")
        .expect("run succeeds");

    assert_eq!(output.open_orders.len(), 1);
    assert_eq!(output.total_records(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_spawned_run_reports_failure() {
    let portal = Portal::new();
    portal.filters();
    // The portal never lists the customer
    portal.put("CUSTOMER_ID", &[], MockElement::select(&[("C200", "Other Corp")]));

    let err = spawn_extraction(portal.driver(), settings(), run_config(OrderType::Open))
        .await
        .expect("task joins")
        .expect_err("search fails");

    assert!(matches!(err, ExtractError::Search { ref customer, .. } if customer == "C100"));
    assert_eq!(err.attempts(), Some(3));
}
