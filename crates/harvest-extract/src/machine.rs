//! The extraction state machine.
//!
//! ```text
//! SelectFilter -> AwaitResults -> ExtractPage -> NextPage -> ExtractPage ...
//!                                            \-> Done
//! ```
//!
//! For each order type the filters are set once; for each customer a fresh
//! search runs and every result page is extracted. Each order row runs
//! under the retry executor with a rollback hook, so records appended by a
//! failed attempt never survive into the next one. A row that exhausts its
//! retries aborts the whole run.

use crate::error::{ExtractError, Result};
use crate::order_page::{CustomerOrdersPage, FIRST_DATA_ROW};
use crate::pagination::{PageTraversal, PagerStep};
use crate::records::{CloseOrderRecord, OpenOrderRecord};
use crate::session::{Checkpoint, ExtractionOutput, ExtractionSession};
use futures::FutureExt;
use harvest_browser::{BrowserError, Driver, PageModel};
use harvest_core::{AppConfig, CustomerId, OrderType, PortalConfig, RetryExecutor, RetryPolicy, RunConfig};
use harvest_locator::LocatorCatalog;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const PAGER_PROBE: Duration = Duration::from_secs(2);
const PAGE_SETTLE: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_secs(2);

/// Position 1 holds the first page or a leading expander.
const FIRST_PAGER_POSITION: usize = 2;

/// Portal and retry settings for one run.
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub portal: PortalConfig,
    pub retry: RetryPolicy,
}

impl ExtractionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            portal: config.portal.clone(),
            retry: config.retry.policy(),
        }
    }

    /// Order-type dropdown text for `order_type`.
    pub fn order_type_label(&self, order_type: OrderType) -> &str {
        match order_type {
            OrderType::Open => &self.portal.open_order_label,
            OrderType::Closed => &self.portal.closed_order_label,
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Where the machine is in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Idle,
    SelectFilter,
    AwaitResults,
    ExtractPage,
    NextPage,
    Done,
}

/// Everything one row attempt touches.
struct RowScope<'a> {
    page: &'a CustomerOrdersPage,
    session: &'a mut ExtractionSession,
    checkpoint: Checkpoint,
    customer: &'a CustomerId,
    order_type: OrderType,
    row: usize,
}

impl RowScope<'_> {
    async fn extract(&mut self) -> harvest_browser::Result<()> {
        match self.order_type {
            OrderType::Open => {
                let summary = self.page.read_open_order(self.row, self.customer).await?;
                let items = self.page.read_items(OrderType::Open).await?;
                debug!(row = self.row, sales_order = %summary.sales_order, lines = items.len(), "open order read");

                let shipping_for = summary.sales_order.clone();
                for items in items {
                    self.session.push_open(OpenOrderRecord {
                        summary: summary.clone(),
                        items,
                    });
                }
                for record in self.page.read_shipping(self.customer, &shipping_for).await? {
                    self.session.push_shipping(record);
                }
            }
            OrderType::Closed => {
                let summary = self.page.read_close_order(self.row, self.customer).await?;
                let items = self.page.read_items(OrderType::Closed).await?;
                debug!(row = self.row, sales_order = %summary.sales_order, lines = items.len(), "closed order read");

                for items in items {
                    self.session.push_close(CloseOrderRecord {
                        summary: summary.clone(),
                        items,
                    });
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self, error: &BrowserError) {
        warn!(row = self.row, error = %error, "row attempt failed, discarding its records");
        self.session.restore(self.checkpoint);
    }
}

/// Drives the customer orders page through one extraction run.
pub struct ExtractionStateMachine {
    page: CustomerOrdersPage,
    settings: ExtractionSettings,
    executor: RetryExecutor,
    session: ExtractionSession,
    state: MachineState,
}

impl ExtractionStateMachine {
    /// Bind the page model from the embedded locator manifest.
    pub fn new(driver: Arc<dyn Driver>, settings: ExtractionSettings) -> Result<Self> {
        let catalog = CustomerOrdersPage::catalog()?;
        Self::with_catalog(driver, catalog, settings)
    }

    /// Bind the page model from a caller-supplied catalog.
    pub fn with_catalog(driver: Arc<dyn Driver>, catalog: LocatorCatalog, settings: ExtractionSettings) -> Result<Self> {
        let model = PageModel::new(driver, Arc::new(catalog), settings.portal.page_timeout())
            .with_poll_interval(settings.portal.poll_interval());
        let page = CustomerOrdersPage::bind(model, settings.portal.cell_timeout())?;

        Ok(Self {
            page,
            executor: RetryExecutor::new(settings.retry),
            settings,
            session: ExtractionSession::new(),
            state: MachineState::Idle,
        })
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn session(&self) -> &ExtractionSession {
        &self.session
    }

    fn transition(&mut self, next: MachineState) {
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    /// Extract every order type for every customer and hand back the
    /// accumulated record sets.
    pub async fn run(&mut self, run: &RunConfig) -> Result<ExtractionOutput> {
        for &order_type in run.order_types() {
            info!(%order_type, "processing order type");
            self.session.begin_order_type(order_type);

            self.transition(MachineState::SelectFilter);
            self.select_filters(order_type, run).await?;
            info!(start = %run.start_date_text(), end = %run.end_date_text(), "date filter set");

            for customer in run.customer_ids() {
                info!(%customer, "processing customer");
                self.session.begin_customer(customer.clone());

                self.transition(MachineState::AwaitResults);
                self.search(customer).await?;

                self.transition(MachineState::ExtractPage);
                self.extract_page(order_type, customer).await?;
                self.traverse_pages(order_type, customer).await?;

                sleep(SETTLE).await;
            }

            sleep(SETTLE).await;
        }

        self.transition(MachineState::Done);
        let output = std::mem::take(&mut self.session).into_output();
        info!(
            open_orders = output.open_orders.len(),
            close_orders = output.close_orders.len(),
            shipping_details = output.shipping_details.len(),
            "extraction finished"
        );
        Ok(output)
    }

    async fn select_filters(&self, order_type: OrderType, run: &RunConfig) -> Result<()> {
        let page = &self.page;
        let url = self.settings.portal.url.as_str();
        let label = self.settings.order_type_label(order_type);
        let (from, to) = (run.start_date_text(), run.end_date_text());

        self.executor
            .execute_async(|| page.set_filters(url, label, &from, &to), |_| {})
            .await
            .map_err(|source| ExtractError::Filter { order_type, source })
    }

    async fn search(&self, customer: &CustomerId) -> Result<()> {
        let page = &self.page;
        self.executor
            .execute_async(|| page.search(customer), |_| {})
            .await
            .map_err(|source| ExtractError::Search {
                customer: customer.to_string(),
                source,
            })
    }

    /// Extract every order row on the current result page.
    async fn extract_page(&mut self, order_type: OrderType, customer: &CustomerId) -> Result<()> {
        let last_row = self.page.last_order_row(order_type).await?;
        let page_no = self.session.cursor().page;
        info!(page = page_no, orders = last_row.saturating_sub(1), "extracting page");

        for row in FIRST_DATA_ROW..=last_row {
            let mut scope = RowScope {
                page: &self.page,
                checkpoint: self.session.checkpoint(),
                session: &mut self.session,
                customer,
                order_type,
                row,
            };

            self.executor
                .execute_async_with(
                    &mut scope,
                    |scope| scope.extract().boxed(),
                    |scope, error| scope.rollback(error),
                )
                .await
                .map_err(|source| ExtractError::Row {
                    order_type,
                    customer: customer.to_string(),
                    page: page_no,
                    row,
                    source,
                })?;
        }
        Ok(())
    }

    /// Walk the pager from page 2 until the last page has been extracted.
    async fn traverse_pages(&mut self, order_type: OrderType, customer: &CustomerId) -> Result<()> {
        let mut traversal = PageTraversal::new();

        loop {
            if !self.page.pager_visible(PAGER_PROBE).await? {
                debug!("no pager, single result page");
                break;
            }
            if traversal.is_finished() {
                break;
            }

            self.transition(MachineState::NextPage);
            let count = self.page.pager_size().await?;
            let mut progressed = false;

            for position in FIRST_PAGER_POSITION..=count {
                let button = self.page.pager_button(position);
                let text = button.get_text().await?;

                match traversal.observe(position, count, &text) {
                    PagerStep::Skip => {}
                    PagerStep::Expand => {
                        debug!(position, "expanding pager");
                        button.click().await?;
                        progressed = true;
                        break;
                    }
                    PagerStep::Visit { page, click } => {
                        if click {
                            button.click().await?;
                        }
                        progressed = true;
                        sleep(PAGE_SETTLE).await;

                        info!(page, "processing page");
                        self.session.set_page(page);
                        self.transition(MachineState::ExtractPage);
                        self.extract_page(order_type, customer).await?;
                    }
                }
            }

            if !progressed {
                warn!(next_page = traversal.next_page(), "pager offers no further page, stopping");
                break;
            }
        }
        Ok(())
    }
}
