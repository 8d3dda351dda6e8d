//! Runs an extraction on its own task.

use crate::error::Result;
use crate::machine::{ExtractionSettings, ExtractionStateMachine};
use crate::session::ExtractionOutput;
use harvest_browser::Driver;
use harvest_core::RunConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Spawn a complete extraction run and return its handle.
///
/// The run owns the driver for its whole duration and cannot be cancelled
/// midway; the handle resolves once every order type and customer has been
/// processed or the first fatal error occurs.
pub fn spawn_extraction(
    driver: Arc<dyn Driver>,
    settings: ExtractionSettings,
    run: RunConfig,
) -> JoinHandle<Result<ExtractionOutput>> {
    let run_id = Uuid::new_v4();
    let span = info_span!("extraction", %run_id);

    tokio::spawn(
        async move {
            info!(
                order_types = run.order_types().len(),
                customers = run.customer_ids().len(),
                "extraction started"
            );

            let result = match ExtractionStateMachine::new(driver, settings) {
                Ok(mut machine) => machine.run(&run).await,
                Err(e) => Err(e),
            };

            if let Err(ref e) = result {
                error!(error = %e, "extraction failed");
            }
            result
        }
        .instrument(span),
    )
}
