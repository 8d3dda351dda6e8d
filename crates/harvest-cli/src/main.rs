//! `harvest` - extract open and closed orders from the customer portal.

mod export;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};
use harvest_browser::{ChromiumDriver, Driver};
use harvest_core::{parse_portal_date, AppConfig, CustomerId, OrderType, RetryExecutor, RunConfig};
use harvest_extract::{spawn_extraction, ExtractionSettings};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OrderTypeArg {
    Open,
    Closed,
}

impl From<OrderTypeArg> for OrderType {
    fn from(arg: OrderTypeArg) -> Self {
        match arg {
            OrderTypeArg::Open => OrderType::Open,
            OrderTypeArg::Closed => OrderType::Closed,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "harvest", version)]
#[command(about = "Extract order, item and shipping records from the customer portal")]
struct Args {
    /// Order types to extract, in order
    #[arg(short = 't', long = "order-type", value_enum, required = true)]
    order_types: Vec<OrderTypeArg>,

    /// Customer ids to search for, in order
    #[arg(short, long = "customer", required = true)]
    customers: Vec<String>,

    /// First day of the date filter (MM/DD/YYYY)
    #[arg(long, value_parser = parse_portal_date)]
    start: NaiveDate,

    /// Last day of the date filter (MM/DD/YYYY)
    #[arg(long, value_parser = parse_portal_date)]
    end: NaiveDate,

    /// Directory receiving the CSV files; defaults to the configured one
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file; defaults to the platform config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run Chromium without a window
    #[arg(long)]
    headless: bool,

    /// Mirror the log into this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,harvest=debug"));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .with(filter)
        .init();
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides();
            config
        }
        None => AppConfig::load_with_env()?,
    };
    if args.headless {
        config.browser.headless = true;
    }
    config.validate()?;
    Ok(config)
}

fn run_config(args: &Args, config: &AppConfig) -> anyhow::Result<RunConfig> {
    let customers = args
        .customers
        .iter()
        .map(CustomerId::new)
        .collect::<Result<Vec<_>, _>>()?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());

    Ok(RunConfig::new(
        args.order_types.iter().copied().map(OrderType::from).collect(),
        customers,
        args.start,
        args.end,
        output_dir,
    )?)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let run = run_config(&args, &config)?;
    info!(
        portal = %config.portal.url,
        start = %run.start_date_text(),
        end = %run.end_date_text(),
        output = %run.output_dir().display(),
        "starting harvest"
    );

    let driver = Arc::new(
        ChromiumDriver::launch(&config.browser)
            .await
            .context("launching Chromium")?,
    );
    let handle = spawn_extraction(
        Arc::clone(&driver) as Arc<dyn Driver>,
        ExtractionSettings::from_config(&config),
        run.clone(),
    );
    let result = handle.await.context("extraction task panicked")?;

    match Arc::try_unwrap(driver) {
        Ok(driver) => {
            if let Err(e) = driver.close().await {
                warn!(error = %e, "failed to close Chromium");
            }
        }
        Err(_) => warn!("driver still shared, leaving Chromium to exit with the process"),
    }

    let output = result?;
    info!(records = output.total_records(), "extraction complete, writing output");

    let executor = RetryExecutor::new(config.retry.policy());
    let timestamp = Local::now();
    let files = tokio::task::spawn_blocking(move || {
        export::write_all(&executor, run.output_dir(), &output, timestamp)
    })
    .await
    .context("export task panicked")??;

    info!(
        open_orders = %files.open_orders.display(),
        close_orders = %files.close_orders.display(),
        shipping_details = %files.shipping_details.display(),
        "output written"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_tracing(args.log_file.as_deref()) {
        eprintln!("harvest: {e:#}");
        return ExitCode::FAILURE;
    }
    info!("Starting Harvest v{}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => {
            info!("run passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "run failed");
            ExitCode::FAILURE
        }
    }
}
