//! CSV sink for the three record sets.
//!
//! Files are named `Output_<timestamp>_<set>.csv` and always carry the header
//! row, even when the set is empty. Each file write runs under the retry
//! executor so a transiently locked file does not lose a finished run.

use anyhow::Context;
use chrono::{DateTime, Local};
use harvest_core::RetryExecutor;
use harvest_extract::{ExtractionOutput, Record, CLOSE_ORDER_WIDTH, OPEN_ORDER_WIDTH, SHIPPING_DETAIL_WIDTH};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SEPARATOR: char = ',';

/// Paths of the files written for one run.
#[derive(Debug, Clone)]
pub struct WrittenFiles {
    pub open_orders: PathBuf,
    pub close_orders: PathBuf,
    pub shipping_details: PathBuf,
}

/// Common prefix of every file written at `timestamp`.
pub fn file_stem(timestamp: DateTime<Local>) -> String {
    format!("Output_{}", timestamp.format("%Y_%m_%d_%H_%M_%S"))
}

/// Write all three record sets into `dir`, creating it if needed.
pub fn write_all(
    executor: &RetryExecutor,
    dir: &Path,
    output: &ExtractionOutput,
    timestamp: DateTime<Local>,
) -> anyhow::Result<WrittenFiles> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))?;

    let stem = file_stem(timestamp);
    let files = WrittenFiles {
        open_orders: dir.join(format!("{stem}_open_orders.csv")),
        close_orders: dir.join(format!("{stem}_close_orders.csv")),
        shipping_details: dir.join(format!("{stem}_shipping_details.csv")),
    };

    write_with_retry::<_, OPEN_ORDER_WIDTH>(executor, &files.open_orders, &output.open_orders)?;
    write_with_retry::<_, CLOSE_ORDER_WIDTH>(executor, &files.close_orders, &output.close_orders)?;
    write_with_retry::<_, SHIPPING_DETAIL_WIDTH>(executor, &files.shipping_details, &output.shipping_details)?;
    Ok(files)
}

fn write_with_retry<R: Record<N>, const N: usize>(
    executor: &RetryExecutor,
    path: &Path,
    records: &[R],
) -> anyhow::Result<()> {
    executor
        .execute(
            || write_records::<R, N>(path, records),
            |e| warn!(path = %path.display(), error = %e, "write failed"),
        )
        .with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), records = records.len(), "record set written");
    Ok(())
}

/// Write a header row followed by one row per record.
pub fn write_records<R: Record<N>, const N: usize>(path: &Path, records: &[R]) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_row(&mut w, &R::HEADERS)?;
    for record in records {
        write_row(&mut w, &record.cells())?;
    }
    w.flush()
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single row, quoting fields that need it.
pub fn write_row<W: Write>(w: &mut W, row: &[&str]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{SEPARATOR}")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use harvest_core::RetryPolicy;
    use harvest_extract::{
        ItemColumns, OpenOrderRecord, OpenOrderSummary, ShipmentLine, ShipmentSummary, ShippingDetailRecord,
    };
    use std::time::Duration;
    use tempfile::TempDir;

    fn executor() -> RetryExecutor {
        RetryExecutor::new(RetryPolicy::fixed(2, Duration::ZERO))
    }

    fn timestamp() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 7, 14, 5, 9)
            .single()
            .expect("unambiguous local time")
    }

    fn open_record() -> OpenOrderRecord {
        OpenOrderRecord {
            summary: OpenOrderSummary {
                sold_to_id: "C100".to_string(),
                sales_order: "SO-1001".to_string(),
                message: "Ship \"as is\"".to_string(),
                ..OpenOrderSummary::default()
            },
            items: ItemColumns {
                unit_price: "1,250.00".to_string(),
                ..ItemColumns::default()
            },
        }
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(timestamp()), "Output_2024_03_07_14_05_09");
    }

    #[test]
    fn test_write_row_quotes_when_needed() {
        let mut buf = Vec::new();
        write_row(&mut buf, &["plain", "1,250.00", "say \"hi\"", "two\nlines"]).expect("write");
        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "plain,\"1,250.00\",\"say \"\"hi\"\"\",\"two\nlines\"\n"
        );
    }

    #[test]
    fn test_write_all_creates_three_files() {
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("runs");
        let output = ExtractionOutput {
            open_orders: vec![open_record()],
            close_orders: Vec::new(),
            shipping_details: vec![ShippingDetailRecord {
                sold_to_id: "C100".to_string(),
                sales_order: "SO-1001".to_string(),
                shipment: ShipmentSummary::default(),
                line: ShipmentLine::default(),
            }],
        };

        let files = write_all(&executor(), &dir, &output, timestamp()).expect("written");

        assert_eq!(
            files.open_orders.file_name().and_then(|n| n.to_str()),
            Some("Output_2024_03_07_14_05_09_open_orders.csv")
        );

        let open = fs::read_to_string(&files.open_orders).expect("open file");
        let lines: Vec<&str> = open.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Sold To ID,Sales Order,Customer PO"));
        assert!(lines[1].starts_with("C100,SO-1001,"));
        assert!(lines[1].contains("\"Ship \"\"as is\"\"\""));
        assert!(lines[1].contains("\"1,250.00\""));

        // Empty sets still get their header
        let close = fs::read_to_string(&files.close_orders).expect("close file");
        assert_eq!(close.lines().count(), 1);
        assert_eq!(
            close.lines().next().map(|h| h.split(',').count()),
            Some(CLOSE_ORDER_WIDTH)
        );

        let shipping = fs::read_to_string(&files.shipping_details).expect("shipping file");
        assert_eq!(shipping.lines().count(), 2);
    }

    #[test]
    fn test_unwritable_path_reports_after_retries() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("missing").join("out.csv");

        let records: &[OpenOrderRecord] = &[];
        let err = write_with_retry::<_, OPEN_ORDER_WIDTH>(&executor(), &path, records)
            .expect_err("parent missing");
        let message = format!("{err:#}");
        assert!(message.contains("out.csv"));
        assert!(message.contains("2 attempt(s)"));
    }
}
