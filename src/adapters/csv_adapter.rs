//! CSV bar file adapter.
//!
//! Columns: `datetime,open,high,low,close,volume` with a header row.
//! `datetime` is `%Y-%m-%d %H:%M:%S` in UTC or RFC 3339 with any offset.

use crate::domain::error::ScalperError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::PathBuf;
use tracing::debug;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

fn source_error(reason: impl Into<String>) -> ScalperError {
    ScalperError::DataSource {
        reason: reason.into(),
    }
}

fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, ScalperError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| source_error(format!("invalid datetime '{raw}': {e}")))
}

fn parse_field(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<f64, ScalperError> {
    record
        .get(index)
        .ok_or_else(|| source_error(format!("line {line}: missing {name} column")))?
        .parse()
        .map_err(|e| source_error(format!("line {line}: invalid {name} value: {e}")))
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, ScalperError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| source_error(format!("failed to read {}: {}", self.path.display(), e)))?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| source_error(format!("CSV parse error: {e}")))?;
            let line = record.position().map_or(0, |p| p.line());

            let raw = record
                .get(0)
                .ok_or_else(|| source_error(format!("line {line}: missing datetime column")))?;
            let timestamp = parse_datetime(raw)?;

            let date = timestamp.date_naive();
            if start_date.is_some_and(|start| date < start)
                || end_date.is_some_and(|end| date > end)
            {
                continue;
            }

            bars.push(Bar {
                timestamp,
                open: parse_field(&record, 1, "open", line)?,
                high: parse_field(&record, 2, "high", line)?,
                low: parse_field(&record, 3, "low", line)?,
                close: parse_field(&record, 4, "close", line)?,
                volume: parse_field(&record, 5, "volume", line)?,
            });
        }

        debug!(path = %self.path.display(), bars = bars.len(), "bars loaded");
        Ok(bars)
    }
}
