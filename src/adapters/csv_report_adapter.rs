//! CSV trade report adapter implementing ReportPort.
//!
//! One row per closed trade, in close order.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ScalperError;
use crate::domain::position::TradeRecord;
use crate::ports::report_port::ReportPort;

const HEADER: [&str; 17] = [
    "side",
    "entry_time",
    "exit_time",
    "entry_price",
    "exit_price",
    "avg_exit_price",
    "initial_size",
    "partial_size",
    "partial_price",
    "pnl",
    "commission",
    "r_multiple",
    "exit_reason",
    "duration_min",
    "entry_atr",
    "entry_adx",
    "entry_rsi",
];

#[derive(Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

fn row(trade: &TradeRecord) -> Vec<String> {
    let (partial_size, partial_price) = match trade.partial_fill {
        Some(fill) => (format!("{:.6}", fill.size), format!("{:.6}", fill.price)),
        None => (String::new(), String::new()),
    };
    vec![
        trade.side.as_str().to_string(),
        trade.entry_time.to_rfc3339(),
        trade.exit_time.to_rfc3339(),
        format!("{:.6}", trade.entry_price),
        format!("{:.6}", trade.exit_price),
        format!("{:.6}", trade.avg_exit_price),
        format!("{:.6}", trade.initial_size),
        partial_size,
        partial_price,
        format!("{:.4}", trade.pnl),
        format!("{:.4}", trade.commission),
        format!("{:.4}", trade.r_multiple),
        trade.exit_reason.as_str().to_string(),
        format!("{:.1}", trade.duration_minutes()),
        format!("{:.6}", trade.entry_values.atr),
        format!("{:.2}", trade.entry_values.adx),
        format!("{:.2}", trade.entry_values.rsi),
    ]
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), ScalperError> {
        let mut writer = csv::Writer::from_path(output_path).map_err(std::io::Error::from)?;
        writer.write_record(HEADER).map_err(std::io::Error::from)?;
        for trade in &result.ledger.trades {
            writer.write_record(row(trade)).map_err(std::io::Error::from)?;
        }
        writer.flush()?;
        Ok(())
    }
}
