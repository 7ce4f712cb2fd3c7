//! Trade report port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ScalperError;

/// Port for persisting the trades of a finished run.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), ScalperError>;
}
