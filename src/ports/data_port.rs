//! Bar source port trait.

use crate::domain::error::ScalperError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars whose UTC date lies within the optional inclusive range, in source
    /// order. Ordering is not corrected here; the engine rejects regressions.
    fn fetch_bars(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, ScalperError>;
}
