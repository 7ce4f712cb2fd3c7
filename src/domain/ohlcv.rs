//! OHLCV bar representation.

use chrono::{DateTime, NaiveDate, Utc};

use super::error::DataError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// UTC calendar date; the trading-day key.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Checks the bar is usable on its own, ignoring ordering.
    pub fn check(&self) -> Result<(), DataError> {
        let timestamp = self.timestamp;
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (field, value) in prices {
            if !value.is_finite() {
                return Err(DataError::NonFinite { timestamp, field });
            }
            if value <= 0.0 {
                return Err(DataError::NonPositivePrice { timestamp, field });
            }
        }
        if !self.volume.is_finite() {
            return Err(DataError::NonFinite {
                timestamp,
                field: "volume",
            });
        }
        if self.volume < 0.0 {
            return Err(DataError::NegativeVolume { timestamp });
        }
        if self.high < self.low {
            return Err(DataError::InvertedRange { timestamp });
        }
        Ok(())
    }
}
