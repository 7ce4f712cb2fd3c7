//! Streaming technical indicators.
//!
//! Every indicator here is incremental: `update` consumes one input and
//! returns `None` until its warmup window is full. [`engine::IndicatorEngine`]
//! drives them together and publishes an [`IndicatorSnapshot`] per bar.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;
pub mod sma;

use chrono::{DateTime, Utc};

/// Every indicator value for one bar, present only once all are warmed up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorValues {
    pub fast_ema: f64,
    pub slow_ema: f64,
    /// Previous bar's fast EMA, for crossover detection.
    pub prev_fast_ema: f64,
    /// Previous bar's slow EMA, for crossover detection.
    pub prev_slow_ema: f64,
    pub trend_ema: f64,
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub rsi: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub atr: f64,
    pub volume_ma: f64,
}

impl IndicatorValues {
    /// Fast EMA moved from at-or-below to strictly above the slow EMA.
    pub fn crossed_up(&self) -> bool {
        self.prev_fast_ema <= self.prev_slow_ema && self.fast_ema > self.slow_ema
    }

    /// Fast EMA moved from at-or-above to strictly below the slow EMA.
    pub fn crossed_down(&self) -> bool {
        self.prev_fast_ema >= self.prev_slow_ema && self.fast_ema < self.slow_ema
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Accepted bars so far, including this one.
    pub bars_seen: usize,
    /// `None` while any indicator is still warming up.
    pub values: Option<IndicatorValues>,
}
