#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use scalptrader::domain::config::StrategyConfig;
use scalptrader::domain::error::ScalperError;
use scalptrader::domain::indicator::IndicatorValues;
pub use scalptrader::domain::ohlcv::Bar;
use scalptrader::ports::data_port::DataPort;

pub struct MockDataPort {
    pub bars: Vec<Bar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, ScalperError> {
        if let Some(reason) = &self.error {
            return Err(ScalperError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date() >= s))
            .filter(|b| end_date.is_none_or(|e| b.date() <= e))
            .copied()
            .collect())
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
}

pub fn minute(i: i64) -> DateTime<Utc> {
    start_time() + Duration::minutes(i)
}

/// A one-minute bar with a ±0.5 range around `close`.
pub fn make_bar(i: i64, close: f64) -> Bar {
    Bar {
        timestamp: minute(i),
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 1000.0,
    }
}

pub fn make_ohlc(i: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: minute(i),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// One bar per minute tracing a sine wave around 100.
pub fn sine_bars(count: usize, amplitude: f64, period: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / period;
            make_bar(i as i64, 100.0 + amplitude * phase.sin())
        })
        .collect()
}

/// Short periods and wide-open gates so a sine wave produces trades.
pub fn permissive_config() -> StrategyConfig {
    StrategyConfig {
        fast_ema_period: 3,
        slow_ema_period: 8,
        trend_ema_period: 10,
        macd_fast: 3,
        macd_slow: 8,
        macd_signal: 3,
        rsi_period: 5,
        adx_period: 5,
        atr_period: 5,
        bb_period: 3,
        volume_ma_period: 5,
        rsi_overbought: 100.0,
        rsi_oversold: 0.0,
        rsi_neutral_low: 0.0,
        rsi_neutral_high: 100.0,
        adx_threshold: 0.0,
        volume_threshold: 0.0,
        cooldown_bars: 0,
        max_daily_loss_pct: 100.0,
        max_daily_trades: 10_000,
        session_start_utc: 0,
        session_end_utc: 23,
        avoid_first_minutes: 0,
        avoid_last_minutes: 0,
        ..StrategyConfig::default()
    }
}

/// Snapshot values with no cross, a flat market and the given ATR.
pub fn make_values(price: f64, atr: f64) -> IndicatorValues {
    IndicatorValues {
        fast_ema: price,
        slow_ema: price,
        prev_fast_ema: price,
        prev_slow_ema: price,
        trend_ema: price,
        macd_line: 0.0,
        macd_signal: 0.0,
        macd_histogram: 0.0,
        adx: 0.0,
        plus_di: 0.0,
        minus_di: 0.0,
        rsi: 50.0,
        bb_upper: price + 2.0 * atr,
        bb_middle: price,
        bb_lower: price - 2.0 * atr,
        atr,
        volume_ma: 1000.0,
    }
}

pub const SAMPLE_INI: &str = r#"
[indicators]
fast_ema_period = 3
slow_ema_period = 8
trend_ema_period = 10
macd_fast = 3
macd_slow = 8
macd_signal = 3
rsi_period = 5
adx_period = 5
atr_period = 5
bb_period = 3
volume_ma_period = 5

[signal]
rsi_overbought = 100
rsi_oversold = 0
rsi_neutral_low = 0
rsi_neutral_high = 100
adx_threshold = 0
volume_threshold = 0
cooldown_bars = 0

[risk]
max_daily_loss_pct = 100
max_daily_trades = 10000

[session]
session_start_utc = 0
session_end_utc = 23
avoid_first_minutes = 0
avoid_last_minutes = 0
"#;

/// Render bars in the CSV input format.
pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("datetime,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
