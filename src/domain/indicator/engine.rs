//! Drives every indicator from a single bar stream.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::adx::Adx;
use super::atr::Atr;
use super::bollinger::Bollinger;
use super::ema::Ema;
use super::macd::Macd;
use super::rsi::Rsi;
use super::sma::Sma;
use super::{IndicatorSnapshot, IndicatorValues};
use crate::domain::config::StrategyConfig;
use crate::domain::error::DataError;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    fast: Ema,
    slow: Ema,
    trend: Ema,
    macd: Macd,
    rsi: Rsi,
    adx: Adx,
    atr: Atr,
    bollinger: Bollinger,
    volume_ma: Sma,
    prev_fast_slow: Option<(f64, f64)>,
    last_timestamp: Option<DateTime<Utc>>,
    bars_seen: usize,
    warm: bool,
}

impl IndicatorEngine {
    pub fn new(config: &StrategyConfig) -> Self {
        IndicatorEngine {
            fast: Ema::new(config.fast_ema_period),
            slow: Ema::new(config.slow_ema_period),
            trend: Ema::new(config.trend_ema_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            rsi: Rsi::new(config.rsi_period),
            adx: Adx::new(config.adx_period),
            atr: Atr::new(config.atr_period),
            bollinger: Bollinger::new(config.bb_period, config.bb_dev),
            volume_ma: Sma::new(config.volume_ma_period),
            prev_fast_slow: None,
            last_timestamp: None,
            bars_seen: 0,
            warm: false,
        }
    }

    /// Consume one bar and publish the snapshot for it.
    ///
    /// A bar that fails validation or is earlier than the last accepted one
    /// is rejected before any state changes.
    pub fn update(&mut self, bar: &Bar) -> Result<IndicatorSnapshot, DataError> {
        if let Some(last) = self.last_timestamp {
            if bar.timestamp < last {
                return Err(DataError::OutOfOrder {
                    timestamp: bar.timestamp,
                    last,
                });
            }
        }
        bar.check()?;

        self.last_timestamp = Some(bar.timestamp);
        self.bars_seen += 1;

        let fast = self.fast.update(bar.close);
        let slow = self.slow.update(bar.close);
        let trend = self.trend.update(bar.close);
        let macd = self.macd.update(bar.close);
        let rsi = self.rsi.update(bar.close);
        let adx = self.adx.update(bar);
        let atr = self.atr.update(bar);
        let bb = self.bollinger.update(bar.close);
        let volume_ma = self.volume_ma.update(bar.volume);

        let prev = self.prev_fast_slow;
        self.prev_fast_slow = fast.zip(slow);

        let values = match (prev, fast, slow, trend, macd, rsi, adx, atr, bb, volume_ma) {
            (
                Some((prev_fast_ema, prev_slow_ema)),
                Some(fast_ema),
                Some(slow_ema),
                Some(trend_ema),
                Some(macd),
                Some(rsi),
                Some(adx),
                Some(atr),
                Some(bb),
                Some(volume_ma),
            ) => Some(IndicatorValues {
                fast_ema,
                slow_ema,
                prev_fast_ema,
                prev_slow_ema,
                trend_ema,
                macd_line: macd.line,
                macd_signal: macd.signal,
                macd_histogram: macd.histogram,
                adx: adx.adx,
                plus_di: adx.plus_di,
                minus_di: adx.minus_di,
                rsi,
                bb_upper: bb.upper,
                bb_middle: bb.middle,
                bb_lower: bb.lower,
                atr,
                volume_ma,
            }),
            _ => None,
        };

        if values.is_some() && !self.warm {
            self.warm = true;
            debug!(bars = self.bars_seen, at = %bar.timestamp, "indicators warmed up");
        }

        Ok(IndicatorSnapshot {
            timestamp: bar.timestamp,
            bars_seen: self.bars_seen,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn small_config() -> StrategyConfig {
        StrategyConfig {
            fast_ema_period: 2,
            slow_ema_period: 4,
            trend_ema_period: 5,
            macd_fast: 2,
            macd_slow: 4,
            macd_signal: 2,
            rsi_period: 3,
            adx_period: 3,
            atr_period: 3,
            bb_period: 4,
            volume_ma_period: 3,
            ..StrategyConfig::default()
        }
    }

    fn bar_at(minute: i64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
                + Duration::minutes(minute),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn warm_at_configured_warmup() {
        let config = small_config();
        let warmup = config.warmup_bars();
        assert_eq!(warmup, 6);
        let mut engine = IndicatorEngine::new(&config);
        for i in 0..warmup {
            let close = 100.0 + (i as f64 * 0.9).sin();
            let snap = engine.update(&bar_at(i as i64, close)).unwrap();
            if i + 1 < warmup {
                assert!(snap.values.is_none(), "bar {} should still be warming", i + 1);
            } else {
                assert!(snap.values.is_some());
            }
        }
        assert_eq!(engine.bars_seen, warmup);
    }

    #[test]
    fn out_of_order_bar_leaves_state_untouched() {
        let mut engine = IndicatorEngine::new(&small_config());
        engine.update(&bar_at(5, 100.0)).unwrap();
        let before = engine.bars_seen;

        let err = engine.update(&bar_at(3, 101.0)).unwrap_err();
        assert!(matches!(err, DataError::OutOfOrder { .. }));
        assert_eq!(engine.bars_seen, before);
        assert_eq!(engine.last_timestamp, Some(bar_at(5, 100.0).timestamp));
    }

    #[test]
    fn equal_timestamp_is_accepted() {
        let mut engine = IndicatorEngine::new(&small_config());
        engine.update(&bar_at(1, 100.0)).unwrap();
        assert!(engine.update(&bar_at(1, 100.5)).is_ok());
        assert_eq!(engine.bars_seen, 2);
    }

    #[test]
    fn malformed_bar_rejected() {
        let mut engine = IndicatorEngine::new(&small_config());
        let mut bar = bar_at(0, 100.0);
        bar.close = f64::NAN;
        assert!(matches!(
            engine.update(&bar),
            Err(DataError::NonFinite { field: "close", .. })
        ));
        assert_eq!(engine.bars_seen, 0);
        assert!(engine.last_timestamp.is_none());
    }

    #[test]
    fn previous_emas_track_prior_bar() {
        let config = small_config();
        let mut engine = IndicatorEngine::new(&config);
        let mut last: Option<IndicatorValues> = None;
        for i in 0..20 {
            let snap = engine.update(&bar_at(i, 100.0 + i as f64)).unwrap();
            if let (Some(prev), Some(cur)) = (last, snap.values) {
                assert!((cur.prev_fast_ema - prev.fast_ema).abs() < f64::EPSILON);
                assert!((cur.prev_slow_ema - prev.slow_ema).abs() < f64::EPSILON);
            }
            last = snap.values;
        }
    }
}
