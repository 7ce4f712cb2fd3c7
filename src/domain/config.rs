//! Strategy configuration.
//!
//! One immutable value bound at engine construction and handed by reference
//! to every component. Percent-valued fields (`risk_per_trade`,
//! `max_daily_loss_pct`, `commission_pct`) are expressed in percent, so `0.5`
//! means 0.5 %.

use chrono::{DateTime, Timelike, Utc};

use super::config_validation::validate_strategy_config;
use super::error::ScalperError;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    // [indicators]
    pub fast_ema_period: usize,
    pub slow_ema_period: usize,
    pub trend_ema_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub adx_period: usize,
    pub atr_period: usize,
    pub bb_period: usize,
    pub bb_dev: f64,
    pub volume_ma_period: usize,

    // [signal]
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub rsi_neutral_low: f64,
    pub rsi_neutral_high: f64,
    pub adx_threshold: f64,
    pub volume_threshold: f64,
    pub use_trend_filter: bool,
    pub cooldown_bars: usize,

    // [risk]
    pub atr_stop_multiplier: f64,
    pub atr_target_multiplier: f64,
    pub atr_breakeven_multiplier: f64,
    pub breakeven_buffer_atr: f64,
    pub use_trailing_stop: bool,
    pub trailing_activation_atr: f64,
    pub trailing_distance_atr: f64,
    pub use_partial_exits: bool,
    pub partial_exit_atr: f64,
    pub partial_exit_fraction: f64,
    pub risk_per_trade: f64,
    pub max_position_size: f64,
    pub max_daily_loss_pct: f64,
    pub max_daily_trades: usize,

    // [session]
    pub session_start_utc: u32,
    pub session_end_utc: u32,
    pub avoid_first_minutes: u32,
    pub avoid_last_minutes: u32,

    // [account]
    pub initial_equity: f64,

    // [backtest]
    /// Fee per fill, in percent of the fill's notional.
    pub commission_pct: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            fast_ema_period: 5,
            slow_ema_period: 13,
            trend_ema_period: 50,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            adx_period: 14,
            atr_period: 14,
            bb_period: 20,
            bb_dev: 2.0,
            volume_ma_period: 20,

            rsi_overbought: 65.0,
            rsi_oversold: 35.0,
            rsi_neutral_low: 45.0,
            rsi_neutral_high: 55.0,
            adx_threshold: 20.0,
            volume_threshold: 1.3,
            use_trend_filter: false,
            cooldown_bars: 2,

            atr_stop_multiplier: 1.5,
            atr_target_multiplier: 2.5,
            atr_breakeven_multiplier: 1.0,
            breakeven_buffer_atr: 0.1,
            use_trailing_stop: true,
            trailing_activation_atr: 1.0,
            trailing_distance_atr: 1.2,
            use_partial_exits: true,
            partial_exit_atr: 1.5,
            partial_exit_fraction: 0.5,
            risk_per_trade: 0.5,
            max_position_size: 0.0,
            max_daily_loss_pct: 2.0,
            max_daily_trades: 15,

            session_start_utc: 9,
            session_end_utc: 16,
            avoid_first_minutes: 5,
            avoid_last_minutes: 5,

            initial_equity: 10_000.0,

            commission_pct: 0.0,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ScalperError> {
        validate_strategy_config(self)
    }

    /// Bars needed before every indicator has a value.
    pub fn warmup_bars(&self) -> usize {
        [
            self.slow_ema_period + 1,
            self.trend_ema_period,
            self.macd_slow + self.macd_signal - 1,
            self.rsi_period + 1,
            self.atr_period + 1,
            2 * self.adx_period,
            self.bb_period,
            self.volume_ma_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Whether `timestamp` falls inside the active session and outside the
    /// avoided minutes at either end of its hour.
    pub fn in_session(&self, timestamp: DateTime<Utc>) -> bool {
        let minute_of_day = timestamp.hour() * 60 + timestamp.minute();
        let start = self.session_start_utc * 60;
        let end = self.session_end_utc * 60;

        let inside = if start <= end {
            minute_of_day >= start && minute_of_day <= end
        } else {
            minute_of_day >= start || minute_of_day <= end
        };
        if !inside {
            return false;
        }

        let minute = timestamp.minute();
        minute >= self.avoid_first_minutes && minute < 60 - self.avoid_last_minutes
    }

    pub(crate) fn risk_fraction(&self) -> f64 {
        self.risk_per_trade / 100.0
    }

    pub(crate) fn daily_loss_fraction(&self) -> f64 {
        self.max_daily_loss_pct / 100.0
    }

    /// Fee charged on a fill of `size` units at `price`.
    pub fn commission(&self, price: f64, size: f64) -> f64 {
        price * size * self.commission_pct / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn warmup_covers_longest_window() {
        let config = StrategyConfig::default();
        // trend EMA(50) dominates MACD(26 + 9 - 1 = 34) and ADX(2 * 14)
        assert_eq!(config.warmup_bars(), 50);
    }

    #[test]
    fn session_window_bounds() {
        let config = StrategyConfig::default();
        assert!(!config.in_session(at(8, 30)));
        assert!(config.in_session(at(9, 5)));
        assert!(config.in_session(at(15, 54)));
        assert!(!config.in_session(at(16, 30)));
    }

    #[test]
    fn avoided_minutes_at_hour_edges() {
        let config = StrategyConfig::default();
        assert!(!config.in_session(at(10, 0)));
        assert!(!config.in_session(at(10, 4)));
        assert!(config.in_session(at(10, 5)));
        assert!(config.in_session(at(10, 54)));
        assert!(!config.in_session(at(10, 55)));
        assert!(!config.in_session(at(10, 59)));
    }

    #[test]
    fn session_wraps_midnight() {
        let config = StrategyConfig {
            session_start_utc: 22,
            session_end_utc: 3,
            avoid_first_minutes: 0,
            avoid_last_minutes: 0,
            ..StrategyConfig::default()
        };
        assert!(config.in_session(at(23, 15)));
        assert!(config.in_session(at(1, 15)));
        assert!(!config.in_session(at(12, 0)));
    }

    #[test]
    fn full_day_session_without_margins() {
        let config = StrategyConfig {
            session_start_utc: 0,
            session_end_utc: 23,
            avoid_first_minutes: 0,
            avoid_last_minutes: 0,
            ..StrategyConfig::default()
        };
        assert!(config.in_session(at(0, 0)));
        assert!(config.in_session(at(23, 0)));
        assert!(!config.in_session(at(23, 1)));
    }
}
