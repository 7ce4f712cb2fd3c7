//! Position & risk manager.
//!
//! Owns the single open position and runs its lifecycle:
//! `OPEN -> BREAKEVEN_SET -> TRAILING`, plus a one-shot partial exit that is
//! independent of phase. Stops only ever tighten once they leave the initial
//! risk level.
//!
//! Per bar, in order:
//! 1. exits against the stop/target in force when the bar opened, using the
//!    bar's low/high; the stop is checked first, and a bar that opens beyond a
//!    level fills at the open
//! 2. with the close as the current price: breakeven, trailing activation,
//!    trailing update, then the partial exit
//!
//! Every fill pays `commission_pct` of its notional, so banked and closed
//! P&L are net of fees.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::config::StrategyConfig;
use super::indicator::IndicatorValues;
use super::ohlcv::Bar;
use super::position::{
    ExitReason, IntentReason, OrderIntent, OrderSide, PartialFill, Phase, Position, Side,
    TradeRecord,
};

/// Everything the manager did on one bar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManageOutcome {
    pub intents: Vec<OrderIntent>,
    pub closed_trade: Option<TradeRecord>,
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    config: StrategyConfig,
    position: Option<Position>,
}

impl PositionManager {
    pub fn new(config: &StrategyConfig) -> Self {
        PositionManager {
            config: config.clone(),
            position: None,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.position.is_some()
    }

    /// `equity * risk / (atr * stop_mult)`, capped by `max_position_size`
    /// when that is positive.
    pub fn position_size(&self, equity: f64, atr: f64) -> f64 {
        let stop_distance = atr * self.config.atr_stop_multiplier;
        let size = equity * self.config.risk_fraction() / stop_distance;
        if self.config.max_position_size > 0.0 {
            size.min(self.config.max_position_size)
        } else {
            size
        }
    }

    /// Open a position at the bar's close.
    ///
    /// # Panics
    /// If a position is already open, or the entry ATR is not positive.
    pub fn open(
        &mut self,
        side: Side,
        bar: &Bar,
        values: &IndicatorValues,
        equity: f64,
    ) -> OrderIntent {
        assert!(
            self.position.is_none(),
            "attempted to open a second position while one is open"
        );
        assert!(values.atr > 0.0, "entry ATR must be positive");

        let sign = side.sign();
        let entry_price = bar.close;
        let atr = values.atr;
        let stop_distance = atr * self.config.atr_stop_multiplier;
        let size = self.position_size(equity, atr);
        let fee = self.config.commission(entry_price, size);
        let position = Position {
            side,
            entry_time: bar.timestamp,
            entry_price,
            initial_size: size,
            remaining_size: size,
            entry_atr: atr,
            stop_distance,
            stop_price: entry_price - sign * stop_distance,
            target_price: entry_price + sign * atr * self.config.atr_target_multiplier,
            phase: Phase::Open,
            partial_exit_done: false,
            partial_fill: None,
            realized_pnl: -fee,
            commission: fee,
            entry_values: *values,
        };
        info!(
            side = side.as_str(),
            price = entry_price,
            size,
            stop = position.stop_price,
            target = position.target_price,
            "position opened"
        );
        self.position = Some(position);

        OrderIntent {
            timestamp: bar.timestamp,
            side: OrderSide::opening(side),
            size,
            price: entry_price,
            reason: IntentReason::Entry,
        }
    }

    /// Manage the open position against a new bar. No-op when flat.
    pub fn on_bar(&mut self, bar: &Bar) -> ManageOutcome {
        let Some(pos) = self.position.as_ref() else {
            return ManageOutcome::default();
        };

        if let Some((price, reason)) = exit_fill(pos, bar) {
            return self.close(bar.timestamp, price, reason);
        }

        let mut intents = Vec::new();
        if let Some(pos) = self.position.as_mut() {
            adjust_stops(pos, &self.config, bar, &mut intents);
            if let Some(intent) = take_partial(pos, &self.config, bar) {
                intents.push(intent);
            }
        }
        ManageOutcome {
            intents,
            closed_trade: None,
        }
    }

    /// Close at the bar's close on the driver's request.
    pub fn force_close(&mut self, bar: &Bar) -> Option<ManageOutcome> {
        self.position.as_ref()?;
        Some(self.close(bar.timestamp, bar.close, ExitReason::ForceClose))
    }

    fn close(&mut self, at: DateTime<Utc>, price: f64, reason: ExitReason) -> ManageOutcome {
        let Some(pos) = self.position.take() else {
            return ManageOutcome::default();
        };

        let fee = self.config.commission(price, pos.remaining_size);
        let commission = pos.commission + fee;
        let pnl = pos.realized_pnl + pos.profit_per_unit(price) * pos.remaining_size - fee;
        let partial_value = pos.partial_fill.map_or(0.0, |f| f.price * f.size);
        let avg_exit_price = (partial_value + price * pos.remaining_size) / pos.initial_size;
        let initial_risk = pos.initial_risk();
        let r_multiple = if initial_risk > 0.0 {
            pnl / initial_risk
        } else {
            0.0
        };

        info!(
            side = pos.side.as_str(),
            price,
            pnl,
            commission,
            r_multiple,
            reason = reason.as_str(),
            "position closed"
        );

        let intent = OrderIntent {
            timestamp: at,
            side: OrderSide::closing(pos.side),
            size: pos.remaining_size,
            price,
            reason: IntentReason::Exit(reason),
        };
        let record = TradeRecord {
            side: pos.side,
            entry_time: pos.entry_time,
            exit_time: at,
            entry_price: pos.entry_price,
            exit_price: price,
            avg_exit_price,
            initial_size: pos.initial_size,
            partial_fill: pos.partial_fill,
            pnl,
            commission,
            r_multiple,
            exit_reason: reason,
            entry_values: pos.entry_values,
        };
        ManageOutcome {
            intents: vec![intent],
            closed_trade: Some(record),
        }
    }
}

/// Stop first, then target. A bar opening beyond the level fills at the open.
fn exit_fill(pos: &Position, bar: &Bar) -> Option<(f64, ExitReason)> {
    if pos.stop_touched(bar.low, bar.high) {
        let gapped = match pos.side {
            Side::Long => bar.open < pos.stop_price,
            Side::Short => bar.open > pos.stop_price,
        };
        let price = if gapped { bar.open } else { pos.stop_price };
        return Some((price, ExitReason::for_stop(pos.phase)));
    }
    if pos.target_touched(bar.low, bar.high) {
        let gapped = match pos.side {
            Side::Long => bar.open > pos.target_price,
            Side::Short => bar.open < pos.target_price,
        };
        let price = if gapped { bar.open } else { pos.target_price };
        return Some((price, ExitReason::TakeProfit));
    }
    None
}

/// Move the stop to `candidate` only if that tightens it.
fn ratchet(pos: &mut Position, candidate: f64, at: DateTime<Utc>, intents: &mut Vec<OrderIntent>) {
    if !pos.improves_stop(candidate) {
        return;
    }
    pos.stop_price = candidate;
    intents.push(OrderIntent {
        timestamp: at,
        side: OrderSide::closing(pos.side),
        size: pos.remaining_size,
        price: candidate,
        reason: IntentReason::AdjustStop,
    });
}

fn adjust_stops(
    pos: &mut Position,
    config: &StrategyConfig,
    bar: &Bar,
    intents: &mut Vec<OrderIntent>,
) {
    let atr = pos.entry_atr;
    let sign = pos.side.sign();
    let profit = pos.profit_per_unit(bar.close);

    if pos.phase == Phase::Open && profit >= config.atr_breakeven_multiplier * atr {
        let candidate = pos.entry_price + sign * config.breakeven_buffer_atr * atr;
        ratchet(pos, candidate, bar.timestamp, intents);
        pos.phase = Phase::BreakevenSet;
        debug!(stop = pos.stop_price, "stop moved to breakeven");
    }

    if pos.phase == Phase::BreakevenSet
        && config.use_trailing_stop
        && profit >= config.trailing_activation_atr * atr
    {
        pos.phase = Phase::Trailing;
        debug!(profit_atr = profit / atr, "trailing stop activated");
    }

    if pos.phase == Phase::Trailing {
        let candidate = bar.close - sign * config.trailing_distance_atr * atr;
        ratchet(pos, candidate, bar.timestamp, intents);
    }
}

fn take_partial(pos: &mut Position, config: &StrategyConfig, bar: &Bar) -> Option<OrderIntent> {
    if !config.use_partial_exits || pos.partial_exit_done {
        return None;
    }
    let profit = pos.profit_per_unit(bar.close);
    if profit < config.partial_exit_atr * pos.entry_atr {
        return None;
    }

    let size = pos.remaining_size * config.partial_exit_fraction;
    let fee = config.commission(bar.close, size);
    pos.remaining_size -= size;
    pos.realized_pnl += profit * size - fee;
    pos.commission += fee;
    pos.partial_exit_done = true;
    pos.partial_fill = Some(PartialFill {
        timestamp: bar.timestamp,
        price: bar.close,
        size,
    });
    debug!(size, price = bar.close, "partial exit taken");

    Some(OrderIntent {
        timestamp: bar.timestamp,
        side: OrderSide::closing(pos.side),
        size,
        price: bar.close,
        reason: IntentReason::PartialExit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::flat_values;
    use chrono::{Duration, TimeZone};

    fn ts(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap() + Duration::minutes(minute)
    }

    /// A bar with a tight range around `close`.
    fn bar(minute: i64, close: f64) -> Bar {
        Bar {
            timestamp: ts(minute),
            open: close,
            high: close + 0.05,
            low: close - 0.05,
            close,
            volume: 1000.0,
        }
    }

    fn ohlc(minute: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: ts(minute),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn manager(config: StrategyConfig) -> PositionManager {
        PositionManager::new(&config)
    }

    fn open_long(pm: &mut PositionManager) {
        pm.open(Side::Long, &bar(0, 100.0), &flat_values(100.0), 10_000.0);
    }

    #[test]
    fn sizing_and_levels_at_entry() {
        let mut pm = manager(StrategyConfig::default());
        let intent = pm.open(Side::Long, &bar(0, 100.0), &flat_values(100.0), 10_000.0);
        let pos = pm.position().unwrap();

        // 10_000 * 0.5% / (1.0 * 1.5) = 33.33
        assert!((pos.initial_size - 50.0 / 1.5).abs() < 1e-9);
        assert!((pos.stop_price - 98.5).abs() < 1e-9);
        assert!((pos.target_price - 102.5).abs() < 1e-9);
        assert_eq!(pos.phase, Phase::Open);
        assert_eq!(intent.side, OrderSide::Buy);
        assert_eq!(intent.reason, IntentReason::Entry);
    }

    #[test]
    fn short_levels_mirror() {
        let mut pm = manager(StrategyConfig::default());
        let intent = pm.open(Side::Short, &bar(0, 100.0), &flat_values(100.0), 10_000.0);
        let pos = pm.position().unwrap();
        assert!((pos.stop_price - 101.5).abs() < 1e-9);
        assert!((pos.target_price - 97.5).abs() < 1e-9);
        assert_eq!(intent.side, OrderSide::Sell);
    }

    #[test]
    fn size_cap_applies() {
        let pm = manager(StrategyConfig {
            max_position_size: 10.0,
            ..StrategyConfig::default()
        });
        assert!((pm.position_size(10_000.0, 1.0) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    #[should_panic(expected = "second position")]
    fn opening_twice_panics() {
        let mut pm = manager(StrategyConfig::default());
        open_long(&mut pm);
        open_long(&mut pm);
    }

    #[test]
    fn stop_loss_exit_in_open_phase() {
        let mut pm = manager(StrategyConfig::default());
        open_long(&mut pm);
        let out = pm.on_bar(&ohlc(1, 99.0, 99.2, 98.0, 98.4));
        let trade = out.closed_trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!((trade.exit_price - 98.5).abs() < 1e-9);
        assert!((trade.r_multiple + 1.0).abs() < 1e-9);
        assert!(!pm.is_open());
    }

    #[test]
    fn gap_through_stop_fills_at_open() {
        let mut pm = manager(StrategyConfig::default());
        open_long(&mut pm);
        let out = pm.on_bar(&ohlc(1, 97.0, 97.5, 96.5, 97.2));
        let trade = out.closed_trade.unwrap();
        assert!((trade.exit_price - 97.0).abs() < 1e-9);
        assert!(trade.r_multiple < -1.0);
    }

    #[test]
    fn stop_wins_when_both_touched() {
        let mut pm = manager(StrategyConfig::default());
        open_long(&mut pm);
        let out = pm.on_bar(&ohlc(1, 100.0, 103.0, 98.0, 100.0));
        assert_eq!(
            out.closed_trade.unwrap().exit_reason,
            ExitReason::StopLoss
        );
    }

    #[test]
    fn breakeven_moves_stop_with_buffer() {
        let mut pm = manager(StrategyConfig {
            use_trailing_stop: false,
            ..StrategyConfig::default()
        });
        open_long(&mut pm);
        let out = pm.on_bar(&bar(1, 101.0));
        let pos = pm.position().unwrap();
        assert_eq!(pos.phase, Phase::BreakevenSet);
        assert!((pos.stop_price - 100.1).abs() < 1e-9);
        assert_eq!(out.intents.len(), 1);
        assert_eq!(out.intents[0].reason, IntentReason::AdjustStop);

        // pulling back does not restore the original stop
        pm.on_bar(&bar(2, 100.5));
        let pos = pm.position().unwrap();
        assert_eq!(pos.phase, Phase::BreakevenSet);
        assert!((pos.stop_price - 100.1).abs() < 1e-9);
    }

    #[test]
    fn breakeven_stop_exit_reason() {
        let mut pm = manager(StrategyConfig {
            use_trailing_stop: false,
            ..StrategyConfig::default()
        });
        open_long(&mut pm);
        pm.on_bar(&bar(1, 101.0));
        let out = pm.on_bar(&ohlc(2, 100.5, 100.6, 100.0, 100.05));
        let trade = out.closed_trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::BreakevenStop);
        assert!((trade.exit_price - 100.1).abs() < 1e-9);
        assert!(trade.pnl > 0.0);
    }

    #[test]
    fn trailing_follows_close_and_never_loosens() {
        let mut pm = manager(StrategyConfig {
            use_partial_exits: false,
            atr_target_multiplier: 10.0,
            ..StrategyConfig::default()
        });
        open_long(&mut pm);

        pm.on_bar(&bar(1, 101.0));
        let pos = pm.position().unwrap();
        assert_eq!(pos.phase, Phase::Trailing);
        // 101 - 1.2 = 99.8 is looser than breakeven 100.1
        assert!((pos.stop_price - 100.1).abs() < 1e-9);

        pm.on_bar(&bar(2, 102.0));
        assert!((pm.position().unwrap().stop_price - 100.8).abs() < 1e-9);

        pm.on_bar(&bar(3, 101.5));
        assert!((pm.position().unwrap().stop_price - 100.8).abs() < 1e-9);

        let out = pm.on_bar(&ohlc(4, 101.0, 101.1, 100.7, 100.9));
        let trade = out.closed_trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert!((trade.exit_price - 100.8).abs() < 1e-9);
    }

    #[test]
    fn short_trailing_mirror() {
        let mut pm = manager(StrategyConfig {
            use_partial_exits: false,
            atr_target_multiplier: 10.0,
            ..StrategyConfig::default()
        });
        pm.open(Side::Short, &bar(0, 100.0), &flat_values(100.0), 10_000.0);
        pm.on_bar(&bar(1, 99.0));
        assert!((pm.position().unwrap().stop_price - 99.9).abs() < 1e-9);
        pm.on_bar(&bar(2, 98.0));
        assert!((pm.position().unwrap().stop_price - 99.2).abs() < 1e-9);
        pm.on_bar(&bar(3, 98.5));
        assert!((pm.position().unwrap().stop_price - 99.2).abs() < 1e-9);
    }

    #[test]
    fn partial_exit_fires_once() {
        let mut pm = manager(StrategyConfig::default());
        open_long(&mut pm);
        let initial = pm.position().unwrap().initial_size;

        let out = pm.on_bar(&bar(1, 101.5));
        let partial: Vec<_> = out
            .intents
            .iter()
            .filter(|i| i.reason == IntentReason::PartialExit)
            .collect();
        assert_eq!(partial.len(), 1);
        assert!((partial[0].size - initial * 0.5).abs() < 1e-9);

        let out = pm.on_bar(&bar(2, 102.0));
        assert!(out
            .intents
            .iter()
            .all(|i| i.reason != IntentReason::PartialExit));
        let pos = pm.position().unwrap();
        assert!(pos.partial_exit_done);
        assert!((pos.remaining_size - initial * 0.5).abs() < 1e-9);
    }

    #[test]
    fn commission_charged_on_every_fill() {
        let mut pm = manager(StrategyConfig {
            use_trailing_stop: false,
            commission_pct: 0.1,
            ..StrategyConfig::default()
        });
        open_long(&mut pm);
        let size = pm.position().unwrap().initial_size;
        // entry fee is banked immediately
        assert!((pm.position().unwrap().realized_pnl + 0.1 * size).abs() < 1e-9);

        pm.on_bar(&bar(1, 101.0));
        pm.on_bar(&bar(2, 101.5));
        let out = pm.on_bar(&ohlc(3, 102.0, 102.6, 101.9, 102.4));
        let trade = out.closed_trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);

        // fills: 100 * S, 101.5 * S/2, 102.5 * S/2
        let fees = 202.0 * size * 0.001;
        let gross = 1.5 * size / 2.0 + 2.5 * size / 2.0;
        assert!((trade.commission - fees).abs() < 1e-9);
        assert!((trade.pnl - (gross - fees)).abs() < 1e-9);
        assert!((trade.r_multiple - trade.pnl / (1.5 * size)).abs() < 1e-9);
    }

    #[test]
    fn zero_commission_leaves_pnl_gross() {
        let mut pm = manager(StrategyConfig::default());
        open_long(&mut pm);
        let out = pm.force_close(&bar(1, 100.6)).unwrap();
        let trade = out.closed_trade.unwrap();
        assert_eq!(trade.commission, 0.0);
        assert!((trade.pnl - 0.6 * trade.initial_size).abs() < 1e-9);
    }

    #[test]
    fn force_close_at_bar_close() {
        let mut pm = manager(StrategyConfig::default());
        assert!(pm.force_close(&bar(0, 100.0)).is_none());

        open_long(&mut pm);
        let out = pm.force_close(&bar(5, 100.6)).unwrap();
        let trade = out.closed_trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::ForceClose);
        assert!((trade.exit_price - 100.6).abs() < 1e-9);
        assert_eq!(out.intents[0].side, OrderSide::Sell);
        assert!(!pm.is_open());
    }

    #[test]
    fn flat_manager_ignores_bars() {
        let mut pm = manager(StrategyConfig::default());
        assert_eq!(pm.on_bar(&bar(0, 100.0)), ManageOutcome::default());
    }
}
