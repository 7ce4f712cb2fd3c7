//! Daily risk governor.
//!
//! Counters are keyed by UTC calendar date taken from bar timestamps, so a
//! backtest and a live feed roll over identically.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::config::StrategyConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyState {
    /// `None` until the first bar is seen.
    pub day: Option<NaiveDate>,
    pub realized_pnl: f64,
    pub trade_count: usize,
    pub halted: bool,
    /// Equity at the start of the day; the loss limit is a fraction of it.
    pub opening_equity: f64,
}

#[derive(Debug, Clone)]
pub struct DailyRiskGovernor {
    loss_fraction: f64,
    max_trades: usize,
    state: DailyState,
}

impl DailyRiskGovernor {
    pub fn new(config: &StrategyConfig) -> Self {
        DailyRiskGovernor {
            loss_fraction: config.daily_loss_fraction(),
            max_trades: config.max_daily_trades,
            state: DailyState {
                day: None,
                realized_pnl: 0.0,
                trade_count: 0,
                halted: false,
                opening_equity: config.initial_equity,
            },
        }
    }

    pub fn state(&self) -> &DailyState {
        &self.state
    }

    /// Start a fresh trading day: P&L and count to zero, halt cleared.
    pub fn on_new_day(&mut self, date: NaiveDate, opening_equity: f64) {
        self.state = DailyState {
            day: Some(date),
            realized_pnl: 0.0,
            trade_count: 0,
            halted: false,
            opening_equity,
        };
    }

    /// Roll over if `date` differs from the current key. Returns true when a
    /// new day was started.
    pub fn roll(&mut self, date: NaiveDate, equity: f64) -> bool {
        if self.state.day == Some(date) {
            return false;
        }
        if let Some(previous) = self.state.day {
            info!(
                %previous,
                pnl = self.state.realized_pnl,
                trades = self.state.trade_count,
                "trading day closed"
            );
        }
        self.on_new_day(date, equity);
        true
    }

    pub fn on_trade_closed(&mut self, pnl: f64) {
        self.state.realized_pnl += pnl;
        self.state.trade_count += 1;
        if self.state.halted {
            return;
        }

        let loss_limit = -self.loss_fraction * self.state.opening_equity;
        if self.state.realized_pnl <= loss_limit {
            self.state.halted = true;
            warn!(
                pnl = self.state.realized_pnl,
                limit = loss_limit,
                "daily loss limit reached, halting"
            );
        } else if self.state.trade_count >= self.max_trades {
            self.state.halted = true;
            warn!(
                trades = self.state.trade_count,
                "daily trade limit reached, halting"
            );
        }
    }
}
