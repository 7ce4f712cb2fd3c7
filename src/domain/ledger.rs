//! Closed-trade ledger and equity curve kept by the backtest driver.

use chrono::{DateTime, Utc};

use super::position::TradeRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub initial_equity: f64,
    pub equity: f64,
    pub trades: Vec<TradeRecord>,
    /// One point per closed trade.
    pub equity_curve: Vec<EquityPoint>,
    pub anomalies: usize,
    pub rejected_bars: usize,
}

impl Ledger {
    pub fn new(initial_equity: f64) -> Self {
        Ledger {
            initial_equity,
            equity: initial_equity,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            anomalies: 0,
            rejected_bars: 0,
        }
    }

    pub fn record_trade(&mut self, trade: TradeRecord) {
        self.equity += trade.pnl;
        self.equity_curve.push(EquityPoint {
            timestamp: trade.exit_time,
            equity: self.equity,
        });
        self.trades.push(trade);
    }

    pub fn record_anomaly(&mut self) {
        self.anomalies += 1;
    }

    pub fn record_rejected_bar(&mut self) {
        self.rejected_bars += 1;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};

    use crate::domain::indicator::test_support::flat_values;
    use crate::domain::position::{ExitReason, Side, TradeRecord};

    /// A long trade of `minutes` duration risking 1.0 per unit on 10 units.
    pub fn trade(pnl: f64, minutes: i64) -> TradeRecord {
        let entry_time = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        TradeRecord {
            side: Side::Long,
            entry_time,
            exit_time: entry_time + Duration::minutes(minutes),
            entry_price: 100.0,
            exit_price: 100.0 + pnl / 10.0,
            avg_exit_price: 100.0 + pnl / 10.0,
            initial_size: 10.0,
            partial_fill: None,
            pnl,
            commission: 0.0,
            r_multiple: pnl / 10.0,
            exit_reason: if pnl >= 0.0 {
                ExitReason::TakeProfit
            } else {
                ExitReason::StopLoss
            },
            entry_values: flat_values(100.0),
        }
    }
}
