//! Position state, order intents and closed-trade records.

use chrono::{DateTime, Utc};

use super::indicator::IndicatorValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short; multiplies price moves into P&L.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

/// Lifecycle of an open position. `NONE` and `CLOSED` are represented by the
/// absence of a [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Open,
    BreakevenSet,
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    BreakevenStop,
    TrailingStop,
    TakeProfit,
    ForceClose,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::BreakevenStop => "breakeven_stop",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::ForceClose => "force_close",
        }
    }

    /// The stop-hit reason for a position in `phase`.
    pub fn for_stop(phase: Phase) -> Self {
        match phase {
            Phase::Open => ExitReason::StopLoss,
            Phase::BreakevenSet => ExitReason::BreakevenStop,
            Phase::Trailing => ExitReason::TrailingStop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialFill {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub initial_size: f64,
    pub remaining_size: f64,
    /// ATR frozen at entry; every distance below is a multiple of it.
    pub entry_atr: f64,
    pub stop_distance: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub phase: Phase,
    pub partial_exit_done: bool,
    pub partial_fill: Option<PartialFill>,
    /// P&L already banked, net of fees: the entry fee, plus the partial
    /// exit once taken.
    pub realized_pnl: f64,
    /// Fees charged on the fills so far.
    pub commission: f64,
    pub entry_values: IndicatorValues,
}

impl Position {
    /// Favourable price move per unit, negative when against the trade.
    pub fn profit_per_unit(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price)
    }

    pub fn stop_touched(&self, low: f64, high: f64) -> bool {
        match self.side {
            Side::Long => low <= self.stop_price,
            Side::Short => high >= self.stop_price,
        }
    }

    pub fn target_touched(&self, low: f64, high: f64) -> bool {
        match self.side {
            Side::Long => high >= self.target_price,
            Side::Short => low <= self.target_price,
        }
    }

    /// Whether `candidate` is tighter (more protective) than the current stop.
    pub fn improves_stop(&self, candidate: f64) -> bool {
        match self.side {
            Side::Long => candidate > self.stop_price,
            Side::Short => candidate < self.stop_price,
        }
    }

    /// Amount risked at entry.
    pub fn initial_risk(&self) -> f64 {
        self.initial_size * self.stop_distance
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    /// Fill price of the final exit.
    pub exit_price: f64,
    /// Size-weighted over the partial and final fills.
    pub avg_exit_price: f64,
    pub initial_size: f64,
    pub partial_fill: Option<PartialFill>,
    /// Net of `commission`.
    pub pnl: f64,
    /// Fees over the entry, partial and final fills.
    pub commission: f64,
    pub r_multiple: f64,
    pub exit_reason: ExitReason,
    pub entry_values: IndicatorValues,
}

impl TradeRecord {
    pub fn duration_minutes(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / 60.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opening(side: Side) -> Self {
        match side {
            Side::Long => OrderSide::Buy,
            Side::Short => OrderSide::Sell,
        }
    }

    pub fn closing(side: Side) -> Self {
        match side {
            Side::Long => OrderSide::Sell,
            Side::Short => OrderSide::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentReason {
    Entry,
    PartialExit,
    /// `price` carries the new stop; `size` the size it protects.
    AdjustStop,
    Exit(ExitReason),
}

/// An instruction for the driver to execute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderIntent {
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub size: f64,
    pub price: f64,
    pub reason: IntentReason,
}
