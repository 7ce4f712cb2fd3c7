//! The per-instrument strategy core.
//!
//! Bars flow one at a time through indicators, the daily governor, position
//! management and the signal generator. One engine holds all mutable state
//! for one instrument and configuration; run several engines for fan-out.

use tracing::{debug, trace};

use super::config::StrategyConfig;
use super::daily_risk::{DailyRiskGovernor, DailyState};
use super::error::{DataError, ScalperError};
use super::indicator::engine::IndicatorEngine;
use super::indicator::IndicatorSnapshot;
use super::ohlcv::Bar;
use super::position::{OrderIntent, Position, TradeRecord};
use super::position_manager::{ManageOutcome, PositionManager};
use super::signal::{Evaluation, SignalGenerator, Suppression};

/// What happened on one accepted bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarReport {
    pub snapshot: IndicatorSnapshot,
    pub evaluation: Evaluation,
    /// Management intents for an already-open position, then any entry.
    pub intents: Vec<OrderIntent>,
    pub closed_trade: Option<TradeRecord>,
}

#[derive(Debug, Clone)]
pub struct ScalperEngine {
    config: StrategyConfig,
    indicators: IndicatorEngine,
    signals: SignalGenerator,
    positions: PositionManager,
    governor: DailyRiskGovernor,
    snapshot: Option<IndicatorSnapshot>,
    realized_pnl: f64,
}

impl ScalperEngine {
    pub fn new(config: StrategyConfig) -> Result<Self, ScalperError> {
        config.validate()?;
        Ok(ScalperEngine {
            indicators: IndicatorEngine::new(&config),
            signals: SignalGenerator::new(&config),
            positions: PositionManager::new(&config),
            governor: DailyRiskGovernor::new(&config),
            snapshot: None,
            realized_pnl: 0.0,
            config,
        })
    }

    pub fn position(&self) -> Option<&Position> {
        self.positions.position()
    }

    pub fn daily_state(&self) -> &DailyState {
        self.governor.state()
    }

    /// Snapshot of the last accepted bar.
    pub fn snapshot(&self) -> Option<&IndicatorSnapshot> {
        self.snapshot.as_ref()
    }

    /// Initial equity plus realized P&L of closed trades.
    pub fn equity(&self) -> f64 {
        self.config.initial_equity + self.realized_pnl
    }

    /// Process one bar. A rejected bar changes nothing.
    pub fn on_bar(&mut self, bar: &Bar) -> Result<BarReport, DataError> {
        let snapshot = self.indicators.update(bar)?;
        self.snapshot = Some(snapshot);

        self.governor.roll(bar.date(), self.equity());
        self.signals.tick();

        let ManageOutcome {
            mut intents,
            closed_trade,
        } = self.positions.on_bar(bar);
        if let Some(trade) = closed_trade.as_ref() {
            self.on_trade_closed(trade);
        }

        let mut evaluation = self.signals.evaluate(
            &snapshot,
            bar,
            self.governor.state(),
            self.positions.is_open(),
        );
        if evaluation.signal.side().is_some() && self.equity() <= 0.0 {
            evaluation = Evaluation::suppressed(Suppression::NoEquity);
        }
        match evaluation.suppressed {
            None | Some(Suppression::WarmingUp | Suppression::PositionOpen) => {}
            Some(reason) => debug!(at = %bar.timestamp, ?reason, "signal suppressed"),
        }
        if let (Some(side), Some(values)) = (evaluation.signal.side(), snapshot.values.as_ref()) {
            let equity = self.equity();
            intents.push(self.positions.open(side, bar, values, equity));
        }
        trace!(at = %bar.timestamp, signal = ?evaluation.signal, "bar processed");

        Ok(BarReport {
            snapshot,
            evaluation,
            intents,
            closed_trade,
        })
    }

    /// Close any open position at `bar.close`, e.g. at the end of a run.
    pub fn force_close(&mut self, bar: &Bar) -> Option<ManageOutcome> {
        let outcome = self.positions.force_close(bar)?;
        if let Some(trade) = outcome.closed_trade.as_ref() {
            self.on_trade_closed(trade);
        }
        Some(outcome)
    }

    /// Lazily feed `bars` through [`on_bar`](Self::on_bar).
    pub fn replay<I>(&mut self, bars: I) -> impl Iterator<Item = Result<BarReport, DataError>>
    where
        I: IntoIterator<Item = Bar>,
    {
        bars.into_iter().map(move |bar| self.on_bar(&bar))
    }

    fn on_trade_closed(&mut self, trade: &TradeRecord) {
        self.realized_pnl += trade.pnl;
        self.governor.on_trade_closed(trade.pnl);
        self.signals.on_position_closed();
    }
}
