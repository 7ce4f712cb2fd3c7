//! Backtest driver: replays a bar series through one engine.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::config::StrategyConfig;
use super::engine::ScalperEngine;
use super::error::ScalperError;
use super::ledger::Ledger;
use super::metrics::Metrics;
use super::ohlcv::Bar;
use super::position::OrderIntent;

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub ledger: Ledger,
    pub metrics: Metrics,
    /// Every intent emitted, in bar order.
    pub intents: Vec<OrderIntent>,
    pub bars_processed: usize,
    pub first_bar: Option<DateTime<Utc>>,
    pub last_bar: Option<DateTime<Utc>>,
}

/// Replay `bars` in order. Rejected bars are counted and skipped; a position
/// still open after the last accepted bar is force-closed there.
pub fn run_backtest(
    bars: &[Bar],
    config: &StrategyConfig,
) -> Result<BacktestResult, ScalperError> {
    let mut engine = ScalperEngine::new(config.clone())?;
    let mut ledger = Ledger::new(config.initial_equity);
    let mut intents = Vec::new();
    let mut last_accepted: Option<&Bar> = None;
    let mut first_bar = None;
    let mut bars_processed = 0usize;

    for bar in bars {
        let report = match engine.on_bar(bar) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "bar rejected");
                ledger.record_rejected_bar();
                continue;
            }
        };
        bars_processed += 1;
        first_bar.get_or_insert(bar.timestamp);
        last_accepted = Some(bar);

        if report.evaluation.anomalous {
            ledger.record_anomaly();
        }
        intents.extend(report.intents);
        if let Some(trade) = report.closed_trade {
            ledger.record_trade(trade);
        }
    }

    if let Some(bar) = last_accepted {
        if let Some(outcome) = engine.force_close(bar) {
            intents.extend(outcome.intents);
            if let Some(trade) = outcome.closed_trade {
                ledger.record_trade(trade);
            }
        }
    }

    let metrics = Metrics::compute(&ledger);
    info!(
        bars = bars_processed,
        rejected = ledger.rejected_bars,
        trades = metrics.total_trades,
        total_return = metrics.total_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        ledger,
        metrics,
        intents,
        bars_processed,
        first_bar,
        last_bar: last_accepted.map(|b| b.timestamp),
    })
}
