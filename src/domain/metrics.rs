//! Performance metrics over a finished run.
//!
//! Sharpe and Sortino are per-trade figures: returns are taken between
//! consecutive points of the equity curve, starting from initial equity,
//! with a zero risk-free rate and no annualisation.

use super::ledger::{EquityPoint, Ledger};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    /// Largest peak-to-trough fall of the equity curve, as a fraction.
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_r_multiple: f64,
    pub avg_trade_minutes: f64,
    /// Fees paid across all trades; already deducted from P&L.
    pub total_commission: f64,
    pub anomalies: usize,
    pub rejected_bars: usize,
}

impl Metrics {
    pub fn compute(ledger: &Ledger) -> Self {
        let trades = &ledger.trades;
        let initial = ledger.initial_equity;

        let total_return = if initial > 0.0 {
            (ledger.equity - initial) / initial
        } else {
            0.0
        };

        let max_drawdown = compute_drawdown(initial, &ledger.equity_curve);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(initial, &ledger.equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_r = 0.0_f64;
        let mut total_minutes = 0.0_f64;
        let mut total_commission = 0.0_f64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
            total_r += trade.r_multiple;
            total_minutes += trade.duration_minutes();
            total_commission += trade.commission;
        }

        let total_trades = trades.len();
        let per_trade = |total: f64| {
            if total_trades > 0 {
                total / total_trades as f64
            } else {
                0.0
            }
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Metrics {
            total_return,
            max_drawdown,
            sharpe_ratio,
            sortino_ratio,
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate: per_trade(trades_won as f64),
            profit_factor,
            avg_win: if trades_won > 0 {
                total_wins / trades_won as f64
            } else {
                0.0
            },
            avg_loss: if trades_lost > 0 {
                total_losses / trades_lost as f64
            } else {
                0.0
            },
            largest_win,
            largest_loss,
            avg_r_multiple: per_trade(total_r),
            avg_trade_minutes: per_trade(total_minutes),
            total_commission,
            anomalies: ledger.anomalies,
            rejected_bars: ledger.rejected_bars,
        }
    }
}

fn compute_drawdown(initial: f64, equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = initial;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }
    max_dd
}

fn compute_risk_adjusted(initial: f64, equity_curve: &[EquityPoint]) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let mut prev = initial;
    let returns: Vec<f64> = equity_curve
        .iter()
        .map(|point| {
            let r = if prev > 0.0 {
                (point.equity - prev) / prev
            } else {
                0.0
            };
            prev = point.equity;
            r
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let sharpe = if stddev > 0.0 { mean / stddev } else { 0.0 };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside.sqrt();
    let sortino = if downside_stddev > 0.0 {
        mean / downside_stddev
    } else {
        0.0
    };

    (sharpe, sortino)
}
