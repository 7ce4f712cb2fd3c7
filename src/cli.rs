//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestResult};
use crate::domain::config::StrategyConfig;
use crate::domain::config_validation::load_strategy_config;
use crate::domain::error::ScalperError;
use crate::logging::init_logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "scalptrader", about = "Intraday scalping strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a bar file through the strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Bar CSV; falls back to `[data] path` in the config
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// First UTC date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last UTC date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Write closed trades to this CSV
        #[arg(short, long)]
        trades: Option<PathBuf>,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose, cli.json_logs);

    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            start,
            end,
            trades,
        } => run_backtest_command(&config, data.as_deref(), start, end, trades.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<(FileConfigAdapter, StrategyConfig), ScalperError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    let config = load_strategy_config(&adapter)?;
    Ok((adapter, config))
}

/// `--data` wins; otherwise `[data] path` from the config file.
pub fn resolve_data_path(
    data_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, ScalperError> {
    if let Some(path) = data_override {
        return Ok(path.to_path_buf());
    }
    config
        .get_string("data", "path")
        .map(PathBuf::from)
        .ok_or_else(|| ScalperError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        })
}

fn run_backtest_command(
    config_path: &Path,
    data_override: Option<&Path>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    trades_path: Option<&Path>,
) -> Result<(), ScalperError> {
    info!(path = %config_path.display(), "loading config");
    let (adapter, config) = load_config(config_path)?;

    let data_path = resolve_data_path(data_override, &adapter)?;
    info!(path = %data_path.display(), "loading bars");
    let bars = CsvAdapter::new(data_path).fetch_bars(start, end)?;
    if bars.is_empty() {
        return Err(ScalperError::DataSource {
            reason: "no bars in the requested range".to_string(),
        });
    }

    let result = run_backtest(&bars, &config)?;
    print_summary(&result);

    if let Some(path) = trades_path {
        CsvReportAdapter::new().write(&result, &path.to_string_lossy())?;
        println!("\nTrades written to: {}", path.display());
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!("=== Backtest Results ===");
    if let (Some(first), Some(last)) = (result.first_bar, result.last_bar) {
        println!("Period:           {first} to {last}");
    }
    println!("Bars:             {}", result.bars_processed);
    println!("Rejected Bars:    {}", m.rejected_bars);
    println!("Initial Equity:   {:.2}", result.ledger.initial_equity);
    println!("Final Equity:     {:.2}", result.ledger.equity);
    println!("Total Return:     {:.2}%", m.total_return * 100.0);
    println!("Max Drawdown:     -{:.2}%", m.max_drawdown * 100.0);
    println!("Sharpe / Sortino: {:.3} / {:.3}", m.sharpe_ratio, m.sortino_ratio);
    println!("Total Trades:     {}", m.total_trades);
    println!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:    {:.2}", m.profit_factor);
    println!("Avg Win / Loss:   {:.2} / {:.2}", m.avg_win, m.avg_loss);
    println!("Avg R-Multiple:   {:.2}", m.avg_r_multiple);
    println!("Avg Duration:     {:.1} min", m.avg_trade_minutes);
    println!("Commission:       {:.2}", m.total_commission);
    if m.anomalies > 0 {
        println!("Anomalous Bars:   {}", m.anomalies);
    }
}

fn run_validate(config_path: &Path) -> Result<(), ScalperError> {
    let (_, config) = load_config(config_path)?;
    println!("Configuration is valid: {}", config_path.display());
    println!(
        "  EMA {}/{} (trend {}), MACD {}/{}/{}, RSI {}, ADX {} >= {}, ATR {}",
        config.fast_ema_period,
        config.slow_ema_period,
        config.trend_ema_period,
        config.macd_fast,
        config.macd_slow,
        config.macd_signal,
        config.rsi_period,
        config.adx_period,
        config.adx_threshold,
        config.atr_period,
    );
    println!(
        "  stop {}x ATR, target {}x ATR, risk {}% per trade",
        config.atr_stop_multiplier, config.atr_target_multiplier, config.risk_per_trade,
    );
    println!(
        "  session {:02}:00-{:02}:00 UTC, daily limits {}% / {} trades",
        config.session_start_utc,
        config.session_end_utc,
        config.max_daily_loss_pct,
        config.max_daily_trades,
    );
    println!(
        "  commission {}% per fill, warmup {} bars",
        config.commission_pct,
        config.warmup_bars()
    );
    Ok(())
}
