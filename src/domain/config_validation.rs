//! Configuration loading and validation.
//!
//! Every key is optional; an absent key keeps the default. A present key
//! that does not parse is rejected rather than defaulted.

use std::str::FromStr;

use tracing::debug;

use crate::domain::config::StrategyConfig;
use crate::domain::error::ScalperError;
use crate::ports::config_port::ConfigPort;

pub fn load_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, ScalperError> {
    let d = StrategyConfig::default();
    let loaded = StrategyConfig {
        fast_ema_period: read(config, "indicators", "fast_ema_period", d.fast_ema_period)?,
        slow_ema_period: read(config, "indicators", "slow_ema_period", d.slow_ema_period)?,
        trend_ema_period: read(config, "indicators", "trend_ema_period", d.trend_ema_period)?,
        macd_fast: read(config, "indicators", "macd_fast", d.macd_fast)?,
        macd_slow: read(config, "indicators", "macd_slow", d.macd_slow)?,
        macd_signal: read(config, "indicators", "macd_signal", d.macd_signal)?,
        rsi_period: read(config, "indicators", "rsi_period", d.rsi_period)?,
        adx_period: read(config, "indicators", "adx_period", d.adx_period)?,
        atr_period: read(config, "indicators", "atr_period", d.atr_period)?,
        bb_period: read(config, "indicators", "bb_period", d.bb_period)?,
        bb_dev: read(config, "indicators", "bb_dev", d.bb_dev)?,
        volume_ma_period: read(config, "indicators", "volume_ma_period", d.volume_ma_period)?,

        rsi_overbought: read(config, "signal", "rsi_overbought", d.rsi_overbought)?,
        rsi_oversold: read(config, "signal", "rsi_oversold", d.rsi_oversold)?,
        rsi_neutral_low: read(config, "signal", "rsi_neutral_low", d.rsi_neutral_low)?,
        rsi_neutral_high: read(config, "signal", "rsi_neutral_high", d.rsi_neutral_high)?,
        adx_threshold: read(config, "signal", "adx_threshold", d.adx_threshold)?,
        volume_threshold: read(config, "signal", "volume_threshold", d.volume_threshold)?,
        use_trend_filter: read_bool(config, "signal", "use_trend_filter", d.use_trend_filter)?,
        cooldown_bars: read(config, "signal", "cooldown_bars", d.cooldown_bars)?,

        atr_stop_multiplier: read(config, "risk", "atr_stop_multiplier", d.atr_stop_multiplier)?,
        atr_target_multiplier: read(
            config,
            "risk",
            "atr_target_multiplier",
            d.atr_target_multiplier,
        )?,
        atr_breakeven_multiplier: read(
            config,
            "risk",
            "atr_breakeven_multiplier",
            d.atr_breakeven_multiplier,
        )?,
        breakeven_buffer_atr: read(config, "risk", "breakeven_buffer_atr", d.breakeven_buffer_atr)?,
        use_trailing_stop: read_bool(config, "risk", "use_trailing_stop", d.use_trailing_stop)?,
        trailing_activation_atr: read(
            config,
            "risk",
            "trailing_activation_atr",
            d.trailing_activation_atr,
        )?,
        trailing_distance_atr: read(
            config,
            "risk",
            "trailing_distance_atr",
            d.trailing_distance_atr,
        )?,
        use_partial_exits: read_bool(config, "risk", "use_partial_exits", d.use_partial_exits)?,
        partial_exit_atr: read(config, "risk", "partial_exit_atr", d.partial_exit_atr)?,
        partial_exit_fraction: read(
            config,
            "risk",
            "partial_exit_fraction",
            d.partial_exit_fraction,
        )?,
        risk_per_trade: read(config, "risk", "risk_per_trade", d.risk_per_trade)?,
        max_position_size: read(config, "risk", "max_position_size", d.max_position_size)?,
        max_daily_loss_pct: read(config, "risk", "max_daily_loss_pct", d.max_daily_loss_pct)?,
        max_daily_trades: read(config, "risk", "max_daily_trades", d.max_daily_trades)?,

        session_start_utc: read(config, "session", "session_start_utc", d.session_start_utc)?,
        session_end_utc: read(config, "session", "session_end_utc", d.session_end_utc)?,
        avoid_first_minutes: read(config, "session", "avoid_first_minutes", d.avoid_first_minutes)?,
        avoid_last_minutes: read(config, "session", "avoid_last_minutes", d.avoid_last_minutes)?,

        initial_equity: read(config, "account", "initial_equity", d.initial_equity)?,

        commission_pct: read(config, "backtest", "commission_pct", d.commission_pct)?,
    };
    validate_strategy_config(&loaded)?;
    debug!(source = %config.source(), "strategy config loaded");
    Ok(loaded)
}

fn read<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, ScalperError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ScalperError::invalid(section, key, format!("cannot parse '{}'", raw.trim()))
        }),
    }
}

fn read_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, ScalperError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(ScalperError::invalid(
                section,
                key,
                format!("expected a boolean, got '{other}'"),
            )),
        },
    }
}

pub fn validate_strategy_config(config: &StrategyConfig) -> Result<(), ScalperError> {
    validate_periods(config)?;
    validate_ema_ordering(config)?;
    validate_multipliers(config)?;
    validate_rsi_bounds(config)?;
    validate_risk(config)?;
    validate_session(config)?;
    validate_commission(config)?;
    Ok(())
}

fn validate_periods(config: &StrategyConfig) -> Result<(), ScalperError> {
    let periods = [
        ("fast_ema_period", config.fast_ema_period),
        ("slow_ema_period", config.slow_ema_period),
        ("trend_ema_period", config.trend_ema_period),
        ("macd_fast", config.macd_fast),
        ("macd_slow", config.macd_slow),
        ("macd_signal", config.macd_signal),
        ("rsi_period", config.rsi_period),
        ("adx_period", config.adx_period),
        ("atr_period", config.atr_period),
        ("bb_period", config.bb_period),
        ("volume_ma_period", config.volume_ma_period),
    ];
    for (key, period) in periods {
        if period == 0 {
            return Err(ScalperError::invalid(
                "indicators",
                key,
                "period must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_ema_ordering(config: &StrategyConfig) -> Result<(), ScalperError> {
    if config.fast_ema_period >= config.slow_ema_period {
        return Err(ScalperError::invalid(
            "indicators",
            "fast_ema_period",
            "fast_ema_period must be less than slow_ema_period",
        ));
    }
    if config.macd_fast >= config.macd_slow {
        return Err(ScalperError::invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be less than macd_slow",
        ));
    }
    Ok(())
}

fn validate_multipliers(config: &StrategyConfig) -> Result<(), ScalperError> {
    let positive = [
        ("indicators", "bb_dev", config.bb_dev),
        ("risk", "atr_stop_multiplier", config.atr_stop_multiplier),
        ("risk", "atr_target_multiplier", config.atr_target_multiplier),
        ("risk", "atr_breakeven_multiplier", config.atr_breakeven_multiplier),
        ("risk", "trailing_activation_atr", config.trailing_activation_atr),
        ("risk", "trailing_distance_atr", config.trailing_distance_atr),
        ("risk", "partial_exit_atr", config.partial_exit_atr),
    ];
    for (section, key, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(ScalperError::invalid(
                section,
                key,
                format!("{key} must be positive"),
            ));
        }
    }

    let non_negative = [
        ("signal", "volume_threshold", config.volume_threshold),
        ("signal", "adx_threshold", config.adx_threshold),
        ("risk", "breakeven_buffer_atr", config.breakeven_buffer_atr),
        ("risk", "max_position_size", config.max_position_size),
    ];
    for (section, key, value) in non_negative {
        if !(value.is_finite() && value >= 0.0) {
            return Err(ScalperError::invalid(
                section,
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }

    if config.breakeven_buffer_atr >= config.atr_breakeven_multiplier {
        return Err(ScalperError::invalid(
            "risk",
            "breakeven_buffer_atr",
            "breakeven_buffer_atr must be less than atr_breakeven_multiplier",
        ));
    }
    Ok(())
}

fn validate_rsi_bounds(config: &StrategyConfig) -> Result<(), ScalperError> {
    let bounds = [
        ("rsi_overbought", config.rsi_overbought),
        ("rsi_oversold", config.rsi_oversold),
        ("rsi_neutral_low", config.rsi_neutral_low),
        ("rsi_neutral_high", config.rsi_neutral_high),
    ];
    for (key, value) in bounds {
        if !(0.0..=100.0).contains(&value) {
            return Err(ScalperError::invalid(
                "signal",
                key,
                "RSI bound must be between 0 and 100",
            ));
        }
    }
    if config.rsi_oversold >= config.rsi_overbought {
        return Err(ScalperError::invalid(
            "signal",
            "rsi_oversold",
            "rsi_oversold must be less than rsi_overbought",
        ));
    }
    Ok(())
}

fn validate_risk(config: &StrategyConfig) -> Result<(), ScalperError> {
    if !(config.risk_per_trade > 0.0 && config.risk_per_trade <= 100.0) {
        return Err(ScalperError::invalid(
            "risk",
            "risk_per_trade",
            "risk_per_trade must be a percentage in (0, 100]",
        ));
    }
    if !(config.max_daily_loss_pct > 0.0 && config.max_daily_loss_pct <= 100.0) {
        return Err(ScalperError::invalid(
            "risk",
            "max_daily_loss_pct",
            "max_daily_loss_pct must be a percentage in (0, 100]",
        ));
    }
    if config.max_daily_trades == 0 {
        return Err(ScalperError::invalid(
            "risk",
            "max_daily_trades",
            "max_daily_trades must be at least 1",
        ));
    }
    if !(config.partial_exit_fraction > 0.0 && config.partial_exit_fraction < 1.0) {
        return Err(ScalperError::invalid(
            "risk",
            "partial_exit_fraction",
            "partial_exit_fraction must be between 0 and 1",
        ));
    }
    if !(config.initial_equity.is_finite() && config.initial_equity > 0.0) {
        return Err(ScalperError::invalid(
            "account",
            "initial_equity",
            "initial_equity must be positive",
        ));
    }
    Ok(())
}

fn validate_session(config: &StrategyConfig) -> Result<(), ScalperError> {
    if config.session_start_utc > 23 {
        return Err(ScalperError::invalid(
            "session",
            "session_start_utc",
            "hour must be between 0 and 23",
        ));
    }
    if config.session_end_utc > 23 {
        return Err(ScalperError::invalid(
            "session",
            "session_end_utc",
            "hour must be between 0 and 23",
        ));
    }
    if config.avoid_first_minutes + config.avoid_last_minutes >= 60 {
        return Err(ScalperError::invalid(
            "session",
            "avoid_first_minutes",
            "avoided minutes leave no tradable minute in the hour",
        ));
    }
    Ok(())
}

fn validate_commission(config: &StrategyConfig) -> Result<(), ScalperError> {
    if !(config.commission_pct.is_finite() && (0.0..100.0).contains(&config.commission_pct)) {
        return Err(ScalperError::invalid(
            "backtest",
            "commission_pct",
            "commission_pct must be a percentage in [0, 100)",
        ));
    }
    Ok(())
}
