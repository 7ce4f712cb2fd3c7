//! Multi-condition entry signal.
//!
//! Every confirmation is conjunctive. Gates (warmup, open position, daily
//! halt, session, cooldown) are checked first and short-circuit the
//! evaluation with a [`Suppression`] reason.

use tracing::warn;

use super::config::StrategyConfig;
use super::daily_risk::DailyState;
use super::indicator::{IndicatorSnapshot, IndicatorValues};
use super::ohlcv::Bar;
use super::position::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    None,
    Long,
    Short,
}

impl Signal {
    pub fn side(self) -> Option<Side> {
        match self {
            Signal::None => None,
            Signal::Long => Some(Side::Long),
            Signal::Short => Some(Side::Short),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    WarmingUp,
    PositionOpen,
    Halted,
    OutsideSession,
    Cooldown,
    /// ATR of zero leaves no stop distance to size against.
    ZeroAtr,
    /// Realized equity is zero or negative.
    NoEquity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub signal: Signal,
    pub suppressed: Option<Suppression>,
    /// Long and short confirmed on the same bar.
    pub anomalous: bool,
}

impl Evaluation {
    pub(crate) fn suppressed(reason: Suppression) -> Self {
        Evaluation {
            signal: Signal::None,
            suppressed: Some(reason),
            anomalous: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: StrategyConfig,
    /// Bars since the last position close; `None` before any close.
    bars_since_close: Option<usize>,
}

impl SignalGenerator {
    pub fn new(config: &StrategyConfig) -> Self {
        SignalGenerator {
            config: config.clone(),
            bars_since_close: None,
        }
    }

    /// Advance the cooldown clock by one bar.
    pub fn tick(&mut self) {
        if let Some(n) = self.bars_since_close.as_mut() {
            *n += 1;
        }
    }

    pub fn on_position_closed(&mut self) {
        self.bars_since_close = Some(0);
    }

    pub fn in_cooldown(&self) -> bool {
        self.bars_since_close
            .is_some_and(|n| n < self.config.cooldown_bars)
    }

    pub fn evaluate(
        &self,
        snapshot: &IndicatorSnapshot,
        bar: &Bar,
        daily: &DailyState,
        position_open: bool,
    ) -> Evaluation {
        let Some(values) = snapshot.values.as_ref() else {
            return Evaluation::suppressed(Suppression::WarmingUp);
        };
        if position_open {
            return Evaluation::suppressed(Suppression::PositionOpen);
        }
        if daily.halted {
            return Evaluation::suppressed(Suppression::Halted);
        }
        if !self.config.in_session(bar.timestamp) {
            return Evaluation::suppressed(Suppression::OutsideSession);
        }
        if self.in_cooldown() {
            return Evaluation::suppressed(Suppression::Cooldown);
        }
        if values.atr <= 0.0 {
            return Evaluation::suppressed(Suppression::ZeroAtr);
        }

        let long = self.long_confirmed(values, bar);
        let short = self.short_confirmed(values, bar);
        resolve(long, short, bar)
    }

    fn shared_confirmations(&self, v: &IndicatorValues, bar: &Bar) -> bool {
        v.adx >= self.config.adx_threshold
            && bar.volume >= self.config.volume_threshold * v.volume_ma
    }

    fn long_confirmed(&self, v: &IndicatorValues, bar: &Bar) -> bool {
        let c = &self.config;
        v.crossed_up()
            && v.macd_histogram > 0.0
            && v.rsi > c.rsi_neutral_low
            && v.rsi < c.rsi_overbought
            && bar.close >= v.bb_middle
            && (!c.use_trend_filter || bar.close > v.trend_ema)
            && self.shared_confirmations(v, bar)
    }

    fn short_confirmed(&self, v: &IndicatorValues, bar: &Bar) -> bool {
        let c = &self.config;
        v.crossed_down()
            && v.macd_histogram < 0.0
            && v.rsi > c.rsi_oversold
            && v.rsi < c.rsi_neutral_high
            && bar.close <= v.bb_middle
            && (!c.use_trend_filter || bar.close < v.trend_ema)
            && self.shared_confirmations(v, bar)
    }
}

fn resolve(long: bool, short: bool, bar: &Bar) -> Evaluation {
    let signal = match (long, short) {
        (true, true) => {
            warn!(at = %bar.timestamp, "long and short both confirmed, ignoring bar");
            return Evaluation {
                signal: Signal::None,
                suppressed: None,
                anomalous: true,
            };
        }
        (true, false) => Signal::Long,
        (false, true) => Signal::Short,
        (false, false) => Signal::None,
    };
    Evaluation {
        signal,
        suppressed: None,
        anomalous: false,
    }
}
