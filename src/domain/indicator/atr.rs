//! ATR (Average True Range) with Wilder smoothing.
//!
//! True range needs the previous close, so the first bar only primes state.
//! First ATR = mean of the first n true ranges; then
//! ATR = (prev * (n-1) + TR) / n.
//! Warmup: n + 1 bars.

use crate::domain::ohlcv::Bar;

/// Wilder's running average: simple mean over the first n samples, then
/// `avg = (avg * (n-1) + x) / n`.
#[derive(Debug, Clone)]
pub struct WilderAverage {
    period: usize,
    seen: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl WilderAverage {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Wilder period must be >= 1");
        WilderAverage {
            period,
            seen: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        let n = self.period as f64;
        self.seen += 1;
        self.value = match self.value {
            Some(prev) => Some((prev * (n - 1.0) + x) / n),
            None => {
                self.seed_sum += x;
                (self.seen == self.period).then(|| self.seed_sum / n)
            }
        };
        self.value
    }
}

#[derive(Debug, Clone)]
pub struct Atr {
    prev_close: Option<f64>,
    avg: WilderAverage,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Atr {
            prev_close: None,
            avg: WilderAverage::new(period),
        }
    }

    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        let prev_close = self.prev_close.replace(bar.close)?;
        self.avg.update(bar.true_range(prev_close))
    }
}
