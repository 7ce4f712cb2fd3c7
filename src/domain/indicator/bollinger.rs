//! Bollinger Bands, streaming form.
//!
//! - Middle: SMA over n closes
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! Warmup: n closes.

use super::sma::Sma;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    sma: Sma,
    period: usize,
    mult: f64,
}

impl Bollinger {
    pub fn new(period: usize, mult: f64) -> Self {
        Bollinger {
            sma: Sma::new(period),
            period,
            mult,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<BollingerValue> {
        let middle = self.sma.update(close)?;
        let variance = self
            .sma
            .window()
            .map(|c| {
                let diff = c - middle;
                diff * diff
            })
            .sum::<f64>()
            / self.period as f64;
        let stddev = variance.sqrt();

        Some(BollingerValue {
            upper: middle + self.mult * stddev,
            middle,
            lower: middle - self.mult * stddev,
        })
    }
}
