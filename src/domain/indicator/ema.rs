//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n inputs, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Warmup: no value until n inputs have been seen.

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seen: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Ema {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seen: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        self.seen += 1;
        self.value = match self.value {
            Some(prev) => Some(x * self.k + prev * (1.0 - self.k)),
            None => {
                self.seed_sum += x;
                if self.seen == self.period {
                    Some(self.seed_sum / self.period as f64)
                } else {
                    None
                }
            }
        };
        self.value
    }
}
