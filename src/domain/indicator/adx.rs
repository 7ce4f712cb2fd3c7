//! ADX (Average Directional Index), Wilder's method, streaming form.
//!
//! 1. +DM / -DM and TR from consecutive bars
//! 2. Wilder-smooth +DM, -DM and TR over n
//! 3. +DI = 100 * +DM / TR, -DI = 100 * -DM / TR
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX over n
//!
//! Warmup: 2n bars (n + 1 for the first DI, then n - 1 more DX values).

use super::atr::WilderAverage;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxValue {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

#[derive(Debug, Clone)]
pub struct Adx {
    prev: Option<(f64, f64, f64)>,
    tr: WilderAverage,
    plus_dm: WilderAverage,
    minus_dm: WilderAverage,
    dx: WilderAverage,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Adx {
            prev: None,
            tr: WilderAverage::new(period),
            plus_dm: WilderAverage::new(period),
            minus_dm: WilderAverage::new(period),
            dx: WilderAverage::new(period),
        }
    }

    pub fn update(&mut self, bar: &Bar) -> Option<AdxValue> {
        let (prev_high, prev_low, prev_close) =
            self.prev.replace((bar.high, bar.low, bar.close))?;

        let up_move = bar.high - prev_high;
        let down_move = prev_low - bar.low;
        let plus_dm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let minus_dm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        let tr = self.tr.update(bar.true_range(prev_close));
        let plus = self.plus_dm.update(plus_dm);
        let minus = self.minus_dm.update(minus_dm);
        let (Some(tr), Some(plus), Some(minus)) = (tr, plus, minus) else {
            return None;
        };

        let (plus_di, minus_di) = if tr > 0.0 {
            (100.0 * plus / tr, 100.0 * minus / tr)
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };

        let adx = self.dx.update(dx)?;
        Some(AdxValue {
            adx,
            plus_di,
            minus_di,
        })
    }
}
